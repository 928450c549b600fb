use crate::{ProductUrl, TrackerError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_CONVERTER_ENDPOINT: &str =
    "https://ekaro-api.affiliaters.in/api/converter/public";
pub const CONVERT_ONLY: &str = "convert_only";

/// Rewrites a product URL into a monetised one.
///
/// Implementations must not fail: when conversion is impossible they hand the
/// original URL back as [`Conversion::Fallback`].
#[async_trait]
pub trait LinkConverter: Send + Sync {
    async fn convert(&self, url: &ProductUrl) -> Conversion;
}

#[derive(Debug)]
pub enum Conversion {
    Converted(String),
    Fallback { link: String, cause: TrackerError },
}

impl Conversion {
    /// The link to show the user. Never empty.
    pub fn link(&self) -> &str {
        match self {
            Conversion::Converted(link) => link,
            Conversion::Fallback { link, .. } => link,
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, Conversion::Converted(_))
    }

    fn fallback(url: &ProductUrl, cause: TrackerError) -> Self {
        Conversion::Fallback {
            link: url.to_string(),
            cause,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AffiliateConfig {
    pub endpoint: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl Default for AffiliateConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CONVERTER_ENDPOINT.to_string(),
            api_token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize)]
struct ConvertRequest<'a> {
    deal: &'a str,
    convert_option: &'static str,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    #[serde(default)]
    data: Option<String>,
}

/// Client for the affiliate network's public converter API.
#[derive(Debug, Clone)]
pub struct AffiliateClient {
    client: Client,
    endpoint: Url,
    api_token: Option<String>,
}

impl AffiliateClient {
    pub fn new(config: AffiliateConfig) -> Result<Self, TrackerError> {
        let endpoint = Url::parse(&config.endpoint)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TrackerError::ConfigError(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_token: config.api_token.filter(|t| !t.trim().is_empty()),
        })
    }

    #[instrument(level = "debug", skip(self))]
    async fn request_conversion(&self, deal: &str) -> Result<String, TrackerError> {
        let token = self.api_token.as_deref().ok_or_else(|| {
            TrackerError::ConfigError("AFFILIATE_API_TOKEN is not set".into())
        })?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(token)
            .json(&ConvertRequest {
                deal,
                convert_option: CONVERT_ONLY,
            })
            .send()
            .await
            .map_err(|e| TrackerError::ConverterUnreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::HttpStatus {
                status: status.as_u16(),
                url: self.endpoint.to_string(),
            });
        }

        let body: ConvertResponse = response
            .json()
            .await
            .map_err(|e| TrackerError::ParseError(format!("converter response: {e}")))?;

        converted_link(body)
    }
}

fn converted_link(body: ConvertResponse) -> Result<String, TrackerError> {
    body.data
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty())
        .ok_or_else(|| TrackerError::ConversionError("response carried no `data` link".into()))
}

#[async_trait]
impl LinkConverter for AffiliateClient {
    async fn convert(&self, url: &ProductUrl) -> Conversion {
        match self.request_conversion(url.as_str()).await {
            Ok(link) => {
                debug!(url = %url, affiliate = %link, "Converted affiliate link");
                Conversion::Converted(link)
            }
            Err(cause) => Conversion::fallback(url, cause),
        }
    }
}
