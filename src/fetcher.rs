use crate::TrackerError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// The retailer serves stripped markup (or blocks) non-browser clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP settings for product page fetches.
///
/// # Examples
/// ```ignore
/// let fetcher = Fetcher::new_with_config(FetcherConfig {
///     timeout: Duration::from_secs(5),
///     ..FetcherConfig::default()
/// })?;
/// ```
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub headers: Option<HeaderMap>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            headers: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, TrackerError> {
        Self::new_with_config(FetcherConfig::default())
    }

    pub fn new_with_config(config: FetcherConfig) -> Result<Self, TrackerError> {
        let headers = config.headers.unwrap_or_else(browser_headers);

        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to create HTTP client");
                TrackerError::ConfigError(format!("HTTP client: {e}"))
            })?;

        debug!("Fetcher initialized");
        Ok(Self { client })
    }

    /// Single attempt. Transport failures, non-success statuses and unreadable
    /// bodies all come back as errors.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_html(&self, url: &str) -> Result<String, TrackerError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TrackerError::FetchError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content = response
            .text()
            .await
            .map_err(|e| TrackerError::FetchError(e.to_string()))?;

        debug!(url = %url, content_length = content.len(), "Fetched product page");
        Ok(content)
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-IN,en;q=0.9"));
    headers
}
