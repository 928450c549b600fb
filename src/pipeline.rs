use crate::{
    log_error_card, log_product_card, AffiliateClient, AppConfig, Conversion, DetailScraper,
    DisabledStore, Fetcher, LinkConverter, ProductDetails, ProductRecord, ProductScraper,
    ProductUrl, RestStore, StoreOutcome, TrackerError, TrackingRecord, TrackingStore,
    UrlExtractor, UserId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const GREETING: &str = "Send me a Flipkart product link to start tracking!";
pub const INVALID_URL_REPLY: &str = "Please send a valid Flipkart product URL.";
pub const FETCHING_NOTICE: &str = "Fetching product details...";

const START_COMMAND: &str = "/start";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub user_id: UserId,
    pub text: String,
}

impl InboundMessage {
    pub fn new(user_id: i64, text: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id),
            text: text.into(),
        }
    }
}

/// Markdown confirmation. Rendered as a photo with caption when `image` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub text: String,
    pub image: Option<String>,
}

impl Confirmation {
    pub fn new(details: &ProductDetails, affiliate_url: &str) -> Self {
        Self {
            text: format!(
                "Added to tracking!\n\n*{}*\n\n*{}*\n[View Product]({})",
                details.name, details.price, affiliate_url
            ),
            image: details.image_url.clone(),
        }
    }

    pub fn is_photo(&self) -> bool {
        self.image.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    /// Plain text: errors, notices, the greeting.
    Text(String),
    Success(Confirmation),
}

impl Reply {
    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Reply::Text(text) => text,
            Reply::Success(confirmation) => &confirmation.text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    UrlExtracted,
    Scraped,
    Converted,
    Persisted,
    RepliedSuccess,
    RepliedError,
}

/// Where the chat transport delivers replies.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, reply: Reply) -> Result<(), TrackerError>;
}

/// Everything one message produced. Only `reply` goes back to the user.
#[derive(Debug)]
pub struct PipelineReport {
    pub reply: Reply,
    /// `RepliedSuccess` or `RepliedError`.
    pub stage: Stage,
    /// Last stage completed before replying.
    pub reached: Stage,
    pub url: Option<ProductUrl>,
    pub details: Option<ProductDetails>,
    pub conversion: Option<Conversion>,
    pub store: Option<StoreOutcome>,
}

impl PipelineReport {
    fn error(reached: Stage, url: Option<ProductUrl>, text: String) -> Self {
        Self {
            reply: Reply::Text(text),
            stage: Stage::RepliedError,
            reached,
            url,
            details: None,
            conversion: None,
            store: None,
        }
    }
}

/// Per-message orchestration over injected collaborators.
///
/// Cheap to clone; every handler task can hold its own copy.
#[derive(Clone)]
pub struct Pipeline {
    extractor: UrlExtractor,
    scraper: Arc<dyn DetailScraper>,
    converter: Arc<dyn LinkConverter>,
    store: Arc<dyn TrackingStore>,
}

impl Pipeline {
    pub fn new(
        extractor: UrlExtractor,
        scraper: Arc<dyn DetailScraper>,
        converter: Arc<dyn LinkConverter>,
        store: Arc<dyn TrackingStore>,
    ) -> Self {
        Self {
            extractor,
            scraper,
            converter,
            store,
        }
    }

    /// Build the production collaborators. Store problems degrade to a
    /// [`DisabledStore`]; everything else is a startup error.
    pub fn from_config(config: &AppConfig) -> Result<Self, TrackerError> {
        let extractor = UrlExtractor::new(config.retailer())?;
        let fetcher = Fetcher::new_with_config(config.fetcher())?;
        let scraper = ProductScraper::new_with_fetcher(fetcher, &config.selectors()?)?;

        if config.affiliate_api_token.is_none() {
            warn!("AFFILIATE_API_TOKEN not set, links will not be monetised");
        }
        let converter = AffiliateClient::new(config.affiliate())?;

        Ok(Self::new(
            extractor,
            Arc::new(scraper),
            Arc::new(converter),
            Self::store_from_config(config),
        ))
    }

    fn store_from_config(config: &AppConfig) -> Arc<dyn TrackingStore> {
        let Some((url, key)) = config.store_credentials() else {
            warn!("Store credentials not set, products will not be saved");
            return Arc::new(DisabledStore::new("store credentials not configured"));
        };

        match RestStore::new(url, key, config.request_timeout()) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                e.log();
                Arc::new(DisabledStore::new(e.to_string()))
            }
        }
    }

    /// Transport entry point. Answers `/start`, ignores other commands, and
    /// runs the pipeline for plain text, sending a progress notice before the
    /// page fetch and the final reply after it.
    pub async fn handle(
        &self,
        message: &InboundMessage,
        sink: &dyn ReplySink,
    ) -> Result<Option<PipelineReport>, TrackerError> {
        let text = message.text.trim();
        if text.starts_with('/') {
            // Group chats address commands as `/start@bot_name`.
            let command = text
                .split_whitespace()
                .next()
                .and_then(|c| c.split('@').next());
            if command == Some(START_COMMAND) {
                sink.send(Reply::Text(GREETING.to_string())).await?;
            }
            return Ok(None);
        }

        let report = self.run(message, Some(sink)).await;
        sink.send(report.reply.clone()).await?;
        Ok(Some(report))
    }

    /// Run one message through extraction, scrape, conversion and persistence.
    pub async fn process(&self, message: &InboundMessage) -> PipelineReport {
        self.run(message, None).await
    }

    #[instrument(level = "debug", skip_all, fields(user = %message.user_id))]
    async fn run(&self, message: &InboundMessage, sink: Option<&dyn ReplySink>) -> PipelineReport {
        debug!(stage = ?Stage::Received, "Processing message");

        let url = match self.extractor.extract(message.text.trim()) {
            Ok(url) => url,
            Err(e) => {
                debug!(error = %e, "No product URL, replying with usage hint");
                return PipelineReport::error(Stage::Received, None, INVALID_URL_REPLY.into());
            }
        };
        debug!(stage = ?Stage::UrlExtracted, url = %url, "Product URL extracted");

        if let Some(sink) = sink {
            if let Err(e) = sink.send(Reply::Text(FETCHING_NOTICE.to_string())).await {
                warn!(error = %e, "Failed to deliver progress notice");
            }
        }

        let details = match self.scraper.scrape(&url).await {
            Ok(details) => details,
            Err(e) => {
                log_error_card(url.as_str(), &e);
                warn!(user = %message.user_id, transient = e.is_transient(), "Scrape failed, nothing persisted");
                let text = format!("Error: {e}");
                return PipelineReport::error(Stage::UrlExtracted, Some(url), text);
            }
        };
        debug!(stage = ?Stage::Scraped, name = %details.name, price = %details.price, "Product scraped");

        let conversion = self.converter.convert(&url).await;
        if let Conversion::Fallback { cause, .. } = &conversion {
            warn!(error = %cause, "Affiliate conversion failed, using original URL");
        }
        debug!(stage = ?Stage::Converted, converted = conversion.is_converted(), "Affiliate link ready");

        let product = ProductRecord::new(&url, &details, conversion.link());
        let tracking = TrackingRecord::new(message.user_id, &url);
        let outcome = self.store.track(&product, &tracking).await;
        match &outcome {
            StoreOutcome::Stored => {
                info!(user = %message.user_id, "Product '{}' tracked", details.name);
            }
            StoreOutcome::ProductOnly(cause) => {
                cause.log();
                warn!(user = %message.user_id, "Product saved without tracking row");
            }
            StoreOutcome::Failed(cause) => {
                cause.log();
                warn!("Continuing without saving");
            }
            StoreOutcome::Unavailable => {
                warn!("Database not available - product not saved");
            }
        }
        debug!(stage = ?Stage::Persisted, stored = outcome.is_stored(), "Persistence attempted");

        log_product_card(&details, url.as_str(), conversion.link());
        let confirmation = Confirmation::new(&details, conversion.link());

        PipelineReport {
            reply: Reply::Success(confirmation),
            stage: Stage::RepliedSuccess,
            reached: Stage::Persisted,
            url: Some(url),
            details: Some(details),
            conversion: Some(conversion),
            store: Some(outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_text() {
        let details = ProductDetails {
            name: "Widget".into(),
            price: "₹999".into(),
            image_url: None,
        };
        let confirmation = Confirmation::new(&details, "https://fkrt.co/abc");
        assert_eq!(
            confirmation.text,
            "Added to tracking!\n\n*Widget*\n\n*₹999*\n[View Product](https://fkrt.co/abc)"
        );
        assert!(!confirmation.is_photo());
    }

    #[test]
    fn test_reply_serialization() {
        let reply = Reply::Success(Confirmation {
            text: "hi".into(),
            image: Some("https://img/p1.jpg".into()),
        });
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            serde_json::json!({"success": {"text": "hi", "image": "https://img/p1.jpg"}})
        );
        assert_eq!(
            serde_json::to_value(Reply::Text("oops".into())).unwrap(),
            serde_json::json!({"text": "oops"})
        );
    }
}
