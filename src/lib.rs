use async_trait::async_trait;

mod affiliate;
mod config;
mod details;
mod error;
mod extractor;
mod fetcher;
mod logging;
mod pipeline;
mod product_scraper;
mod rest_store;
mod selectors;
mod store;
mod utils;

pub use affiliate::{
    AffiliateClient, AffiliateConfig, Conversion, LinkConverter, CONVERT_ONLY,
    DEFAULT_CONVERTER_ENDPOINT,
};
pub use config::AppConfig;
pub use details::{DetailExtractor, ProductDetails, NAME_NOT_FOUND, PRICE_NOT_FOUND};
pub use error::TrackerError;
pub use extractor::{
    ProductUrl, RetailerConfig, UrlExtractor, DEFAULT_MIRROR_SUBDOMAIN, DEFAULT_RETAILER_DOMAIN,
};
pub use fetcher::{Fetcher, FetcherConfig, BROWSER_USER_AGENT, DEFAULT_TIMEOUT};
pub use logging::{log_error_card, log_product_card, setup_logging, LogConfig};
pub use pipeline::{
    Confirmation, InboundMessage, Pipeline, PipelineReport, Reply, ReplySink, Stage, FETCHING_NOTICE,
    GREETING, INVALID_URL_REPLY,
};
pub use product_scraper::ProductScraper;
pub use rest_store::{RestStore, PRODUCTS_TABLE, TRACKING_TABLE};
pub use selectors::{FieldChain, SelectorConfig, Strategy};
pub use store::{
    DisabledStore, MemoryStore, ProductRecord, StoreOutcome, TrackingRecord, TrackingStore, UserId,
};
pub use utils::truncate_str;

/// Fetches a product page and reads its fields.
#[async_trait]
pub trait DetailScraper: Send + Sync {
    async fn scrape(&self, url: &ProductUrl) -> Result<ProductDetails, TrackerError>;
}
