use crate::{
    DetailExtractor, DetailScraper, Fetcher, ProductDetails, ProductUrl, SelectorConfig,
    TrackerError,
};
use async_trait::async_trait;
use tracing::instrument;

/// Stateless scraper: one fetch, one parse, nothing remembered between calls.
#[derive(Debug, Clone)]
pub struct ProductScraper {
    fetcher: Fetcher,
    extractor: DetailExtractor,
}

impl ProductScraper {
    pub fn new(selectors: &SelectorConfig) -> Result<Self, TrackerError> {
        Ok(Self {
            fetcher: Fetcher::new()?,
            extractor: DetailExtractor::new(selectors)?,
        })
    }

    pub fn new_with_fetcher(fetcher: Fetcher, selectors: &SelectorConfig) -> Result<Self, TrackerError> {
        Ok(Self {
            fetcher,
            extractor: DetailExtractor::new(selectors)?,
        })
    }
}

#[async_trait]
impl DetailScraper for ProductScraper {
    #[instrument(level = "debug", skip(self, url), fields(url = %url))]
    async fn scrape(&self, url: &ProductUrl) -> Result<ProductDetails, TrackerError> {
        let html = self.fetcher.fetch_html(url.as_str()).await?;
        Ok(self.extractor.extract(&html, url.as_str()))
    }
}
