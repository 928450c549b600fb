use crate::selectors::{FieldChain, SelectorConfig, Strategy};
use crate::{utils, TrackerError};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const NAME_NOT_FOUND: &str = "Name not found";
pub const PRICE_NOT_FOUND: &str = "Price not found";

/// Fields read from one product page. Missing text fields carry their
/// sentinel; a missing image is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    pub price: String,
    pub image_url: Option<String>,
}

impl ProductDetails {
    pub fn has_name(&self) -> bool {
        self.name != NAME_NOT_FOUND
    }

    pub fn has_price(&self) -> bool {
        self.price != PRICE_NOT_FOUND
    }
}

#[derive(Debug, Clone)]
struct CompiledStrategy {
    selector: Selector,
    attr: Option<String>,
    source: String,
}

impl CompiledStrategy {
    fn compile(strategy: &Strategy) -> Result<Self, TrackerError> {
        let selector =
            Selector::parse(&strategy.selector).map_err(|e| TrackerError::SelectorError {
                selector: strategy.selector.clone(),
                message: format!("{e:?}"),
            })?;

        Ok(Self {
            selector,
            attr: strategy.attr.clone(),
            source: strategy.selector.clone(),
        })
    }

    fn read(&self, element: ElementRef<'_>) -> Option<String> {
        let raw = match &self.attr {
            Some(attr) => element.value().attr(attr)?.to_string(),
            None => element.text().collect::<String>(),
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

#[derive(Debug, Clone)]
struct CompiledChain(Vec<CompiledStrategy>);

impl CompiledChain {
    fn compile(chain: &FieldChain) -> Result<Self, TrackerError> {
        chain
            .strategies()
            .iter()
            .map(CompiledStrategy::compile)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    fn first_value(&self, document: &Html) -> Option<String> {
        self.0.iter().find_map(|strategy| {
            let value = document
                .select(&strategy.selector)
                .find_map(|el| strategy.read(el));
            if value.is_some() {
                debug!(selector = %strategy.source, "Selector matched");
            }
            value
        })
    }
}

/// Reads product fields from page HTML using the configured selector chains.
#[derive(Debug, Clone)]
pub struct DetailExtractor {
    name: CompiledChain,
    price: CompiledChain,
    image: CompiledChain,
}

impl DetailExtractor {
    pub fn new(config: &SelectorConfig) -> Result<Self, TrackerError> {
        Ok(Self {
            name: CompiledChain::compile(&config.name)?,
            price: CompiledChain::compile(&config.price)?,
            image: CompiledChain::compile(&config.image)?,
        })
    }

    /// Never fails: a field whose chain finds nothing falls back to its sentinel.
    pub fn extract(&self, html: &str, page_url: &str) -> ProductDetails {
        let document = Html::parse_document(html);

        let name = self.name.first_value(&document);
        let price = self.price.first_value(&document);
        let image_url = self
            .image
            .first_value(&document)
            .map(|src| utils::resolve_against(page_url, &src));

        debug!(
            name = name.is_some(),
            price = price.is_some(),
            image = image_url.is_some(),
            "Extracted product fields"
        );

        ProductDetails {
            name: name.unwrap_or_else(|| NAME_NOT_FOUND.to_string()),
            price: price.unwrap_or_else(|| PRICE_NOT_FOUND.to_string()),
            image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://flipkart.com/item/p1";

    #[test]
    fn test_invalid_selector_is_reported() {
        let config = SelectorConfig {
            name: vec![Strategy::text("span[")].into(),
            ..SelectorConfig::default()
        };
        match DetailExtractor::new(&config) {
            Err(TrackerError::SelectorError { selector, .. }) => assert_eq!(selector, "span["),
            other => panic!("expected SelectorError, got {other:?}"),
        }
    }

    #[test]
    fn test_whitespace_only_match_falls_through() {
        let config = SelectorConfig {
            name: vec![Strategy::text("h1.blank"), Strategy::text("h1.real")].into(),
            ..SelectorConfig::default()
        };
        let extractor = DetailExtractor::new(&config).unwrap();
        let html = r#"<h1 class="blank">   </h1><h1 class="real"> Widget </h1>"#;
        assert_eq!(extractor.extract(html, PAGE).name, "Widget");
    }

    #[test]
    fn test_protocol_relative_image_is_resolved() {
        let extractor = DetailExtractor::new(&SelectorConfig::default()).unwrap();
        let html = r#"<img class="DByuf4 IZexXJ jLEJ7H" src="//rukminim2.flixcart.com/image/p1.jpeg">"#;
        assert_eq!(
            extractor.extract(html, PAGE).image_url.as_deref(),
            Some("https://rukminim2.flixcart.com/image/p1.jpeg")
        );
    }
}
