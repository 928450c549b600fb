use crate::TrackerError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use url::Url;

pub const DEFAULT_RETAILER_DOMAIN: &str = "flipkart.com";
pub const DEFAULT_MIRROR_SUBDOMAIN: &str = "dl";

/// Characters that end a sentence rather than a URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', '"', '\''];

/// Which retailer the extractor recognises, and the shared-link mirror host it rewrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetailerConfig {
    /// Canonical host, e.g. `flipkart.com`
    pub domain: String,
    /// Mirror label in front of the canonical host, e.g. `dl` for `dl.flipkart.com`
    pub mirror_subdomain: String,
}

impl Default for RetailerConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_RETAILER_DOMAIN.to_string(),
            mirror_subdomain: DEFAULT_MIRROR_SUBDOMAIN.to_string(),
        }
    }
}

/// A product page URL on the canonical retailer host.
///
/// Only [`UrlExtractor`] produces these, so holding one means the mirror host
/// has already been rewritten. It is the join key between product and tracking rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProductUrl(String);

impl ProductUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProductUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Finds the first retailer product link in free text and canonicalises its host.
#[derive(Debug, Clone)]
pub struct UrlExtractor {
    pattern: Regex,
    config: RetailerConfig,
}

impl UrlExtractor {
    pub fn new(config: RetailerConfig) -> Result<Self, TrackerError> {
        if config.domain.trim().is_empty() {
            return Err(TrackerError::ConfigError(
                "retailer domain must not be empty".into(),
            ));
        }

        let mirror = if config.mirror_subdomain.is_empty() {
            String::new()
        } else {
            format!(r"(?:{}\.)?", regex::escape(&config.mirror_subdomain))
        };
        let source = format!(
            r"(?i)\b(https?)://(www\.)?{mirror}{domain}(/\S+)",
            domain = regex::escape(&config.domain),
        );
        let pattern = Regex::new(&source)
            .map_err(|e| TrackerError::ConfigError(format!("invalid URL pattern: {e}")))?;

        Ok(Self { pattern, config })
    }

    /// Returns the canonical form of the first matching URL. Later URLs in the
    /// same text are ignored.
    pub fn extract(&self, text: &str) -> Result<ProductUrl, TrackerError> {
        let captures = self
            .pattern
            .captures(text)
            .ok_or(TrackerError::NoProductUrl)?;

        let scheme = captures.get(1).map_or("https", |m| m.as_str());
        let www = captures.get(2).map_or("", |m| m.as_str());
        let path = captures
            .get(3)
            .map_or("/", |m| m.as_str())
            .trim_end_matches(TRAILING_PUNCTUATION);

        // The mirror label is not captured, so rebuilding from the groups drops it.
        let canonical = format!("{scheme}://{www}{}{path}", self.config.domain);
        let parsed = Url::parse(&canonical)?;

        debug!(
            matched = %captures.get(0).map_or("", |m| m.as_str()),
            canonical = %parsed,
            "Extracted product URL"
        );
        Ok(ProductUrl(parsed.into()))
    }
}
