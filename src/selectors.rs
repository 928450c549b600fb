//! Selector chains for the retailer's product page.
//!
//! The product page markup uses minified class names that drift between
//! releases. Each field has an ordered chain of strategies; the first one that
//! yields a non-empty value wins. Chains can be overridden from a JSON file
//! (`SELECTORS_FILE`) so a markup change does not need a rebuild.

use crate::TrackerError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One way of reading a field: a CSS selector plus where the value lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub selector: String,
    /// Attribute to read. `None` reads the element's text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
}

impl Strategy {
    pub fn text(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attr: None,
        }
    }

    pub fn attr(selector: &str, attr: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attr: Some(attr.to_string()),
        }
    }
}

/// Strategies for a single field, tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldChain(pub Vec<Strategy>);

impl FieldChain {
    pub fn strategies(&self) -> &[Strategy] {
        &self.0
    }
}

impl From<Vec<Strategy>> for FieldChain {
    fn from(strategies: Vec<Strategy>) -> Self {
        Self(strategies)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub name: FieldChain,
    pub price: FieldChain,
    pub image: FieldChain,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            name: vec![Strategy::text("span.VU-ZEz")].into(),
            price: vec![Strategy::text("div.Nx9bqj.CxhGGd")].into(),
            image: vec![
                Strategy::attr("img.DByuf4.IZexXJ.jLEJ7H", "src"),
                Strategy::attr("img.DByuf4.R9zj5d._3pEy2q", "src"),
                Strategy::attr("img._396cs4._2amPTt._3qGmMb", "src"),
            ]
            .into(),
        }
    }
}

impl SelectorConfig {
    pub fn from_json(json: &str) -> Result<Self, TrackerError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TrackerError::ParseError(format!("selector config: {e}")))?;
        config.ensure_non_empty()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, TrackerError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn ensure_non_empty(&self) -> Result<(), TrackerError> {
        for (field, chain) in [
            ("name", &self.name),
            ("price", &self.price),
            ("image", &self.image),
        ] {
            if chain.strategies().is_empty() {
                return Err(TrackerError::ConfigError(format!(
                    "selector chain for `{field}` is empty"
                )));
            }
        }
        Ok(())
    }
}
