use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("No product URL found in message")]
    NoProductUrl,

    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Failed to fetch content: {0}")]
    FetchError(String),

    #[error("HTTP {status} returned for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid selector `{selector}`: {message}")]
    SelectorError { selector: String, message: String },

    #[error("Affiliate conversion failed: {0}")]
    ConversionError(String),

    #[error("Affiliate service unreachable: {0}")]
    ConverterUnreachable(String),

    #[error("Store write to `{table}` failed: {message}")]
    StoreError { table: String, message: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging setup failed: {0}")]
    LoggingError(String),
}

impl TrackerError {
    pub fn log(&self) {
        match self {
            TrackerError::NoProductUrl => {
                warn!("Message did not contain a product URL");
            }
            TrackerError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            TrackerError::FetchError(e) => {
                error!(error = %e, "Product page fetch failed");
            }
            TrackerError::HttpStatus { status, url } => {
                error!(status = %status, url = %url, "Non-success HTTP status");
            }
            TrackerError::ParseError(e) => {
                error!(error = %e, "Response parsing failed");
            }
            TrackerError::SelectorError { selector, message } => {
                error!(selector = %selector, error = %message, "Selector rejected");
            }
            TrackerError::ConversionError(e) => {
                warn!(error = %e, "Affiliate conversion failed, using original URL");
            }
            TrackerError::ConverterUnreachable(e) => {
                warn!(error = %e, "Affiliate service unreachable");
            }
            TrackerError::StoreError { table, message } => {
                warn!(table = %table, error = %message, "Store write failed");
            }
            TrackerError::StoreUnavailable(e) => {
                warn!(error = %e, "Store unavailable");
            }
            TrackerError::ConfigError(e) => {
                error!(error = %e, "Invalid configuration");
            }
            TrackerError::Io(e) => {
                error!(error = %e, "I/O failure");
            }
            TrackerError::LoggingError(e) => {
                warn!(error = %e, "Logging setup failed");
            }
        }
    }

    /// Errors that may come and go between attempts (network, remote status, store).
    pub fn is_transient(&self) -> bool {
        match self {
            TrackerError::FetchError(_)
            | TrackerError::ConverterUnreachable(_)
            | TrackerError::StoreError { .. }
            | TrackerError::StoreUnavailable(_) => true,
            TrackerError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
