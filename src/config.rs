//! Process configuration, read from the environment (and `.env`) or CLI flags.

use crate::{
    AffiliateConfig, FetcherConfig, LogConfig, RetailerConfig, SelectorConfig, TrackerError,
    DEFAULT_CONVERTER_ENDPOINT, DEFAULT_MIRROR_SUBDOMAIN, DEFAULT_RETAILER_DOMAIN,
};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Parser)]
#[command(name = "deal-tracker", about = "Track retailer products shared in chat", long_about = None)]
pub struct AppConfig {
    /// Hosted store base URL
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Hosted store service key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Bearer token for the affiliate converter
    #[arg(long, env = "AFFILIATE_API_TOKEN", hide_env_values = true)]
    pub affiliate_api_token: Option<String>,

    /// Affiliate converter endpoint
    #[arg(long, env = "AFFILIATE_ENDPOINT", default_value = DEFAULT_CONVERTER_ENDPOINT)]
    pub affiliate_endpoint: String,

    /// JSON file overriding the product page selector chains
    #[arg(long, env = "SELECTORS_FILE")]
    pub selectors_file: Option<PathBuf>,

    /// Canonical retailer host
    #[arg(long, env = "RETAILER_DOMAIN", default_value = DEFAULT_RETAILER_DOMAIN)]
    pub retailer_domain: String,

    /// Mirror subdomain rewritten to the canonical host
    #[arg(long, env = "MIRROR_SUBDOMAIN", default_value = DEFAULT_MIRROR_SUBDOMAIN)]
    pub mirror_subdomain: String,

    /// Upper bound for every outbound request, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 15)]
    pub request_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Directory for daily-rolling log files; console only when unset
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Messages handled concurrently by the line transport
    #[arg(long, env = "MAX_IN_FLIGHT", default_value_t = 64)]
    pub max_in_flight: usize,
}

impl AppConfig {
    /// Load configuration from environment and CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Handler permits, kept within what a semaphore accepts.
    pub fn handler_permits(&self) -> usize {
        self.max_in_flight.clamp(1, Semaphore::MAX_PERMITS)
    }

    pub fn retailer(&self) -> RetailerConfig {
        RetailerConfig {
            domain: self.retailer_domain.clone(),
            mirror_subdomain: self.mirror_subdomain.clone(),
        }
    }

    pub fn selectors(&self) -> Result<SelectorConfig, TrackerError> {
        match &self.selectors_file {
            Some(path) => SelectorConfig::from_file(path),
            None => Ok(SelectorConfig::default()),
        }
    }

    pub fn fetcher(&self) -> FetcherConfig {
        FetcherConfig {
            timeout: self.request_timeout(),
            ..FetcherConfig::default()
        }
    }

    pub fn affiliate(&self) -> AffiliateConfig {
        AffiliateConfig {
            endpoint: self.affiliate_endpoint.clone(),
            api_token: self.affiliate_api_token.clone(),
            timeout: self.request_timeout(),
        }
    }

    /// Store URL and key, if both are present and non-blank.
    pub fn store_credentials(&self) -> Option<(&str, &str)> {
        let url = self.supabase_url.as_deref().filter(|s| !s.trim().is_empty())?;
        let key = self.supabase_key.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((url, key))
    }

    pub fn logging(&self) -> LogConfig {
        LogConfig {
            log_level: self.log_level.clone(),
            console_output: true,
            log_dir: self.log_dir.clone(),
        }
    }
}
