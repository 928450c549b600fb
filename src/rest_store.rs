use crate::utils::truncate_str;
use crate::{ProductRecord, TrackerError, TrackingRecord, TrackingStore};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const PRODUCTS_TABLE: &str = "products";
pub const TRACKING_TABLE: &str = "user_tracking";

const PRODUCTS_CONFLICT_KEY: &str = "product_url";
const TRACKING_CONFLICT_KEY: &str = "user_id,product_url";
const UPSERT_PREFERENCE: &str = "resolution=merge-duplicates,return=minimal";

/// Upserts rows through a hosted PostgREST endpoint (`<base>/rest/v1/<table>`).
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    rest_base: Url,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, TrackerError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let rest_base = base.join("rest/v1/")?;

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| TrackerError::ConfigError(format!("store key: {e}")))?;
        key.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| TrackerError::ConfigError(format!("store key: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::ConfigError(format!("HTTP client: {e}")))?;

        debug!(endpoint = %rest_base, "REST store initialized");
        Ok(Self { client, rest_base })
    }

    #[instrument(level = "debug", skip(self, row), err)]
    async fn upsert<T: Serialize + Sync>(
        &self,
        table: &str,
        on_conflict: &str,
        row: &T,
    ) -> Result<(), TrackerError> {
        let store_error = |message: String| TrackerError::StoreError {
            table: table.to_string(),
            message,
        };

        let mut url = self.rest_base.join(table)?;
        url.query_pairs_mut().append_pair("on_conflict", on_conflict);

        let response = self
            .client
            .post(url)
            .header("Prefer", UPSERT_PREFERENCE)
            .json(&[row])
            .send()
            .await
            .map_err(|e| store_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(store_error(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate_str(body.trim(), 200)
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TrackingStore for RestStore {
    async fn upsert_product(&self, record: &ProductRecord) -> Result<(), TrackerError> {
        self.upsert(PRODUCTS_TABLE, PRODUCTS_CONFLICT_KEY, record)
            .await
    }

    async fn upsert_tracking(&self, record: &TrackingRecord) -> Result<(), TrackerError> {
        self.upsert(TRACKING_TABLE, TRACKING_CONFLICT_KEY, record)
            .await
    }
}
