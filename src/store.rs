use crate::{ProductDetails, ProductUrl, TrackerError};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Chat user identifier as supplied by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Latest snapshot of a product, unique on `product_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_url: String,
    pub affiliate_url: String,
    pub product_name: String,
    pub last_price: String,
    pub image_url: Option<String>,
}

impl ProductRecord {
    pub fn new(url: &ProductUrl, details: &ProductDetails, affiliate_url: &str) -> Self {
        Self {
            product_url: url.to_string(),
            affiliate_url: affiliate_url.to_string(),
            product_name: details.name.clone(),
            last_price: details.price.clone(),
            image_url: details.image_url.clone(),
        }
    }
}

/// "This user tracks this product", unique on `(user_id, product_url)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub user_id: UserId,
    pub product_url: String,
}

impl TrackingRecord {
    pub fn new(user_id: UserId, url: &ProductUrl) -> Self {
        Self {
            user_id,
            product_url: url.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum StoreOutcome {
    /// Both rows written.
    Stored,
    /// Product snapshot written, tracking row rejected.
    ProductOnly(TrackerError),
    /// Product snapshot rejected; the tracking row was not attempted.
    Failed(TrackerError),
    /// No store is configured.
    Unavailable,
}

impl StoreOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, StoreOutcome::Stored)
    }
}

/// Upsert surface of the backing store.
///
/// Both upserts are idempotent and last-writer-wins. [`TrackingStore::track`]
/// sequences them; it is not atomic across the two rows.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    async fn upsert_product(&self, record: &ProductRecord) -> Result<(), TrackerError>;

    async fn upsert_tracking(&self, record: &TrackingRecord) -> Result<(), TrackerError>;

    async fn track(&self, product: &ProductRecord, tracking: &TrackingRecord) -> StoreOutcome {
        if let Err(cause) = self.upsert_product(product).await {
            return StoreOutcome::Failed(cause);
        }
        match self.upsert_tracking(tracking).await {
            Ok(()) => StoreOutcome::Stored,
            Err(cause) => StoreOutcome::ProductOnly(cause),
        }
    }
}

/// In-process store keyed the same way as the hosted tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    products: Arc<DashMap<String, ProductRecord>>,
    tracking: Arc<DashSet<TrackingRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product(&self, url: &str) -> Option<ProductRecord> {
        self.products.get(url).map(|entry| entry.clone())
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn tracking_count(&self) -> usize {
        self.tracking.len()
    }

    pub fn is_tracking(&self, user_id: UserId, url: &str) -> bool {
        self.tracking.contains(&TrackingRecord {
            user_id,
            product_url: url.to_string(),
        })
    }

    pub fn tracked_by(&self, user_id: UserId) -> Vec<String> {
        let mut urls: Vec<String> = self
            .tracking
            .iter()
            .filter(|record| record.user_id == user_id)
            .map(|record| record.product_url.clone())
            .collect();
        urls.sort();
        urls
    }
}

#[async_trait]
impl TrackingStore for MemoryStore {
    async fn upsert_product(&self, record: &ProductRecord) -> Result<(), TrackerError> {
        self.products
            .insert(record.product_url.clone(), record.clone());
        Ok(())
    }

    async fn upsert_tracking(&self, record: &TrackingRecord) -> Result<(), TrackerError> {
        self.tracking.insert(record.clone());
        Ok(())
    }
}

/// Stand-in used when no store credentials are configured or the client
/// could not be built.
#[derive(Debug, Clone)]
pub struct DisabledStore {
    reason: String,
}

impl DisabledStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TrackingStore for DisabledStore {
    async fn upsert_product(&self, _record: &ProductRecord) -> Result<(), TrackerError> {
        Err(TrackerError::StoreUnavailable(self.reason.clone()))
    }

    async fn upsert_tracking(&self, _record: &TrackingRecord) -> Result<(), TrackerError> {
        Err(TrackerError::StoreUnavailable(self.reason.clone()))
    }

    async fn track(&self, _product: &ProductRecord, _tracking: &TrackingRecord) -> StoreOutcome {
        StoreOutcome::Unavailable
    }
}
