//! Data-source adapters
//!
//! Two sources feed the merge engine:
//! - Catalog (similarity search over the private product index)
//! - Live (web search, with price/availability pulled from snippets)
//!
//! Each adapter consults its own TTL cache before calling the backend and
//! absorbs backend failures into a `SourceStatus::Unavailable` outcome.

mod catalog;
mod http;
mod live;

pub use catalog::{CatalogAdapter, MAX_CATALOG_K};
pub use http::{HttpCatalogBackend, HttpLiveBackend};
pub use live::{LiveAdapter, MAX_LIVE_K};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shopwise_common::cache::{CacheConfig, TtlCache};
use shopwise_common::config::CacheSettings;
use shopwise_common::errors::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::planner::SearchFilters;
use crate::record::{Origin, ProductRecord};

/// Raw hit from the catalog similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogHit {
    pub doc_id: String,
    pub title: String,
    pub price: Option<Decimal>,
    /// Similarity score, higher is more relevant
    #[serde(default)]
    pub score: f64,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub rating: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Raw hit from the live web search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebHit {
    pub title: String,
    pub url: Option<String>,
    #[serde(default)]
    pub snippet: String,
    /// Structured price when the provider supplies one
    pub price: Option<Decimal>,
    /// Provider stock text, if any
    pub availability: Option<String>,
    pub source: Option<String>,
}

/// Similarity-search capability behind the catalog adapter
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn similarity_search(
        &self,
        query: &str,
        filters: &SearchFilters,
        k: usize,
    ) -> Result<Vec<CatalogHit>>;
}

/// Text-search capability behind the live adapter
#[async_trait]
pub trait LiveBackend: Send + Sync {
    async fn web_search(&self, query: &str, k: usize) -> Result<Vec<WebHit>>;
}

/// How a source answered one request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// Fetched from the backend
    Fresh,
    /// Served from the source cache
    Cached,
    /// Backend failed or timed out; contributes no records
    Unavailable { reason: String },
    /// Not selected by the directive
    Skipped,
}

impl SourceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SourceStatus::Fresh => "fresh",
            SourceStatus::Cached => "cached",
            SourceStatus::Unavailable { .. } => "unavailable",
            SourceStatus::Skipped => "skipped",
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, SourceStatus::Unavailable { .. })
    }
}

/// Records plus status from one adapter call
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub origin: Origin,
    pub records: Vec<ProductRecord>,
    pub status: SourceStatus,
}

impl SourceOutcome {
    pub fn fresh(origin: Origin, records: Vec<ProductRecord>) -> Self {
        Self { origin, records, status: SourceStatus::Fresh }
    }

    pub fn cached(origin: Origin, records: Vec<ProductRecord>) -> Self {
        Self { origin, records, status: SourceStatus::Cached }
    }

    pub fn unavailable(origin: Origin, reason: impl Into<String>) -> Self {
        Self {
            origin,
            records: Vec::new(),
            status: SourceStatus::Unavailable { reason: reason.into() },
        }
    }

    pub fn skipped(origin: Origin) -> Self {
        Self { origin, records: Vec::new(), status: SourceStatus::Skipped }
    }
}

/// Cache of adapter results
pub type RecordCache = TtlCache<Vec<ProductRecord>>;

/// The two process-wide source caches
#[derive(Clone)]
pub struct SourceCaches {
    pub catalog: Arc<RecordCache>,
    pub live: Arc<RecordCache>,
}

impl SourceCaches {
    /// Build both caches; live entries expire sooner than catalog entries
    pub fn from_settings(settings: &CacheSettings) -> Self {
        let build = |name: &str, ttl_secs: u64| {
            let mut config = CacheConfig::new(
                name,
                std::time::Duration::from_secs(ttl_secs),
                settings.max_entries,
            );
            if let Some(dir) = &settings.persist_dir {
                config = config.with_persistence(dir);
            }
            Arc::new(TtlCache::new(config))
        };

        Self {
            catalog: build("catalog_search", settings.catalog_ttl_secs),
            live: build("live_search", settings.live_ttl_secs),
        }
    }
}
