//! Catalog adapter over a similarity-search backend

use serde::Serialize;
use shopwise_common::cache::keys;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{CatalogBackend, CatalogHit, RecordCache, SourceOutcome};
use crate::planner::SearchFilters;
use crate::record::{attr, Origin, ProductRecord};

/// Largest result count the catalog is asked for
pub const MAX_CATALOG_K: usize = 20;

#[derive(Serialize)]
struct CatalogKeyParams<'a> {
    filters: &'a SearchFilters,
    k: usize,
}

/// Cached, failure-absorbing catalog search
pub struct CatalogAdapter {
    backend: Arc<dyn CatalogBackend>,
    cache: Arc<RecordCache>,
}

impl CatalogAdapter {
    pub fn new(backend: Arc<dyn CatalogBackend>, cache: Arc<RecordCache>) -> Self {
        Self { backend, cache }
    }

    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    /// Ranked catalog records for `query`, highest relevance first
    pub async fn search(&self, query: &str, filters: &SearchFilters, k: usize) -> SourceOutcome {
        let k = k.clamp(1, MAX_CATALOG_K);
        let key = keys::fingerprint("catalog", query, &CatalogKeyParams { filters, k });

        if let Some(records) = self.cache.get(&key).await {
            debug!(query, results = records.len(), "Catalog served from cache");
            return SourceOutcome::cached(Origin::Catalog, records);
        }

        match self.backend.similarity_search(query, filters, k).await {
            Ok(hits) => {
                let mut records: Vec<ProductRecord> = hits.into_iter().map(record_from_hit).collect();
                records.sort_by(|a, b| {
                    let a = a.relevance().unwrap_or(0.0);
                    let b = b.relevance().unwrap_or(0.0);
                    b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
                });
                records.truncate(k);

                self.cache.set(&key, records.clone()).await;
                debug!(query, results = records.len(), "Catalog search completed");
                SourceOutcome::fresh(Origin::Catalog, records)
            }
            Err(e) => {
                warn!(query, error = %e, "Catalog source unavailable");
                SourceOutcome::unavailable(Origin::Catalog, e.to_string())
            }
        }
    }
}

fn record_from_hit(hit: CatalogHit) -> ProductRecord {
    let mut record = ProductRecord::catalog(hit.title)
        .with_identity(hit.doc_id)
        .with_price(hit.price)
        .with_attribute(attr::RELEVANCE, hit.score);

    if let Some(brand) = hit.brand {
        record = record.with_attribute(attr::BRAND, brand);
    }
    if let Some(category) = hit.category {
        record = record.with_attribute(attr::CATEGORY, category);
    }
    if let Some(rating) = hit.rating {
        record = record.with_attribute(attr::RATING, rating);
    }
    for (key, value) in hit.extra {
        record.attributes.entry(key).or_insert(value);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceStatus;
    use async_trait::async_trait;
    use shopwise_common::cache::{CacheConfig, TtlCache};
    use shopwise_common::errors::{AppError, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingBackend {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl CatalogBackend for CountingBackend {
        async fn similarity_search(&self, _query: &str, _filters: &SearchFilters, k: usize) -> Result<Vec<CatalogHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::unavailable("catalog", "index not built"));
            }
            let hits = [("a", 0.4), ("b", 0.9), ("c", 0.7)]
                .into_iter()
                .take(k)
                .map(|(id, score)| CatalogHit {
                    doc_id: id.to_string(),
                    title: format!("Game {id}"),
                    price: None,
                    score,
                    brand: None,
                    category: Some("Board Games".into()),
                    rating: None,
                    extra: Default::default(),
                })
                .collect();
            Ok(hits)
        }
    }

    fn adapter(fail: bool) -> (CatalogAdapter, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend { calls: AtomicUsize::new(0), fail });
        let cache = Arc::new(TtlCache::new(CacheConfig::new("catalog", Duration::from_secs(60), 10)));
        (CatalogAdapter::new(backend.clone(), cache), backend)
    }

    #[tokio::test]
    async fn test_results_ranked_and_tagged() {
        let (adapter, _) = adapter(false);
        let outcome = adapter.search("strategy game", &SearchFilters::default(), 5).await;

        assert_eq!(outcome.status, SourceStatus::Fresh);
        let ids: Vec<_> = outcome.records.iter().map(|r| r.identity.clone().unwrap()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
        assert!(outcome.records.iter().all(|r| r.origin() == Origin::Catalog));
        assert_eq!(outcome.records[0].attribute_str(attr::CATEGORY), Some("Board Games"));
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let (adapter, backend) = adapter(false);
        let filters = SearchFilters::default();
        adapter.search("Strategy Game", &filters, 5).await;
        let outcome = adapter.search("  strategy game", &filters, 5).await;

        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.status, SourceStatus::Cached);
        assert_eq!(outcome.records.len(), 3);
    }

    #[tokio::test]
    async fn test_backend_failure_degrades_to_empty() {
        let (adapter, _) = adapter(true);
        let outcome = adapter.search("catan", &SearchFilters::default(), 5).await;

        assert!(outcome.records.is_empty());
        assert!(outcome.status.is_unavailable());
    }
}
