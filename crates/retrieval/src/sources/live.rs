//! Live web-search adapter
//!
//! Outbound calls are throttled to a per-minute quota; a request over the
//! quota waits for capacity instead of failing.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Serialize;
use shopwise_common::cache::keys;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{LiveBackend, RecordCache, SourceOutcome, WebHit};
use crate::extraction::{classify_price, detect_availability, PriceSignal};
use crate::record::{attr, Origin, ProductRecord};

/// Largest result count the web search is asked for
pub const MAX_LIVE_K: usize = 10;

#[derive(Serialize)]
struct LiveKeyParams {
    k: usize,
}

/// Cached, throttled, failure-absorbing web search
pub struct LiveAdapter {
    backend: Arc<dyn LiveBackend>,
    cache: Arc<RecordCache>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl LiveAdapter {
    /// `requests_per_minute == 0` disables throttling
    pub fn new(backend: Arc<dyn LiveBackend>, cache: Arc<RecordCache>, requests_per_minute: u32) -> Self {
        let limiter = NonZeroU32::new(requests_per_minute)
            .map(|per_minute| Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))));

        Self { backend, cache, limiter }
    }

    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    async fn throttle(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };
        if limiter.check().is_err() {
            warn!("Live search rate limit reached, waiting for capacity");
            limiter.until_ready().await;
        }
    }

    /// Live records for `query` in provider order
    pub async fn search(&self, query: &str, k: usize) -> SourceOutcome {
        let k = k.clamp(1, MAX_LIVE_K);
        let key = keys::fingerprint("live", query, &LiveKeyParams { k });

        if let Some(records) = self.cache.get(&key).await {
            debug!(query, results = records.len(), "Live search served from cache");
            return SourceOutcome::cached(Origin::Live, records);
        }

        self.throttle().await;

        match self.backend.web_search(query, k).await {
            Ok(hits) => {
                let records: Vec<ProductRecord> = hits.into_iter().take(k).map(record_from_hit).collect();
                self.cache.set(&key, records.clone()).await;
                debug!(query, results = records.len(), "Live search completed");
                SourceOutcome::fresh(Origin::Live, records)
            }
            Err(e) => {
                warn!(query, error = %e, "Live source unavailable");
                SourceOutcome::unavailable(Origin::Live, e.to_string())
            }
        }
    }
}

fn record_from_hit(hit: WebHit) -> ProductRecord {
    let price = match hit.price {
        Some(price) => Some(price),
        None => match classify_price(&format!("{} {}", hit.snippet, hit.title)) {
            PriceSignal::Found(price) => Some(price),
            PriceSignal::Ambiguous => {
                debug!(title = %hit.title, "Ambiguous price text, leaving price unset");
                None
            }
            PriceSignal::Absent => None,
        },
    };

    let stock_text = match &hit.availability {
        Some(text) => format!("{} {}", hit.snippet, text),
        None => hit.snippet.clone(),
    };

    let mut record = ProductRecord::live(hit.title)
        .with_price(price)
        .with_availability(detect_availability(&stock_text))
        .with_attribute(attr::SNIPPET, hit.snippet);

    if let Some(url) = hit.url {
        record = record.with_attribute(attr::URL, url);
    }
    if let Some(source) = hit.source {
        record = record.with_attribute(attr::SOURCE, source);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Availability;
    use crate::sources::SourceStatus;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use shopwise_common::cache::{CacheConfig, TtlCache};
    use shopwise_common::errors::{AppError, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeWeb {
        calls: AtomicUsize,
        hits: Vec<WebHit>,
        fail: bool,
    }

    #[async_trait]
    impl LiveBackend for FakeWeb {
        async fn web_search(&self, _query: &str, _k: usize) -> Result<Vec<WebHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::unavailable("live", "connection refused"));
            }
            Ok(self.hits.clone())
        }
    }

    fn hit(title: &str, snippet: &str) -> WebHit {
        WebHit {
            title: title.to_string(),
            url: Some(format!("https://shop.example/{}", title.len())),
            snippet: snippet.to_string(),
            price: None,
            availability: None,
            source: Some("shop.example".into()),
        }
    }

    fn adapter(hits: Vec<WebHit>, fail: bool, per_minute: u32) -> (LiveAdapter, Arc<FakeWeb>) {
        let backend = Arc::new(FakeWeb { calls: AtomicUsize::new(0), hits, fail });
        let cache = Arc::new(TtlCache::new(CacheConfig::new("live", Duration::from_secs(60), 10)));
        (LiveAdapter::new(backend.clone(), cache, per_minute), backend)
    }

    #[tokio::test]
    async fn test_snippet_price_and_stock() {
        let hits = vec![
            hit("Catan", "Catan board game - $39.99 at Target. In stock."),
            hit("Catan 5-6 Player Extension", "$15 to $25 depending on seller"),
            hit("Catan Seafarers", "Sold out online"),
        ];
        let (adapter, _) = adapter(hits, false, 0);
        let outcome = adapter.search("catan price", 5).await;

        assert_eq!(outcome.status, SourceStatus::Fresh);
        let records = &outcome.records;
        assert_eq!(records[0].price, Some("39.99".parse::<Decimal>().unwrap()));
        assert_eq!(records[0].availability, Availability::Available);
        assert_eq!(records[0].attribute_str(attr::SOURCE), Some("shop.example"));
        assert_eq!(records[1].price, None);
        assert_eq!(records[2].availability, Availability::Unavailable);
        assert!(records.iter().all(|r| r.origin() == Origin::Live));
    }

    #[tokio::test]
    async fn test_structured_price_wins_over_snippet() {
        let mut structured = hit("Catan", "Was $50, now cheaper");
        structured.price = Some(Decimal::from(42));
        structured.availability = Some("Out of stock".into());
        let (adapter, _) = adapter(vec![structured], false, 0);

        let record = &adapter.search("catan", 3).await.records[0];
        assert_eq!(record.price, Some(Decimal::from(42)));
        assert_eq!(record.availability, Availability::Unavailable);
    }

    #[tokio::test]
    async fn test_repeat_query_served_from_cache() {
        let (adapter, backend) = adapter(vec![hit("Catan", "$39.99")], false, 0);
        adapter.search("Catan", 5).await;
        let outcome = adapter.search("catan", 5).await;

        assert_eq!(outcome.status, SourceStatus::Cached);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_absorbed() {
        let (adapter, _) = adapter(Vec::new(), true, 0);
        let outcome = adapter.search("catan", 5).await;

        assert!(outcome.records.is_empty());
        assert!(outcome.status.is_unavailable());
    }

    #[tokio::test]
    async fn test_over_quota_waits_instead_of_failing() {
        let (adapter, backend) = adapter(vec![hit("Catan", "$39.99")], false, 1);
        adapter.search("first query", 5).await;

        let second = tokio::time::timeout(Duration::from_millis(150), adapter.search("second query", 5)).await;
        assert!(second.is_err(), "second call should still be waiting for quota");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }
}
