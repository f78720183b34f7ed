//! End-to-end pipeline runs against in-memory backends

use async_trait::async_trait;
use rust_decimal::Decimal;
use shopwise_common::config::CacheSettings;
use shopwise_common::errors::{AppError, Result};
use shopwise_retrieval::sources::{CatalogAdapter, CatalogBackend, CatalogHit, LiveAdapter, LiveBackend, WebHit};
use shopwise_retrieval::{
    Availability, Constraints, FetchSettings, Intent, MergeEngine, MergeKind, Orchestrator, Pipeline, RulePlanner,
    SearchFilters, SelectionPolicy, SourceCaches, SourceStatus,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

struct StaticCatalog {
    hits: Vec<CatalogHit>,
    calls: AtomicUsize,
}

#[async_trait]
impl CatalogBackend for StaticCatalog {
    async fn similarity_search(&self, _query: &str, _filters: &SearchFilters, k: usize) -> Result<Vec<CatalogHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.iter().take(k).cloned().collect())
    }
}

struct StaticWeb {
    hits: Vec<WebHit>,
    delay: Duration,
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl LiveBackend for StaticWeb {
    async fn web_search(&self, _query: &str, k: usize) -> Result<Vec<WebHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(AppError::unavailable("live", "provider returned 500"));
        }
        Ok(self.hits.iter().take(k).cloned().collect())
    }
}

fn catalog_hit(id: &str, title: &str, price: &str, score: f64) -> CatalogHit {
    CatalogHit {
        doc_id: id.to_string(),
        title: title.to_string(),
        price: Some(dec(price)),
        score,
        brand: None,
        category: Some("Board Games".into()),
        rating: Some(4.6),
        extra: Default::default(),
    }
}

fn web_hit(title: &str, snippet: &str) -> WebHit {
    WebHit {
        title: title.to_string(),
        url: Some("https://shop.example/item".into()),
        snippet: snippet.to_string(),
        price: None,
        availability: None,
        source: Some("shop.example".into()),
    }
}

fn board_game_catalog() -> Arc<StaticCatalog> {
    Arc::new(StaticCatalog {
        hits: vec![
            catalog_hit("B00U26V4VQ", "Settlers of Catan", "44.99", 0.91),
            catalog_hit("B0002TV2LU", "Ticket to Ride", "45.00", 0.74),
        ],
        calls: AtomicUsize::new(0),
    })
}

fn board_game_web(delay: Duration, fail: bool) -> Arc<StaticWeb> {
    Arc::new(StaticWeb {
        hits: vec![
            web_hit("Settlers of Catan Board Game", "Now $39.99. In stock, ships today."),
            web_hit("Catan Junior", "Catan Junior for kids - $19.99"),
        ],
        delay,
        fail,
        calls: AtomicUsize::new(0),
    })
}

fn pipeline(catalog: Arc<StaticCatalog>, web: Arc<StaticWeb>, live_timeout: Duration) -> Pipeline {
    let caches = SourceCaches::from_settings(&CacheSettings::default());
    let orchestrator = Orchestrator::new(
        Arc::new(CatalogAdapter::new(catalog, caches.catalog)),
        Arc::new(LiveAdapter::new(web, caches.live, 0)),
        MergeEngine::default(),
        SelectionPolicy::default(),
        FetchSettings {
            live_timeout,
            ..Default::default()
        },
    );
    Pipeline::new(Arc::new(RulePlanner::new()), orchestrator)
}

#[tokio::test]
async fn test_check_price_reconciles_catalog_and_live() {
    let pipeline = pipeline(board_game_catalog(), board_game_web(Duration::ZERO, false), Duration::from_secs(2));
    let result = pipeline
        .answer("how much is catan right now", Intent::CheckPrice, &Constraints::default())
        .await;

    assert!(result.retrieval_performed);
    assert_eq!(result.catalog, SourceStatus::Fresh);
    assert_eq!(result.live, SourceStatus::Fresh);
    assert_eq!(result.merged_count, 3);

    let titles: Vec<_> = result.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["Catan Junior", "Settlers of Catan", "Ticket to Ride"]);

    let catan = &result.records[1];
    assert_eq!(catan.kind, MergeKind::Matched);
    assert_eq!(catan.doc_id.as_deref(), Some("B00U26V4VQ"));
    assert_eq!(catan.catalog_price, Some(dec("44.99")));
    assert_eq!(catan.current_price, Some(dec("39.99")));
    assert_eq!(catan.availability, Availability::Available);
    assert_eq!(catan.price_discrepancy, Some(false));

    let reconciliation = result.price_reconciliation.expect("live prices present");
    assert_eq!(reconciliation.lowest_live_price, dec("19.99"));
    assert_eq!(reconciliation.title, "Catan Junior");
    assert_eq!(reconciliation.source.as_deref(), Some("shop.example"));
}

#[tokio::test]
async fn test_budget_drops_live_results_over_max_price() {
    let pipeline = pipeline(board_game_catalog(), board_game_web(Duration::ZERO, false), Duration::from_secs(2));
    let constraints = Constraints {
        budget: Some(dec("30")),
        ..Default::default()
    };
    let result = pipeline.answer("catan under $30", Intent::CheckPrice, &constraints).await;

    assert!(result
        .found()
        .all(|r| r.kind != MergeKind::LiveOnly || r.current_price <= Some(dec("30"))));
    assert!(result.found().all(|r| r.title != "Settlers of Catan Board Game"));
    assert_eq!(result.price_reconciliation.unwrap().lowest_live_price, dec("19.99"));
}

#[tokio::test]
async fn test_search_uses_catalog_only() {
    let web = board_game_web(Duration::ZERO, false);
    let pipeline = pipeline(board_game_catalog(), web.clone(), Duration::from_secs(2));
    let result = pipeline
        .answer("recommend a strategy game", Intent::Search, &Constraints::default())
        .await;

    assert_eq!(result.live, SourceStatus::Skipped);
    assert_eq!(web.calls.load(Ordering::SeqCst), 0);
    assert!(result.price_reconciliation.is_none());

    let titles: Vec<_> = result.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["Settlers of Catan", "Ticket to Ride", "unknown"]);
}

#[tokio::test]
async fn test_unknown_intent_performs_no_retrieval() {
    let catalog = board_game_catalog();
    let web = board_game_web(Duration::ZERO, false);
    let pipeline = pipeline(catalog.clone(), web.clone(), Duration::from_secs(2));
    let result = pipeline.answer("hello", Intent::Unknown, &Constraints::default()).await;

    assert!(!result.retrieval_performed);
    assert!(result.no_results);
    assert_eq!(result.records.len(), 3);
    assert!(result.records.iter().all(|r| r.is_placeholder()));
    assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    assert_eq!(web.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_live_failure_degrades_to_catalog() {
    let pipeline = pipeline(board_game_catalog(), board_game_web(Duration::ZERO, true), Duration::from_secs(2));
    let result = pipeline
        .answer("is catan in stock", Intent::CheckAvailability, &Constraints::default())
        .await;

    assert!(result.live.is_unavailable());
    assert_eq!(result.catalog, SourceStatus::Fresh);
    assert_eq!(result.found().count(), 2);
    assert!(result.found().all(|r| r.kind == MergeKind::CatalogOnly));
}

#[tokio::test]
async fn test_slow_live_source_times_out_and_fills_cache_later() {
    let web = board_game_web(Duration::from_millis(200), false);
    let pipeline = pipeline(board_game_catalog(), web.clone(), Duration::from_millis(50));

    let first = pipeline.answer("catan price", Intent::CheckPrice, &Constraints::default()).await;
    assert!(first.live.is_unavailable());
    assert_eq!(first.catalog, SourceStatus::Fresh);
    assert!(first.price_reconciliation.is_none());

    // abandoned fetch still completes and populates the live cache
    tokio::time::sleep(Duration::from_millis(500)).await;

    let second = pipeline.answer("catan price", Intent::CheckPrice, &Constraints::default()).await;
    assert_eq!(second.live, SourceStatus::Cached);
    assert_eq!(second.catalog, SourceStatus::Cached);
    assert_eq!(web.calls.load(Ordering::SeqCst), 1);
    assert!(second.price_reconciliation.is_some());
}

#[tokio::test]
async fn test_both_sources_empty() {
    let catalog = Arc::new(StaticCatalog { hits: Vec::new(), calls: AtomicUsize::new(0) });
    let web = Arc::new(StaticWeb {
        hits: Vec::new(),
        delay: Duration::ZERO,
        fail: false,
        calls: AtomicUsize::new(0),
    });
    let result = pipeline(catalog, web, Duration::from_secs(2))
        .answer("catan vs azul", Intent::Compare, &Constraints::default())
        .await;

    assert!(result.retrieval_performed);
    assert!(result.no_results);
    assert_eq!(result.records.len(), 3);
    assert!(result.records.iter().all(|r| r.is_placeholder()));
}
