//! Orchestrator: execute a directive against both sources
//!
//! Catalog and live fetches run as independent tasks, each under its own
//! timeout, and are joined before merging. A fetch that times out or
//! panics counts as an unavailable source. Its task is left running, so a
//! late result still lands in the source cache for the next request.

use shopwise_common::config::AppConfig;
use shopwise_common::errors::AppError;
use shopwise_common::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::merge::{MergeEngine, MergeReport};
use crate::planner::Directive;
use crate::record::{MergedRecord, Origin};
use crate::selection::SelectionPolicy;
use crate::sources::{CatalogAdapter, LiveAdapter, SourceOutcome};

/// Per-source fetch parameters
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub catalog_timeout: Duration,
    pub live_timeout: Duration,
    pub catalog_k: usize,
    pub live_k: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            catalog_timeout: Duration::from_millis(3000),
            live_timeout: Duration::from_millis(8000),
            catalog_k: 5,
            live_k: 5,
        }
    }
}

impl FetchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            catalog_timeout: config.catalog_timeout(),
            live_timeout: config.live_timeout(),
            catalog_k: config.sources.catalog_k,
            live_k: config.sources.live_k,
        }
    }
}

/// Everything one directive produced
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub catalog: SourceOutcome,
    pub live: SourceOutcome,
    pub merge: MergeReport,
    /// Selected records, always exactly the configured count
    pub records: Vec<MergedRecord>,
}

pub struct Orchestrator {
    catalog: Arc<CatalogAdapter>,
    live: Arc<LiveAdapter>,
    merge: MergeEngine,
    selection: SelectionPolicy,
    settings: FetchSettings,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<CatalogAdapter>,
        live: Arc<LiveAdapter>,
        merge: MergeEngine,
        selection: SelectionPolicy,
        settings: FetchSettings,
    ) -> Self {
        Self { catalog, live, merge, selection, settings }
    }

    pub fn selection(&self) -> &SelectionPolicy {
        &self.selection
    }

    pub async fn execute(&self, query: &str, directive: &Directive) -> Retrieval {
        let (catalog, mut live) = tokio::join!(
            self.fetch_catalog(query, directive),
            self.fetch_live(query, directive)
        );

        let before = live.records.len();
        live.records.retain(|r| directive.filters.admits_price(r.price));
        if live.records.len() < before {
            info!(dropped = before - live.records.len(), "Live results outside price bounds dropped");
        }

        let merge = self.merge.merge(&catalog.records, &live.records);
        metrics::record_merge(merge.matched, merge.discrepancies);

        let records = self.selection.select(directive.intent, &merge.records);

        Retrieval { catalog, live, merge, records }
    }

    async fn fetch_catalog(&self, query: &str, directive: &Directive) -> SourceOutcome {
        if !directive.use_catalog {
            return SourceOutcome::skipped(Origin::Catalog);
        }

        let adapter = Arc::clone(&self.catalog);
        let query = query.to_string();
        let filters = directive.filters.clone();
        let k = self.settings.catalog_k;
        let task = tokio::spawn(async move { adapter.search(&query, &filters, k).await });

        guarded(Origin::Catalog, self.settings.catalog_timeout, task).await
    }

    async fn fetch_live(&self, query: &str, directive: &Directive) -> SourceOutcome {
        if !directive.use_live {
            return SourceOutcome::skipped(Origin::Live);
        }

        let adapter = Arc::clone(&self.live);
        let query = query.to_string();
        let k = self.settings.live_k;
        let task = tokio::spawn(async move { adapter.search(&query, k).await });

        guarded(Origin::Live, self.settings.live_timeout, task).await
    }
}

async fn guarded(origin: Origin, timeout: Duration, task: JoinHandle<SourceOutcome>) -> SourceOutcome {
    let started = Instant::now();

    let outcome = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            error!(source = origin.as_str(), error = %e, "Source task failed");
            SourceOutcome::unavailable(origin, format!("Source task failed: {}", e))
        }
        Err(_) => {
            let err = AppError::SourceTimeout {
                source_name: origin.as_str().to_string(),
                timeout_ms: timeout.as_millis() as u64,
            };
            warn!(source = origin.as_str(), timeout_ms = timeout.as_millis() as u64, "Source timed out");
            SourceOutcome::unavailable(origin, err.to_string())
        }
    };

    metrics::record_source(origin.as_str(), outcome.status.label(), started.elapsed().as_secs_f64());
    outcome
}
