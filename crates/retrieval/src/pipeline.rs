//! Retrieval pipeline: planner -> orchestrator -> merge -> selection
//!
//! `Pipeline` is the single entry point used by the gateway. It never
//! fails: unreachable sources show up as `SourceStatus::Unavailable`, an
//! empty merge as `no_results`, and a directive that selects no source as
//! `retrieval_performed == false`.

use rust_decimal::Decimal;
use serde::Serialize;
use shopwise_common::metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use crate::intent::{Constraints, Intent};
use crate::orchestrator::{Orchestrator, Retrieval};
use crate::planner::{Directive, Planner};
use crate::record::{attr, MergedRecord, ProductRecord};
use crate::sources::SourceStatus;

/// Lowest live price seen for a request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceReconciliation {
    pub lowest_live_price: Decimal,
    /// Title of the live record carrying that price
    pub title: String,
    pub source: Option<String>,
    /// Matched pairs whose catalog and live prices disagree
    pub discrepancies: usize,
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub query: String,
    pub directive: Directive,
    /// False when the directive selected no source
    pub retrieval_performed: bool,
    pub catalog: SourceStatus,
    pub live: SourceStatus,
    /// Size of the merged set before selection
    pub merged_count: usize,
    /// Both sources came back empty
    pub no_results: bool,
    pub records: Vec<MergedRecord>,
    pub price_reconciliation: Option<PriceReconciliation>,
}

impl PipelineResult {
    /// Selected records that are not placeholders
    pub fn found(&self) -> impl Iterator<Item = &MergedRecord> {
        self.records.iter().filter(|r| !r.is_placeholder())
    }
}

pub struct Pipeline {
    planner: Arc<dyn Planner>,
    orchestrator: Orchestrator,
}

impl Pipeline {
    pub fn new(planner: Arc<dyn Planner>, orchestrator: Orchestrator) -> Self {
        Self { planner, orchestrator }
    }

    /// Plan and run retrieval for a classified question
    #[instrument(skip(self, intent, constraints), fields(intent = %intent))]
    pub async fn answer(&self, query: &str, intent: Intent, constraints: &Constraints) -> PipelineResult {
        let directive = self.planner.plan(intent, constraints);
        self.run(query, directive).await
    }

    /// Run a prepared directive
    pub async fn run(&self, query: &str, directive: Directive) -> PipelineResult {
        let started = Instant::now();

        if directive.is_noop() {
            info!(intent = %directive.intent, "No source selected, retrieval skipped");
            let records = self.orchestrator.selection().select(directive.intent, &[]);
            metrics::record_pipeline(started.elapsed().as_secs_f64(), directive.intent.as_str(), 0);
            return PipelineResult {
                query: query.to_string(),
                directive,
                retrieval_performed: false,
                catalog: SourceStatus::Skipped,
                live: SourceStatus::Skipped,
                merged_count: 0,
                no_results: true,
                records,
                price_reconciliation: None,
            };
        }

        let Retrieval { catalog, live, merge, records } = self.orchestrator.execute(query, &directive).await;

        let price_reconciliation = if directive.needs_price_reconciliation {
            lowest_live_price(&live.records).map(|(price, record)| PriceReconciliation {
                lowest_live_price: price,
                title: record.title.clone(),
                source: record.attribute_str(attr::SOURCE).map(str::to_string),
                discrepancies: merge.discrepancies,
            })
        } else {
            None
        };

        let result = PipelineResult {
            query: query.to_string(),
            retrieval_performed: true,
            catalog: catalog.status,
            live: live.status,
            merged_count: merge.records.len(),
            no_results: merge.records.is_empty(),
            records,
            price_reconciliation,
            directive,
        };

        let found = result.found().count();
        info!(
            intent = %result.directive.intent,
            catalog = result.catalog.label(),
            live = result.live.label(),
            merged = result.merged_count,
            selected = found,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retrieval pipeline completed"
        );
        metrics::record_pipeline(started.elapsed().as_secs_f64(), result.directive.intent.as_str(), found);

        result
    }
}

/// First live record with the minimum price
fn lowest_live_price(records: &[ProductRecord]) -> Option<(Decimal, &ProductRecord)> {
    records
        .iter()
        .filter_map(|r| r.price.map(|price| (price, r)))
        .fold(None, |lowest, (price, record)| match lowest {
            Some((best, _)) if best <= price => lowest,
            _ => Some((price, record)),
        })
}
