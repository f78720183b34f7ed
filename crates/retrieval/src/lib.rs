//! Shopwise Retrieval Core
//!
//! Turns a classified shopping question into a small, reconciled set of
//! product records:
//! - Planner: intent + constraints -> `Directive`
//! - Source adapters: cached catalog similarity search and throttled web search
//! - Merge engine: fuzzy title matching with price-discrepancy flags
//! - Selection: intent-specific stable ordering, padded to a fixed count
//!
//! `Pipeline` ties the stages together.

pub mod classifier;
pub mod extraction;
pub mod intent;
pub mod merge;
pub mod orchestrator;
pub mod pipeline;
pub mod planner;
pub mod record;
pub mod selection;
pub mod sources;

pub use classifier::{Classification, IntentClassifier, KeywordClassifier};
pub use intent::{Constraints, Intent};
pub use merge::{MergeEngine, MergeReport};
pub use orchestrator::{FetchSettings, Orchestrator};
pub use pipeline::{Pipeline, PipelineResult, PriceReconciliation};
pub use planner::{Directive, Planner, RulePlanner, SearchFilters};
pub use record::{Availability, MergeKind, MergedRecord, Origin, ProductRecord};
pub use selection::SelectionPolicy;
pub use sources::{SourceCaches, SourceStatus};
