//! Retrieval planning
//!
//! Maps a classified intent plus constraints to a `Directive`: which
//! sources to query, which filters to apply, and whether the live price
//! must be reconciled against the catalog.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::intent::{Constraints, Intent};

/// Free-text category -> canonical catalog category
const CATEGORY_SYNONYMS: &[(&str, &str)] = &[
    ("board game", "Board Games"),
    ("board games", "Board Games"),
    ("boardgame", "Board Games"),
    ("card game", "Card Games"),
    ("card games", "Card Games"),
    ("dice game", "Dice Games"),
    ("dice games", "Dice Games"),
    ("controller", "Controllers"),
    ("controllers", "Controllers"),
    ("gamepad", "Controllers"),
    ("mouse", "Mice"),
    ("mice", "Mice"),
    ("headset", "Headsets"),
    ("headsets", "Headsets"),
    ("puzzle", "Puzzles"),
    ("puzzles", "Puzzles"),
];

/// Canonical category for a user phrase; None when unrecognized
pub fn canonical_category(raw: &str) -> Option<&'static str> {
    let key = raw.trim().to_lowercase();
    CATEGORY_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == key)
        .map(|(_, canonical)| *canonical)
}

/// Filters applied to source queries
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchFilters {
    pub max_price: Option<Decimal>,
    pub min_price: Option<Decimal>,
    /// Always a canonical category name
    pub category: Option<String>,
    pub brand: Option<String>,
}

impl SearchFilters {
    /// Whether a price falls inside the bounds; unpriced always passes
    pub fn admits_price(&self, price: Option<Decimal>) -> bool {
        let Some(price) = price else {
            return true;
        };
        self.max_price.map_or(true, |max| price <= max) && self.min_price.map_or(true, |min| price >= min)
    }
}

/// Planner decision, consumed once by the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Directive {
    pub intent: Intent,
    pub use_catalog: bool,
    pub use_live: bool,
    pub filters: SearchFilters,
    pub needs_price_reconciliation: bool,
}

impl Directive {
    /// Neither source selected
    pub fn is_noop(&self) -> bool {
        !self.use_catalog && !self.use_live
    }
}

/// `(intent, constraints) -> Directive` contract
///
/// Alternate planners (e.g. model-backed) must produce the same schema.
pub trait Planner: Send + Sync {
    fn plan(&self, intent: Intent, constraints: &Constraints) -> Directive;
}

/// Deterministic table-driven planner
#[derive(Debug, Clone, Default)]
pub struct RulePlanner;

impl RulePlanner {
    pub fn new() -> Self {
        Self
    }

    fn filters(constraints: &Constraints) -> SearchFilters {
        let max_price = match (constraints.max_price, constraints.budget) {
            (Some(max), Some(budget)) => Some(max.min(budget)),
            (max, budget) => max.or(budget),
        };

        SearchFilters {
            max_price,
            min_price: constraints.min_price,
            category: constraints
                .category
                .as_deref()
                .and_then(canonical_category)
                .map(str::to_string),
            brand: constraints
                .brand
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_string),
        }
    }
}

impl Planner for RulePlanner {
    fn plan(&self, intent: Intent, constraints: &Constraints) -> Directive {
        let (use_catalog, use_live, needs_price_reconciliation) = match intent {
            Intent::Search => (true, false, false),
            Intent::CheckPrice => (true, true, true),
            Intent::CheckAvailability => (true, true, false),
            Intent::Compare => (true, true, true),
            Intent::Unknown => (false, false, false),
        };

        let directive = Directive {
            intent,
            use_catalog,
            use_live,
            filters: Self::filters(constraints),
            needs_price_reconciliation,
        };

        debug!(
            intent = %intent,
            use_catalog,
            use_live,
            needs_price_reconciliation,
            filters = ?directive.filters,
            "Planned retrieval"
        );

        directive
    }
}
