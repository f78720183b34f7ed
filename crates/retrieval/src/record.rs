//! Product records moved through the pipeline
//!
//! A `ProductRecord` is what a source adapter produces. A `MergedRecord`
//! is what the merge engine produces from zero or one record of each
//! origin. Both are plain values: later stages build new records rather
//! than mutating earlier ones.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Open-ended record attributes (brand, category, url, snippet, rating...)
pub type Attributes = BTreeMap<String, Value>;

/// Well-known attribute keys
pub mod attr {
    pub const BRAND: &str = "brand";
    pub const CATEGORY: &str = "category";
    pub const RATING: &str = "rating";
    pub const RELEVANCE: &str = "relevance_score";
    pub const URL: &str = "url";
    pub const SNIPPET: &str = "snippet";
    pub const SOURCE: &str = "source";
    pub const LIVE_URL: &str = "live_url";
    pub const WEB_SOURCE: &str = "web_source";
}

/// Which data source produced a record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Private pre-indexed catalog (similarity search)
    Catalog,
    /// Real-time web search
    Live,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Catalog => "catalog",
            Origin::Live => "live",
        }
    }
}

/// Stock signal for a record
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable,
    #[default]
    Unknown,
}

/// One candidate product from a single source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    /// Stable key when known (catalog doc id)
    pub identity: Option<String>,

    /// Product title, used for fuzzy matching
    pub title: String,

    pub price: Option<Decimal>,

    #[serde(default)]
    pub availability: Availability,

    #[serde(default)]
    pub attributes: Attributes,

    /// Fixed at construction
    origin: Origin,
}

impl ProductRecord {
    /// New catalog record
    pub fn catalog(title: impl Into<String>) -> Self {
        Self::with_origin(Origin::Catalog, title)
    }

    /// New live record
    pub fn live(title: impl Into<String>) -> Self {
        Self::with_origin(Origin::Live, title)
    }

    fn with_origin(origin: Origin, title: impl Into<String>) -> Self {
        Self {
            identity: None,
            title: title.into(),
            price: None,
            availability: Availability::Unknown,
            attributes: Attributes::new(),
            origin,
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_price(mut self, price: Option<Decimal>) -> Self {
        self.price = price;
        self
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Catalog relevance score, when the adapter attached one
    pub fn relevance(&self) -> Option<f64> {
        self.attributes.get(attr::RELEVANCE).and_then(Value::as_f64)
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// How a merged record came to be
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeKind {
    /// Catalog record reconciled with a live record
    Matched,
    /// Catalog record without an acceptable live partner
    CatalogOnly,
    /// Live record no catalog record claimed
    LiveOnly,
    /// Filler for an empty result slot
    Placeholder,
}

/// Output of the merge engine, immutable once built
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergedRecord {
    pub kind: MergeKind,

    /// Catalog doc id; None for live-only records and placeholders
    pub doc_id: Option<String>,

    pub title: String,

    /// Price as listed in the catalog
    pub catalog_price: Option<Decimal>,

    /// Best current price: live when known, else catalog
    pub current_price: Option<Decimal>,

    pub availability: Availability,

    /// Set only when both a catalog and a live price exist
    pub price_discrepancy: Option<bool>,

    /// Similarity that produced the match; 1.0 for standalone records
    pub match_confidence: f64,

    /// Catalog relevance score carried through for ranking
    pub relevance: Option<f64>,

    pub attributes: Attributes,
}

impl MergedRecord {
    /// Catalog record with no live override
    pub fn from_catalog(record: &ProductRecord) -> Self {
        Self {
            kind: MergeKind::CatalogOnly,
            doc_id: record.identity.clone(),
            title: record.title.clone(),
            catalog_price: record.price,
            current_price: record.price,
            availability: record.availability,
            price_discrepancy: None,
            match_confidence: 1.0,
            relevance: record.relevance(),
            attributes: record.attributes.clone(),
        }
    }

    /// Live record standing alone
    pub fn from_live(record: &ProductRecord) -> Self {
        Self {
            kind: MergeKind::LiveOnly,
            doc_id: None,
            title: record.title.clone(),
            catalog_price: None,
            current_price: record.price,
            availability: record.availability,
            price_discrepancy: None,
            match_confidence: 1.0,
            relevance: None,
            attributes: record.attributes.clone(),
        }
    }

    /// Empty slot marker handed to answer generation
    pub fn placeholder() -> Self {
        Self {
            kind: MergeKind::Placeholder,
            doc_id: None,
            title: "unknown".to_string(),
            catalog_price: None,
            current_price: None,
            availability: Availability::Unknown,
            price_discrepancy: None,
            match_confidence: 0.0,
            relevance: None,
            attributes: Attributes::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == MergeKind::Placeholder
    }

    /// True when a catalog record contributed to this one
    pub fn has_catalog(&self) -> bool {
        matches!(self.kind, MergeKind::Matched | MergeKind::CatalogOnly)
    }

    /// Price used for ordering and answers
    pub fn resolved_price(&self) -> Option<Decimal> {
        self.current_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_origin_fixed_by_constructor() {
        let record = ProductRecord::catalog("Catan").with_identity("B00U26V4VQ");
        assert_eq!(record.origin(), Origin::Catalog);
        assert_eq!(ProductRecord::live("Catan").origin(), Origin::Live);
    }

    #[test]
    fn test_catalog_standalone_keeps_listed_price() {
        let record = ProductRecord::catalog("Catan")
            .with_price(Some(dec("44.99")))
            .with_attribute(attr::RELEVANCE, 0.81);
        let merged = MergedRecord::from_catalog(&record);

        assert_eq!(merged.kind, MergeKind::CatalogOnly);
        assert_eq!(merged.current_price, Some(dec("44.99")));
        assert_eq!(merged.price_discrepancy, None);
        assert_eq!(merged.relevance, Some(0.81));
        assert!((merged.match_confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_serializes_origin() {
        let record = ProductRecord::live("Catan");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["origin"], "live");
        let back: ProductRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.origin(), Origin::Live);
    }

    #[test]
    fn test_placeholder() {
        let placeholder = MergedRecord::placeholder();
        assert!(placeholder.is_placeholder());
        assert!(!placeholder.has_catalog());
        assert_eq!(placeholder.title, "unknown");
    }
}
