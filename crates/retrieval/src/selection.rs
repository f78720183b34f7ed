//! Intent-specific ordering of merged records
//!
//! Selection always returns exactly `result_count` records, padding with
//! placeholders when the merged set is short. Every ordering is a stable
//! sort over the merge output.

use shopwise_common::config::SelectionConfig;

use crate::intent::Intent;
use crate::record::{Availability, MergeKind, MergedRecord};

pub const DEFAULT_MIN_RELEVANCE: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    result_count: usize,
    min_relevance: f64,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::new(shopwise_common::DEFAULT_RESULT_COUNT, DEFAULT_MIN_RELEVANCE)
    }
}

impl SelectionPolicy {
    pub fn new(result_count: usize, min_relevance: f64) -> Self {
        Self { result_count, min_relevance }
    }

    pub fn from_config(config: &SelectionConfig) -> Self {
        Self::new(config.result_count, config.min_relevance)
    }

    pub fn result_count(&self) -> usize {
        self.result_count
    }

    pub fn select(&self, intent: Intent, merged: &[MergedRecord]) -> Vec<MergedRecord> {
        let mut ordered: Vec<MergedRecord> = merged.to_vec();

        match intent {
            Intent::CheckPrice => {
                // priced ascending, unpriced after in input order
                ordered.sort_by_key(|r| (r.resolved_price().is_none(), r.resolved_price()));
            }
            Intent::CheckAvailability => {
                ordered.sort_by_key(|r| self.availability_bucket(r));
            }
            Intent::Compare => {
                ordered.sort_by_key(|r| r.kind != MergeKind::Matched);
            }
            Intent::Search | Intent::Unknown => {}
        }

        ordered.truncate(self.result_count);
        ordered.resize_with(self.result_count, MergedRecord::placeholder);
        ordered
    }

    fn availability_bucket(&self, record: &MergedRecord) -> u8 {
        if record.has_catalog() {
            if record.relevance.unwrap_or(0.0) >= self.min_relevance {
                0
            } else {
                3
            }
        } else if record.availability == Availability::Unavailable {
            2
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ProductRecord;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn priced(title: &str, price: Option<&str>) -> MergedRecord {
        MergedRecord::from_live(&ProductRecord::live(title).with_price(price.map(dec)))
    }

    fn titles(records: &[MergedRecord]) -> Vec<&str> {
        records.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_check_price_unpriced_last() {
        let merged = [priced("none", None), priced("twelve", Some("12.0")), priced("cheap", Some("7.5"))];
        let selected = SelectionPolicy::default().select(Intent::CheckPrice, &merged);

        let prices: Vec<_> = selected.iter().map(|r| r.current_price).collect();
        assert_eq!(prices, [Some(dec("7.5")), Some(dec("12.0")), None]);
    }

    #[test]
    fn test_check_price_stable_among_unpriced() {
        let merged = [priced("a", None), priced("b", Some("5")), priced("c", None), priced("d", Some("5"))];
        let selected = SelectionPolicy::new(4, DEFAULT_MIN_RELEVANCE).select(Intent::CheckPrice, &merged);
        assert_eq!(titles(&selected), ["b", "d", "a", "c"]);
    }

    #[test]
    fn test_empty_input_yields_placeholders() {
        for intent in [Intent::Search, Intent::CheckPrice, Intent::CheckAvailability, Intent::Compare] {
            let selected = SelectionPolicy::default().select(intent, &[]);
            assert_eq!(selected.len(), 3);
            assert!(selected.iter().all(MergedRecord::is_placeholder));
        }
    }

    #[test]
    fn test_search_keeps_catalog_order() {
        let merged: Vec<_> = ["first", "second", "third", "fourth"]
            .into_iter()
            .map(|t| MergedRecord::from_catalog(&ProductRecord::catalog(t)))
            .collect();
        let selected = SelectionPolicy::default().select(Intent::Search, &merged);
        assert_eq!(titles(&selected), ["first", "second", "third"]);
    }

    #[test]
    fn test_check_availability_buckets() {
        let weak = MergedRecord::from_catalog(&ProductRecord::catalog("weak catalog").with_attribute("relevance_score", 0.1));
        let strong =
            MergedRecord::from_catalog(&ProductRecord::catalog("strong catalog").with_attribute("relevance_score", 0.9));
        let gone = MergedRecord::from_live(&ProductRecord::live("gone").with_availability(Availability::Unavailable));
        let here = MergedRecord::from_live(&ProductRecord::live("here").with_availability(Availability::Available));

        let merged = [weak, gone, here, strong];
        let selected = SelectionPolicy::new(4, DEFAULT_MIN_RELEVANCE).select(Intent::CheckAvailability, &merged);
        assert_eq!(titles(&selected), ["strong catalog", "here", "gone", "weak catalog"]);
    }

    #[test]
    fn test_compare_prefers_matched() {
        let mut matched = MergedRecord::from_catalog(&ProductRecord::catalog("matched"));
        matched.kind = MergeKind::Matched;
        let lone = MergedRecord::from_catalog(&ProductRecord::catalog("lone"));

        let selected = SelectionPolicy::default().select(Intent::Compare, &[lone, matched]);
        assert_eq!(titles(&selected), ["matched", "lone", "unknown"]);
    }
}
