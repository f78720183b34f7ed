//! Merge engine: reconcile catalog and live records
//!
//! One greedy pass over the catalog list. Each catalog record claims the
//! most similar live record not yet claimed, provided the title similarity
//! reaches the match threshold. Unclaimed live records are appended as
//! standalone records, so every input appears in exactly one output.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use shopwise_common::config::MergeConfig;
use tracing::debug;

use crate::record::{attr, Availability, MergeKind, MergedRecord, ProductRecord};

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.72;
pub const DEFAULT_DISCREPANCY_THRESHOLD: f64 = 0.20;

const PRICE_EPSILON: f64 = 1e-6;

/// Title similarity in [0, 1] on lower-cased, trimmed titles
///
/// Ratcliff/Obershelp: twice the number of matched characters over the
/// combined length, where matches are found by recursively taking the
/// longest common block and recursing on both sides of it.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.trim().to_lowercase().chars().collect();
    let b: Vec<char> = b.trim().to_lowercase().chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let matched = matching_chars(&a, &b);
    2.0 * matched as f64 / (a.len() + b.len()) as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        total += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    total
}

/// Longest common block in `a[alo..ahi]` / `b[blo..bhi]`; earliest wins ties
fn longest_match(a: &[char], b: &[char], alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut best = (alo, blo, 0);

    for i in alo..ahi {
        let mut row = vec![0usize; width + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let size = prev[j - blo] + 1;
                row[j - blo + 1] = size;
                if size > best.2 {
                    best = (i + 1 - size, j + 1 - size, size);
                }
            }
        }
        prev = row;
    }
    best
}

/// Output of one merge pass
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    /// Catalog-derived records in catalog order, then unclaimed live records
    pub records: Vec<MergedRecord>,
    pub matched: usize,
    pub discrepancies: usize,
}

/// Fuzzy catalog/live reconciler
#[derive(Debug, Clone)]
pub struct MergeEngine {
    match_threshold: f64,
    discrepancy_threshold: f64,
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD, DEFAULT_DISCREPANCY_THRESHOLD)
    }
}

impl MergeEngine {
    pub fn new(match_threshold: f64, discrepancy_threshold: f64) -> Self {
        Self { match_threshold, discrepancy_threshold }
    }

    pub fn from_config(config: &MergeConfig) -> Self {
        Self::new(config.match_threshold, config.discrepancy_threshold)
    }

    pub fn merge(&self, catalog: &[ProductRecord], live: &[ProductRecord]) -> MergeReport {
        let mut claimed = vec![false; live.len()];
        let mut report = MergeReport {
            records: Vec::with_capacity(catalog.len() + live.len()),
            ..Default::default()
        };

        for record in catalog {
            let mut best: Option<(usize, f64)> = None;
            for (idx, candidate) in live.iter().enumerate() {
                if claimed[idx] {
                    continue;
                }
                let score = similarity(&record.title, &candidate.title);
                if best.map_or(true, |(_, top)| score > top) {
                    best = Some((idx, score));
                }
            }

            match best {
                Some((idx, score)) if score >= self.match_threshold => {
                    claimed[idx] = true;
                    let merged = self.reconcile(record, &live[idx], score);
                    report.matched += 1;
                    if merged.price_discrepancy == Some(true) {
                        report.discrepancies += 1;
                    }
                    report.records.push(merged);
                }
                _ => report.records.push(MergedRecord::from_catalog(record)),
            }
        }

        report.records.extend(
            live.iter()
                .zip(&claimed)
                .filter(|(_, claimed)| !**claimed)
                .map(|(record, _)| MergedRecord::from_live(record)),
        );

        debug!(
            catalog = catalog.len(),
            live = live.len(),
            merged = report.records.len(),
            matched = report.matched,
            discrepancies = report.discrepancies,
            "Merged source results"
        );
        report
    }

    /// Catalog static attributes with the live price and availability
    fn reconcile(&self, catalog: &ProductRecord, live: &ProductRecord, score: f64) -> MergedRecord {
        let mut merged = MergedRecord::from_catalog(catalog);
        merged.kind = MergeKind::Matched;
        merged.match_confidence = score;

        if live.price.is_some() {
            merged.current_price = live.price;
        }
        if live.availability != Availability::Unknown {
            merged.availability = live.availability;
        }
        if let (Some(listed), Some(current)) = (catalog.price, live.price) {
            merged.price_discrepancy = Some(self.is_discrepant(listed, current));
        }

        if let Some(url) = live.attributes.get(attr::URL) {
            merged.attributes.insert(attr::LIVE_URL.to_string(), url.clone());
        }
        if let Some(source) = live.attributes.get(attr::SOURCE) {
            merged.attributes.insert(attr::WEB_SOURCE.to_string(), source.clone());
        }
        merged
    }

    fn is_discrepant(&self, listed: Decimal, current: Decimal) -> bool {
        let old = listed.to_f64().unwrap_or(0.0);
        let new = current.to_f64().unwrap_or(0.0);
        (new - old).abs() / old.max(PRICE_EPSILON) > self.discrepancy_threshold
    }
}
