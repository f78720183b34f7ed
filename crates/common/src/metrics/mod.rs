//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions.
//! The gateway installs the exporter; without it every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, gauge, describe_gauge, histogram, Unit};

/// Metrics prefix for all Shopwise metrics
pub const METRICS_PREFIX: &str = "shopwise";

/// Histogram buckets for source latency (in seconds)
pub const SOURCE_LATENCY_BUCKETS: &[f64] = &[
    0.010, // 10ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_pipeline_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of retrieval pipeline runs"
    );

    describe_histogram!(
        format!("{}_pipeline_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Retrieval pipeline latency in seconds"
    );

    describe_gauge!(
        format!("{}_pipeline_results_count", METRICS_PREFIX),
        Unit::Count,
        "Non-placeholder records selected per run"
    );

    describe_counter!(
        format!("{}_source_calls_total", METRICS_PREFIX),
        Unit::Count,
        "Source adapter calls by outcome"
    );

    describe_histogram!(
        format!("{}_source_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Source adapter latency in seconds"
    );

    describe_counter!(
        format!("{}_merge_matches_total", METRICS_PREFIX),
        Unit::Count,
        "Catalog/live pairs merged"
    );

    describe_counter!(
        format!("{}_price_discrepancies_total", METRICS_PREFIX),
        Unit::Count,
        "Merged pairs flagged with a price discrepancy"
    );

    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache misses"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record pipeline metrics
pub fn record_pipeline(duration_secs: f64, intent: &str, result_count: usize) {
    counter!(
        format!("{}_pipeline_runs_total", METRICS_PREFIX),
        "intent" => intent.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_pipeline_duration_seconds", METRICS_PREFIX),
        "intent" => intent.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_pipeline_results_count", METRICS_PREFIX),
        "intent" => intent.to_string()
    )
    .set(result_count as f64);
}

/// Helper to record one source adapter call
pub fn record_source(source: &str, status: &str, duration_secs: f64) {
    counter!(
        format!("{}_source_calls_total", METRICS_PREFIX),
        "source" => source.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_source_duration_seconds", METRICS_PREFIX),
        "source" => source.to_string()
    )
    .record(duration_secs);
}

/// Helper to record merge outcomes
pub fn record_merge(matched: usize, discrepancies: usize) {
    counter!(format!("{}_merge_matches_total", METRICS_PREFIX)).increment(matched as u64);
    counter!(format!("{}_price_discrepancies_total", METRICS_PREFIX))
        .increment(discrepancies as u64);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, cache_name: &str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in SOURCE_LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recorders_without_exporter() {
        record_pipeline(0.01, "check_price", 3);
        record_source("catalog", "ok", 0.002);
        record_merge(1, 0);
        record_cache(true, "catalog");
    }
}
