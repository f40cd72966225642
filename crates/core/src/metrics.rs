//! Prometheus metrics for the mirror.
//!
//! This module provides metrics for:
//! - Remote fetching (pages, retries, request latency)
//! - Record persistence (writes, failures)
//! - Index rebuilds
//!
//! A batch run has no scrape endpoint; the runner renders the registry with
//! [`encode_metrics`] into a text file for a node-exporter style collector.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        registry.register(metric).unwrap();
    }
    registry
});

// =============================================================================
// Fetching
// =============================================================================

/// Pages fetched successfully, by query label.
pub static PAGES_FETCHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("offermirror_pages_fetched_total", "Total pages fetched"),
        &["query"],
    )
    .unwrap()
});

/// Page attempts that failed with a retryable application error.
pub static FETCH_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "offermirror_fetch_retries_total",
            "Page requests retried after a remote application error",
        ),
        &["query"],
    )
    .unwrap()
});

/// Round-trip latency of page requests in seconds.
pub static FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "offermirror_fetch_duration_seconds",
            "Duration of a single page request",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["query"],
    )
    .unwrap()
});

// =============================================================================
// Persistence
// =============================================================================

/// Records written to the store.
pub static RECORDS_PERSISTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "offermirror_records_persisted_total",
        "Total records written to the record store",
    )
    .unwrap()
});

/// Records that could not be parsed or written.
pub static RECORD_WRITE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "offermirror_record_write_failures_total",
        "Records skipped because they could not be parsed or written",
    )
    .unwrap()
});

// =============================================================================
// Indexing
// =============================================================================

/// Index rebuild duration in seconds.
pub static INDEX_REBUILD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "offermirror_index_rebuild_duration_seconds",
            "Duration of a full index rebuild",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(PAGES_FETCHED.clone()),
        Box::new(FETCH_RETRIES.clone()),
        Box::new(FETCH_DURATION.clone()),
        Box::new(RECORDS_PERSISTED.clone()),
        Box::new(RECORD_WRITE_FAILURES.clone()),
        Box::new(INDEX_REBUILD_DURATION.clone()),
    ]
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
