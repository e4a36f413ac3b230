//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions
//! for source polling, job runs, and scoring.

use metrics::{
    counter, describe_counter, describe_histogram, histogram, Unit,
};
use std::time::Instant;

/// Metrics prefix for all PaperPulse metrics
pub const METRICS_PREFIX: &str = "paperpulse";

/// Buckets for upstream source request latency (in seconds)
pub const SOURCE_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Buckets for whole job runs (in seconds)
pub const RUN_BUCKETS: &[f64] = &[
    1.0,    // 1s
    5.0,    // 5s
    15.0,   // 15s
    30.0,   // 30s
    60.0,   // 1m
    120.0,  // 2m
    300.0,  // 5m
    600.0,  // 10m
    1200.0, // 20m
    1800.0, // 30m - run budget ceiling
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Source metrics
    describe_counter!(
        format!("{}_source_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total requests issued to upstream sources"
    );

    describe_histogram!(
        format!("{}_source_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Upstream source request latency in seconds"
    );

    describe_counter!(
        format!("{}_source_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total upstream source failures"
    );

    // Discovery metrics
    describe_counter!(
        format!("{}_papers_discovered_total", METRICS_PREFIX),
        Unit::Count,
        "Total papers discovered and upserted"
    );

    describe_counter!(
        format!("{}_metric_samples_total", METRICS_PREFIX),
        Unit::Count,
        "Total metric samples appended"
    );

    // Citation metrics
    describe_counter!(
        format!("{}_citation_edges_resolved_total", METRICS_PREFIX),
        Unit::Count,
        "Total citation edges accepted by fuzzy matching"
    );

    // Scoring metrics
    describe_counter!(
        format!("{}_hype_scores_computed_total", METRICS_PREFIX),
        Unit::Count,
        "Total hype scores computed"
    );

    // Job metrics
    describe_counter!(
        format!("{}_job_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Total job runs by kind and terminal status"
    );

    describe_counter!(
        format!("{}_job_items_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Total per-item failures inside job runs"
    );

    describe_histogram!(
        format!("{}_job_run_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Job run duration in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to time a single upstream source request
pub struct SourceRequestTimer {
    start: Instant,
    source: String,
}

impl SourceRequestTimer {
    /// Start tracking a request against a named source
    pub fn start(source: &str) -> Self {
        Self {
            start: Instant::now(),
            source: source.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, success: bool) {
        let duration = self.start.elapsed().as_secs_f64();
        let status = if success { "ok" } else { "error" };

        counter!(
            format!("{}_source_requests_total", METRICS_PREFIX),
            "source" => self.source.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_source_request_duration_seconds", METRICS_PREFIX),
            "source" => self.source
        )
        .record(duration);
    }
}

/// Helper to record a source-level failure
pub fn record_source_error(source: &str, reason: &str) {
    counter!(
        format!("{}_source_errors_total", METRICS_PREFIX),
        "source" => source.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Helper to record discovered papers
pub fn record_discovered(source: &str, papers: u64) {
    counter!(
        format!("{}_papers_discovered_total", METRICS_PREFIX),
        "source" => source.to_string()
    )
    .increment(papers);
}

/// Helper to record an appended metric sample
pub fn record_sample(source: &str, kind: &str) {
    counter!(
        format!("{}_metric_samples_total", METRICS_PREFIX),
        "source" => source.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Helper to record accepted citation edges
pub fn record_edges_resolved(count: u64) {
    counter!(format!(
        "{}_citation_edges_resolved_total",
        METRICS_PREFIX
    ))
    .increment(count);
}

/// Helper to record a computed score
pub fn record_score(trend: &str) {
    counter!(
        format!("{}_hype_scores_computed_total", METRICS_PREFIX),
        "trend" => trend.to_string()
    )
    .increment(1);
}

/// Helper to record a finished job run
pub fn record_job_run(kind: &str, status: &str, duration_secs: f64, items_failed: u64) {
    counter!(
        format!("{}_job_runs_total", METRICS_PREFIX),
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if items_failed > 0 {
        counter!(
            format!("{}_job_items_failed_total", METRICS_PREFIX),
            "kind" => kind.to_string()
        )
        .increment(items_failed);
    }

    histogram!(
        format!("{}_job_run_duration_seconds", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .record(duration_secs);
}
