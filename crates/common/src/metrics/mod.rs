//! Metrics and observability utilities
//!
//! Metric descriptions and recording helpers built on the `metrics` facade.
//! Nothing is exported unless the binary installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

use crate::models::{ProviderKind, Task};

/// Metrics prefix for all RagForge metrics
pub const METRICS_PREFIX: &str = "ragforge";

/// Buckets for provider dispatch latency (in seconds). LLM calls are slow.
pub const DISPATCH_BUCKETS: &[f64] = &[
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    20.00,  // 20s
    60.00,  // 1m
    120.0,  // 2m
    180.0,  // 3m
];

/// Buckets for fused retrieval latency (in seconds)
pub const RETRIEVAL_BUCKETS: &[f64] = &[
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    5.000,  // 5s
    15.00,  // 15s
];

/// Outcome label attached to dispatch and expansion metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
    Timeout,
    /// Call skipped because nothing was requested
    Skipped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
            Outcome::Timeout => "timeout",
            Outcome::Skipped => "skipped",
        }
    }
}

/// Full histogram names paired with their bucket boundaries, for the exporter
pub fn histogram_buckets() -> [(String, &'static [f64]); 2] {
    [
        (format!("{}_provider_dispatch_duration_seconds", METRICS_PREFIX), DISPATCH_BUCKETS),
        (format!("{}_retrieval_duration_seconds", METRICS_PREFIX), RETRIEVAL_BUCKETS),
    ]
}

/// Register all metric descriptions
pub fn register_metrics() {
    // Provider metrics
    describe_counter!(
        format!("{}_provider_dispatch_total", METRICS_PREFIX),
        Unit::Count,
        "Total LLM provider calls"
    );

    describe_histogram!(
        format!("{}_provider_dispatch_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "LLM provider call latency in seconds"
    );

    // Retrieval metrics
    describe_counter!(
        format!("{}_retrieval_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total queries sent to the vector index"
    );

    describe_counter!(
        format!("{}_retrieval_chunks_total", METRICS_PREFIX),
        Unit::Count,
        "Total unique chunks kept after fusion"
    );

    describe_histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Fused retrieval latency in seconds"
    );

    // Expansion metrics
    describe_counter!(
        format!("{}_expansion_total", METRICS_PREFIX),
        Unit::Count,
        "Query expansion attempts"
    );

    describe_counter!(
        format!("{}_expansion_subqueries_total", METRICS_PREFIX),
        Unit::Count,
        "Sub-queries produced by expansion"
    );

    tracing::info!("Metrics registered");
}

/// Record one provider call
pub fn record_dispatch(provider: ProviderKind, task: Task, duration_secs: f64, outcome: Outcome) {
    counter!(
        format!("{}_provider_dispatch_total", METRICS_PREFIX),
        "provider" => provider.as_str(),
        "task" => task.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!(
        format!("{}_provider_dispatch_duration_seconds", METRICS_PREFIX),
        "provider" => provider.as_str(),
        "task" => task.as_str()
    )
    .record(duration_secs);
}

/// Record one fused retrieval
pub fn record_retrieval(queries: usize, chunks: usize, duration_secs: f64) {
    counter!(format!("{}_retrieval_queries_total", METRICS_PREFIX)).increment(queries as u64);
    counter!(format!("{}_retrieval_chunks_total", METRICS_PREFIX)).increment(chunks as u64);
    histogram!(format!("{}_retrieval_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record one expansion attempt and how many sub-queries it produced
pub fn record_expansion(outcome: Outcome, produced: usize) {
    counter!(
        format!("{}_expansion_total", METRICS_PREFIX),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    counter!(format!("{}_expansion_subqueries_total", METRICS_PREFIX)).increment(produced as u64);
}
