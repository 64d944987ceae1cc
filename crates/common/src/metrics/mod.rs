//! Metrics and observability utilities
//!
//! Provides Prometheus metrics for the query pipeline
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all SubQuery metrics
pub const METRICS_PREFIX: &str = "subquery";

/// Histogram buckets for end-to-end query latency (in seconds)
///
/// A query spans one decomposition call, the fan-out and one synthesis call,
/// so it is dominated by model latency.
pub const QUERY_BUCKETS: &[f64] = &[
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Query metrics
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of decomposed queries"
    );

    describe_histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end query latency in seconds"
    );

    // Sub-question metrics
    describe_counter!(
        format!("{}_sub_questions_total", METRICS_PREFIX),
        Unit::Count,
        "Sub-questions executed, by tool and outcome"
    );

    describe_histogram!(
        format!("{}_sub_question_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Tool engine latency per sub-question in seconds"
    );

    describe_gauge!(
        format!("{}_evidence_records", METRICS_PREFIX),
        Unit::Count,
        "Evidence records passed to the last synthesis call"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Outcome of a single sub-question execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubQuestionStatus {
    Answered,
    Dropped,
    Failed,
}

impl SubQuestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubQuestionStatus::Answered => "answered",
            SubQuestionStatus::Dropped => "dropped",
            SubQuestionStatus::Failed => "failed",
        }
    }
}

/// Helper to record query metrics
pub fn record_query(duration_secs: f64, mode: &str, evidence_count: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        "mode" => mode.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .record(duration_secs);

    if success {
        gauge!(format!("{}_evidence_records", METRICS_PREFIX)).set(evidence_count as f64);
    }
}

/// Helper to record sub-question metrics
pub fn record_sub_question(duration_secs: f64, tool: &str, status: SubQuestionStatus) {
    counter!(
        format!("{}_sub_questions_total", METRICS_PREFIX),
        "tool" => tool.to_string(),
        "outcome" => status.as_str()
    )
    .increment(1);

    if status == SubQuestionStatus::Answered {
        histogram!(
            format!("{}_sub_question_duration_seconds", METRICS_PREFIX),
            "tool" => tool.to_string()
        )
        .record(duration_secs);
    }
}
