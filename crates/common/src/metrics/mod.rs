//! Metrics and observability utilities
//!
//! Prometheus metric descriptions with a standardized naming prefix.
//! Counters are incremented at the call sites; this module only owns the
//! registry descriptions.

use metrics::{describe_counter, describe_histogram, Unit};

/// Metrics prefix for all Course Cupid metrics
pub const METRICS_PREFIX: &str = "cupid";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_sessions_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat sessions created"
    );

    describe_counter!(
        format!("{}_sessions_deleted_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat sessions deleted"
    );

    describe_counter!(
        format!("{}_chat_turns_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat turns handled"
    );

    describe_counter!(
        format!("{}_responder_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total upstream responder failures"
    );

    describe_histogram!(
        format!("{}_responder_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Upstream responder latency in seconds"
    );
}
