//! Metric names and recording helpers for backend calls.

use std::time::Duration;

pub const API_REQUESTS_TOTAL: &str = "attendance_api_requests_total";
pub const API_REQUEST_SECONDS: &str = "attendance_api_request_seconds";
pub const SUGGESTION_REFRESHES_TOTAL: &str = "attendance_suggestion_refreshes_total";

/// Register descriptions with whichever recorder is installed.
pub fn describe_metrics() {
    metrics::describe_counter!(
        API_REQUESTS_TOTAL,
        "Calls made to the attendance backend, by operation and outcome"
    );
    metrics::describe_histogram!(
        API_REQUEST_SECONDS,
        metrics::Unit::Seconds,
        "Latency of attendance backend calls"
    );
    metrics::describe_counter!(
        SUGGESTION_REFRESHES_TOTAL,
        "Periodic batch suggestion evaluations"
    );
}

pub fn record_request(op: &'static str, ok: bool, elapsed: Duration) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!(API_REQUESTS_TOTAL, "op" => op, "outcome" => outcome).increment(1);
    metrics::histogram!(API_REQUEST_SECONDS, "op" => op).record(elapsed.as_secs_f64());
}

pub fn record_refresh(status: &'static str) {
    metrics::counter!(SUGGESTION_REFRESHES_TOTAL, "status" => status).increment(1);
}
