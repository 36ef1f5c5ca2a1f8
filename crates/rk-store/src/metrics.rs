//! Store metrics: request counts, latency and retries per operation.

use metrics::{counter, histogram};

pub mod names {
    /// Total store requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "rk_store_requests_total";

    /// Total retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "rk_store_retries_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "rk_store_latency_seconds";

    /// Documents returned by list and query operations.
    pub const DOCUMENTS_RETURNED_TOTAL: &str = "rk_store_documents_returned_total";
}

/// Record metrics for a completed request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record how many documents a read returned.
pub fn record_documents_returned(operation: &str, count: usize) {
    counter!(
        names::DOCUMENTS_RETURNED_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(count as u64);
}
