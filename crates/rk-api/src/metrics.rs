//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Install the Prometheus recorder and return a handle for rendering.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "rk_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "rk_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "rk_http_requests_in_flight";

    // Domain metrics
    pub const SIGNUPS_TOTAL: &str = "rk_signups_total";
    pub const LOGINS_TOTAL: &str = "rk_logins_total";
    pub const RATINGS_TOTAL: &str = "rk_ratings_total";
    pub const COMMENTS_TOTAL: &str = "rk_comments_total";
    pub const FOLLOW_CHANGES_TOTAL: &str = "rk_follow_changes_total";
    pub const COMMIT_CONFLICTS_TOTAL: &str = "rk_commit_conflicts_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "rk_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, route: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", route.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_signup() {
    counter!(names::SIGNUPS_TOTAL).increment(1);
}

/// `outcome` is "success", "unknown_user" or "bad_password".
pub fn record_login(outcome: &'static str) {
    counter!(names::LOGINS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_rating(policy: &'static str) {
    counter!(names::RATINGS_TOTAL, "policy" => policy).increment(1);
}

pub fn record_comment() {
    counter!(names::COMMENTS_TOTAL).increment(1);
}

/// `action` is "follow" or "unfollow".
pub fn record_follow_change(action: &'static str) {
    counter!(names::FOLLOW_CHANGES_TOTAL, "action" => action).increment(1);
}

/// A commit lost a race and the operation was retried.
pub fn record_commit_conflict(operation: &'static str) {
    counter!(names::COMMIT_CONFLICTS_TOTAL, "operation" => operation).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Metrics middleware for HTTP requests.
///
/// Labels use the matched route template (`/Recipe/:id`) so ids never become
/// label values.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
