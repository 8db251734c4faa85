//! Prometheus metrics for monitoring the blackjack server.
//!
//! Metrics are exposed in Prometheus text format on a separate listener
//! (`METRICS_BIND`). Without an installed exporter every call here is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bj_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/accounts/{account_id}/sessions", 201);
//! metrics::active_sessions(10);
//! ```

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use blackjack::Outcome;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, time::Instant};

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// `path` is the route template, never the concrete URI.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

/// Route-level middleware recording count and latency per route template.
pub async fn track_http(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed();

    http_requests_total(&method, &path, response.status().as_u16());
    http_request_duration_ms(&method, &path, elapsed.as_secs_f64() * 1000.0);
    response
}

// ============================================================================
// Game Metrics
// ============================================================================

/// Increment settled rounds counter.
pub fn rounds_settled_total(outcome: Outcome) {
    metrics::counter!("rounds_settled_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Set current live sessions count.
pub fn active_sessions(count: usize) {
    metrics::gauge!("active_sessions").set(count as f64);
}

/// Add evicted sessions to the eviction counter.
pub fn sessions_evicted_total(count: usize) {
    metrics::counter!("sessions_evicted_total").increment(count as u64);
}
