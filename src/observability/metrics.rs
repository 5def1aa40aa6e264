//! Metrics collection and exposition.
//!
//! # Metrics
//! - `httpd_requests_total` (counter): requests by method and status
//! - `httpd_request_duration_seconds` (histogram): latency by method

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on the configured address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics exporter"),
    }
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, started: Instant) {
    metrics::counter!(
        "httpd_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "httpd_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}
