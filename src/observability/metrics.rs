//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, mount
//! - `proxy_request_duration_seconds` (histogram): latency by method, mount
//!
//! # Design Decisions
//! - Labels stay low-cardinality: mount prefix, never the target URL
//! - Exporter is optional; recording without it is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one relayed (or rejected) request.
pub fn record_request(method: &str, status: u16, mount: &str, start_time: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("mount", mount.to_string()),
    ];
    counter!("proxy_requests_total", &labels).increment(1);

    let labels = [("method", method.to_string()), ("mount", mount.to_string())];
    histogram!("proxy_request_duration_seconds", &labels).record(start_time.elapsed().as_secs_f64());
}
