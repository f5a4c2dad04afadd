//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, relay mode
//! - `gateway_request_duration_seconds` (histogram): time to response head
//! - `gateway_analytics_failures_total` (counter): dropped analytics writes
//! - `gateway_retention_deleted_total` (counter): purged exchange records
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels never carry hosts or credentials supplied by callers

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, mode: &'static str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "mode" => mode
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_analytics_failure() {
    metrics::counter!("gateway_analytics_failures_total").increment(1);
}

pub fn record_retention_deleted(count: u64) {
    metrics::counter!("gateway_retention_deleted_total").increment(count);
}
