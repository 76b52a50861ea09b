//! Metrics collection and exposition.
//!
//! # Metrics
//! - `user_service_inflight_requests` (gauge): requests currently tracked
//! - `user_service_requests_total` (counter): admitted requests by method, status
//! - `user_service_requests_rejected_total` (counter): requests refused during shutdown
//! - `user_service_request_duration_seconds` (histogram): handler latency

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tokio::time::Instant;

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn set_inflight_requests(count: usize) {
    gauge!("user_service_inflight_requests").set(count as f64);
}

pub fn record_request(method: &str, status: u16, started: Instant) {
    let status = status.to_string();
    counter!("user_service_requests_total", "method" => method.to_string(), "status" => status.clone())
        .increment(1);
    histogram!("user_service_request_duration_seconds", "method" => method.to_string(), "status" => status)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_rejected() {
    counter!("user_service_requests_rejected_total").increment(1);
}
