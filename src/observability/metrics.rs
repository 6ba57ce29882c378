//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fanout_queries_total` (counter): fan-outs run
//! - `fanout_backends_succeeded` (histogram): backends that succeeded per fan-out
//! - `fanout_backend_queries_total` (counter): per backend and outcome
//! - `fanout_backend_latency_seconds` (histogram): per backend, admission included
//! - `fanout_retries_total` (counter): retried backend calls
//! - `fanout_admission_failures_total` (counter): by backend and reason
//! - `fanout_limiter_queue_depth` (gauge): waiters seen when a query arrives
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::limiter::LimiterError;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_fanout(backends: usize, succeeded: usize) {
    counter!("fanout_queries_total").increment(1);
    histogram!("fanout_backends_succeeded").record(succeeded as f64);
    if succeeded == 0 && backends > 0 {
        counter!("fanout_total_outages_total").increment(1);
    }
}

pub fn record_backend_query(backend: &str, outcome: &'static str, latency: Duration) {
    counter!(
        "fanout_backend_queries_total",
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("fanout_backend_latency_seconds", "backend" => backend.to_string())
        .record(latency.as_secs_f64());
}

pub fn record_retry(backend: &str) {
    counter!("fanout_retries_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_admission_failure(backend: &str, error: &LimiterError) {
    let reason = match error {
        LimiterError::AcquireTimeout(_) => "timeout",
        LimiterError::Shutdown => "shutdown",
        LimiterError::Configuration(_) => "configuration",
    };
    counter!(
        "fanout_admission_failures_total",
        "backend" => backend.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_limiter_queue(backend: &str, queued: usize) {
    gauge!("fanout_limiter_queue_depth", "backend" => backend.to_string()).set(queued as f64);
}
