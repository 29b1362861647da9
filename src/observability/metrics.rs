//! Metrics collection and exposition.
//!
//! # Metrics
//! - `provider_transport_attempts_total` (counter): attempts by outcome
//! - `provider_transport_retries_total` (counter): retries scheduled
//! - `provider_credential_refresh_total` (counter): issuance by result
//! - `provider_poll_duration_seconds` (histogram): wait time by result
//! - `provider_cleanup_deleted_total` (counter): resources removed by cleanup
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are low-cardinality (outcome/result/kind only)

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one transport attempt.
pub fn record_attempt(outcome: &'static str) {
    metrics::counter!("provider_transport_attempts_total", "outcome" => outcome).increment(1);
}

/// Record a scheduled retry.
pub fn record_retry() {
    metrics::counter!("provider_transport_retries_total").increment(1);
}

/// Record a credential issuance.
pub fn record_credential_refresh(success: bool) {
    let result = if success { "success" } else { "error" };
    metrics::counter!("provider_credential_refresh_total", "result" => result).increment(1);
}

/// Record how long a convergence wait took.
pub fn record_poll(result: &'static str, elapsed: Duration) {
    metrics::histogram!("provider_poll_duration_seconds", "result" => result)
        .record(elapsed.as_secs_f64());
}

/// Record a resource removed by bulk cleanup.
pub fn record_cleanup_deleted(kind: &'static str) {
    metrics::counter!("provider_cleanup_deleted_total", "kind" => kind).increment(1);
}
