//! Prometheus metrics for the lookup server
//!
//! Privacy-safe metrics: only source kind, gate and outcome labels, never
//! query content or shard keys.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_BUSY: &str = "busy";
pub const OUTCOME_CLIENT_ERROR: &str = "client_error";
pub const OUTCOME_SERVER_ERROR: &str = "server_error";
pub const OUTCOME_FAILED: &str = "failed";

pub fn record_lookup_request(outcome: &str, duration: Duration) {
    counter!("lookup_requests_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("lookup_request_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_source_query(source: &str, outcome: &str, duration: Duration) {
    counter!("lookup_source_queries_total", "source" => source.to_string(), "outcome" => outcome.to_string())
        .increment(1);
    histogram!("lookup_source_query_duration_seconds", "source" => source.to_string(), "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_source_slot_acquired() {
    gauge!("lookup_sources_in_flight").increment(1.0);
}

pub fn record_source_slot_released() {
    gauge!("lookup_sources_in_flight").decrement(1.0);
}

pub fn record_admission_rejection(gate: &str) {
    counter!("lookup_admission_rejections_total", "gate" => gate.to_string()).increment(1);
}

pub fn set_sources_configured(count: usize) {
    gauge!("lookup_sources_configured").set(count as f64);
}

/// Install the global recorder; fails if one is already installed
pub fn init_prometheus_recorder(
) -> Result<metrics_exporter_prometheus::PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    builder.install_recorder()
}
