//! Observability sink backed by the `metrics` crate facade.
//!
//! Forwards store telemetry to whatever recorder the process installs
//! (Prometheus exporter, StatsD, ...). All metric names carry the
//! `pending_store_` prefix.

use std::time::Duration;

use pv_core::observability::StoreMetrics;

/// Metric name constants for the `metrics` facade
mod metric_names {
    /// Completed guarded units by store, operation, and outcome
    pub const OPERATIONS_TOTAL: &str = "pending_store_operations_total";
    /// Guarded-unit latency distribution
    pub const OPERATION_DURATION: &str = "pending_store_operation_duration_seconds";
    /// Retry attempts by store and operation
    pub const RETRIES_TOTAL: &str = "pending_store_retries_total";
    /// Circuit breaker state transitions
    pub const CIRCUIT_TRANSITIONS_TOTAL: &str = "pending_store_circuit_transitions_total";
}

/// `StoreMetrics` implementation forwarding to the `metrics` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeStoreMetrics;

impl StoreMetrics for FacadeStoreMetrics {
    fn record_operation(&self, domain: &str, operation: &str, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };
        metrics::counter!(
            metric_names::OPERATIONS_TOTAL,
            "store" => domain.to_owned(),
            "operation" => operation.to_owned(),
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            metric_names::OPERATION_DURATION,
            "store" => domain.to_owned(),
            "operation" => operation.to_owned()
        )
        .record(duration.as_secs_f64());
    }

    fn record_retry(&self, domain: &str, operation: &str, attempt: u32) {
        metrics::counter!(
            metric_names::RETRIES_TOTAL,
            "store" => domain.to_owned(),
            "operation" => operation.to_owned(),
            "attempt" => attempt.to_string()
        )
        .increment(1);
    }

    fn record_circuit_transition(&self, state: &str) {
        metrics::counter!(
            metric_names::CIRCUIT_TRANSITIONS_TOTAL,
            "state" => state.to_owned()
        )
        .increment(1);
    }
}
