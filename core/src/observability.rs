//! Observability sink for store operations.
//!
//! The stores report latency, retries, and circuit-breaker transitions
//! through this trait. It is a capability injected at construction time,
//! built once per process and passed to each store explicitly; there is
//! no process-global registry. All methods default to no-ops so a backend
//! only overrides what it collects. Reporting is advisory and never
//! affects control flow.

use std::time::Duration;

/// Sink for store telemetry.
///
/// Implementations must be `Send + Sync`; a single instance is shared by
/// every store wired to the same data-access layer.
pub trait StoreMetrics: Send + Sync {
    /// Records a completed guarded unit of work.
    ///
    /// - `domain`: the store's table scope (e.g. "pending_accounts").
    /// - `operation`: the store operation (e.g. "insert").
    /// - `duration`: wall-clock time including retries.
    /// - `success`: whether the unit ultimately succeeded.
    fn record_operation(&self, domain: &str, operation: &str, duration: Duration, success: bool) {
        let _ = (domain, operation, duration, success);
    }

    /// Records a retry attempt. `attempt` is the attempt that just failed
    /// (1 = the initial attempt).
    fn record_retry(&self, domain: &str, operation: &str, attempt: u32) {
        let _ = (domain, operation, attempt);
    }

    /// Records a circuit-breaker state transition ("open", "half-open",
    /// "closed").
    fn record_circuit_transition(&self, state: &str) {
        let _ = state;
    }
}

/// No-op sink used when no metrics backend is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStoreMetrics;

impl StoreMetrics for NoopStoreMetrics {}
