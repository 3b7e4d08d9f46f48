//! Database access layer
//!
//! Connection pooling, the fault-tolerant guard every store operation
//! runs through, and the engine-backed store implementations.

pub mod circuit_breaker;
pub mod connection;
pub mod fault_tolerant;
pub mod repositories;

// Re-export commonly used types
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use connection::{DatabasePool, PoolStatistics};
pub use fault_tolerant::{FaultTolerantDatabase, OperationGuard, RetryPolicy};
pub use repositories::{PendingAccounts, PendingDevices};
