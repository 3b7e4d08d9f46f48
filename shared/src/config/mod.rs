//! Configuration types loaded from the environment

pub mod database;
pub mod resilience;

pub use database::DatabaseConfig;
pub use resilience::{CircuitBreakerSettings, ResilienceConfig, RetrySettings};
