//! Resilience configuration for the fault-tolerant data-access layer

use serde::{Deserialize, Serialize};

/// Retry policy settings for transient storage failures
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    /// Total attempt budget, including the initial attempt
    pub max_attempts: u32,

    /// Backoff before the first retry, in milliseconds
    pub initial_backoff_ms: u64,

    /// Backoff ceiling, in milliseconds
    pub max_backoff_ms: u64,

    /// Backoff growth factor between attempts
    pub multiplier: f64,

    /// Jitter fraction applied to each backoff (0.0 disables jitter)
    pub jitter: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 50,
            max_backoff_ms: 1000,
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

/// Circuit breaker settings for the underlying storage engine
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CircuitBreakerSettings {
    /// Failure rate over the outcome window at which the circuit opens
    pub failure_rate_threshold: f64,

    /// Minimum recorded outcomes before the failure rate is evaluated
    pub min_calls: u32,

    /// Number of recent outcomes tracked
    pub window_size: u32,

    /// Consecutive probe successes required to close a half-open circuit
    pub success_threshold: u32,

    /// Cool-down before an open circuit admits probe traffic, in milliseconds
    pub reset_timeout_ms: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            min_calls: 10,
            window_size: 50,
            success_threshold: 2,
            reset_timeout_ms: 30_000,
        }
    }
}

/// Settings for the guarded unit of work: per-attempt timeout, retry
/// policy, and circuit breaker thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResilienceConfig {
    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    /// Retry policy
    #[serde(default)]
    pub retry: RetrySettings,

    /// Circuit breaker thresholds
    #[serde(default)]
    pub breaker: CircuitBreakerSettings,
}

impl ResilienceConfig {
    /// Create from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = parse_env("STORE_ATTEMPT_TIMEOUT_MS") {
            config.attempt_timeout_ms = v;
        }
        if let Some(v) = parse_env("STORE_RETRY_MAX_ATTEMPTS") {
            config.retry.max_attempts = v;
        }
        if let Some(v) = parse_env("STORE_RETRY_INITIAL_BACKOFF_MS") {
            config.retry.initial_backoff_ms = v;
        }
        if let Some(v) = parse_env("STORE_BREAKER_MIN_CALLS") {
            config.breaker.min_calls = v;
        }
        if let Some(v) = parse_env("STORE_BREAKER_RESET_TIMEOUT_MS") {
            config.breaker.reset_timeout_ms = v;
        }

        config
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: default_attempt_timeout_ms(),
            retry: RetrySettings::default(),
            breaker: CircuitBreakerSettings::default(),
        }
    }
}

fn default_attempt_timeout_ms() -> u64 {
    5_000
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
