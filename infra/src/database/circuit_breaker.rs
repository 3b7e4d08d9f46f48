//! Circuit breaker for the underlying storage engine.
//!
//! Three-state breaker (Closed → Open → Half-Open) over a sliding window
//! of recent call outcomes. While closed, outcomes are recorded and the
//! failure rate is evaluated once the window holds at least `min_calls`
//! entries; crossing `failure_rate_threshold` opens the circuit. While
//! open, calls fail fast without touching the engine until
//! `reset_timeout` elapses, after which probe traffic is admitted;
//! `success_threshold` consecutive probe successes close the circuit and
//! any probe failure reopens it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pv_core::errors::StoreError;
use pv_core::observability::StoreMetrics;
use pv_shared::config::CircuitBreakerSettings;

/// Circuit breaker thresholds
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failure rate over the window at which the circuit opens
    pub failure_rate_threshold: f64,
    /// Minimum recorded outcomes before the rate is evaluated
    pub min_calls: u32,
    /// Number of recent outcomes tracked
    pub window_size: u32,
    /// Consecutive probe successes required to close a half-open circuit
    pub success_threshold: u32,
    /// Cool-down before an open circuit admits probe traffic
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::from(&CircuitBreakerSettings::default())
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        Self {
            failure_rate_threshold: settings.failure_rate_threshold,
            min_calls: settings.min_calls,
            window_size: settings.window_size,
            success_threshold: settings.success_threshold,
            reset_timeout: Duration::from_millis(settings.reset_timeout_ms),
        }
    }
}

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, calls flow through
    Closed,
    /// Circuit tripped, calls are rejected without engine contact
    Open,
    /// Probing, traffic is admitted to test recovery
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

struct CircuitInner {
    state: CircuitState,
    /// Recent outcomes, `true` for success; bounded by `window_size`
    window: VecDeque<bool>,
    /// Consecutive successes while half-open
    consecutive_successes: u32,
    /// When the circuit last opened
    opened_at: Option<Instant>,
}

impl CircuitInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            window: VecDeque::new(),
            consecutive_successes: 0,
            opened_at: None,
        }
    }

    fn failure_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let failures = self.window.iter().filter(|ok| !**ok).count();
        failures as f64 / self.window.len() as f64
    }
}

/// Engine-scoped circuit breaker, shared by every store wired to the same
/// data-access layer. Thread-safe; the lock is held only for bookkeeping,
/// never across engine calls.
#[derive(Clone)]
pub struct CircuitBreaker {
    inner: Arc<Mutex<CircuitInner>>,
    config: CircuitBreakerConfig,
    metrics: Arc<dyn StoreMetrics>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig, metrics: Arc<dyn StoreMetrics>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CircuitInner::new())),
            config,
            metrics,
        }
    }

    /// Checks whether a call may proceed.
    ///
    /// Returns `Err(StoreError::CircuitOpen)` with the remaining cool-down
    /// while the circuit is open. Once the cool-down has elapsed the
    /// circuit moves to half-open and the call is admitted as a probe.
    pub fn check(&self) -> Result<(), StoreError> {
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                if let Some(opened_at) = inner.opened_at {
                    if opened_at.elapsed() >= self.config.reset_timeout {
                        self.transition(&mut inner, CircuitState::HalfOpen);
                        inner.consecutive_successes = 0;
                        return Ok(());
                    }
                }

                let retry_after = inner
                    .opened_at
                    .map(|t| self.config.reset_timeout.saturating_sub(t.elapsed()))
                    .unwrap_or(self.config.reset_timeout);

                Err(StoreError::CircuitOpen { retry_after })
            }
        }
    }

    /// Records a call that reached the engine and succeeded
    pub fn record_success(&self) {
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => {
                Self::push_outcome(&mut inner, &self.config, true);
            }
            CircuitState::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    self.transition(&mut inner, CircuitState::Closed);
                    inner.window.clear();
                    inner.consecutive_successes = 0;
                    inner.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Records a call that failed against the engine
    pub fn record_failure(&self) {
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => {
                Self::push_outcome(&mut inner, &self.config, false);
                if inner.window.len() >= self.config.min_calls as usize
                    && inner.failure_rate() >= self.config.failure_rate_threshold
                {
                    self.transition(&mut inner, CircuitState::Open);
                    inner.opened_at = Some(Instant::now());
                    inner.window.clear();
                }
            }
            CircuitState::HalfOpen => {
                // Probe failed, back to open for a full cool-down
                self.transition(&mut inner, CircuitState::Open);
                inner.opened_at = Some(Instant::now());
                inner.consecutive_successes = 0;
            }
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
            }
        }
    }

    /// Current state, surfacing the implicit open → half-open transition
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();

        if inner.state == CircuitState::Open {
            if let Some(opened_at) = inner.opened_at {
                if opened_at.elapsed() >= self.config.reset_timeout {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.consecutive_successes = 0;
                }
            }
        }

        inner.state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CircuitInner> {
        // A poisoned lock only means a panic mid-bookkeeping; the state
        // is still usable
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push_outcome(inner: &mut CircuitInner, config: &CircuitBreakerConfig, ok: bool) {
        inner.window.push_back(ok);
        while inner.window.len() > config.window_size as usize {
            inner.window.pop_front();
        }
    }

    fn transition(&self, inner: &mut CircuitInner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        tracing::warn!(
            from = %from,
            to = %to,
            failure_rate = inner.failure_rate(),
            "circuit breaker state transition"
        );
        self.metrics.record_circuit_transition(&to.to_string());
    }
}
