//! Fault-tolerant data-access layer.
//!
//! Every store operation goes through [`FaultTolerantDatabase`], which
//! executes it as a guarded unit of work: circuit-breaker admission, a
//! per-attempt timeout, bounded retries with jittered exponential backoff
//! for transient engine failures, and latency reporting to the injected
//! observability sink. Reads use [`FaultTolerantDatabase::query`] and
//! return a value; writes use [`FaultTolerantDatabase::apply`] and
//! discard the engine's result.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use sqlx::MySqlPool;

use pv_core::errors::{StoreError, StoreResult};
use pv_core::observability::StoreMetrics;
use pv_shared::config::{ResilienceConfig, RetrySettings};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use super::connection::DatabasePool;

/// Bounded retry policy for transient storage failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempt budget, including the initial attempt
    pub max_attempts: u32,
    /// Backoff before the first retry
    pub initial_backoff: Duration,
    /// Backoff ceiling
    pub max_backoff: Duration,
    /// Backoff growth factor between attempts
    pub multiplier: f64,
    /// Jitter fraction applied to each backoff
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            multiplier: settings.multiplier,
            jitter: settings.jitter,
        }
    }
}

/// Whether an engine error is worth retrying.
///
/// Connectivity loss and engine-side contention are transient; everything
/// else (constraint violations, malformed statements, decode failures)
/// propagates immediately.
fn is_transient(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => {
            if let Some(mysql) = db.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
                // 1205 lock wait timeout, 1213 deadlock,
                // 2006/2013 server gone away / lost connection
                matches!(mysql.number(), 1205 | 1213 | 2006 | 2013)
            } else {
                false
            }
        }
        _ => false,
    }
}

/// Jitter in `[dur * (1 - factor), dur * (1 + factor)]` so concurrent
/// retries do not synchronize against a recovering engine.
fn apply_jitter(dur: Duration, factor: f64) -> Duration {
    if factor <= 0.0 {
        return dur;
    }

    let factor = factor.clamp(0.0, 1.0);
    let base = dur.as_nanos() as f64;
    let jittered = rand::thread_rng().gen_range(base * (1.0 - factor)..=base * (1.0 + factor));
    Duration::from_nanos(jittered as u64)
}

fn next_backoff(current: Duration, policy: &RetryPolicy) -> Duration {
    let grown = Duration::from_nanos((current.as_nanos() as f64 * policy.multiplier) as u64);
    grown.min(policy.max_backoff)
}

/// Executes closures as guarded units of work.
///
/// Shared by every store wired to the same engine, so the circuit state
/// reflects the engine's health across all of them.
#[derive(Clone)]
pub struct OperationGuard {
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    attempt_timeout: Duration,
    metrics: Arc<dyn StoreMetrics>,
}

impl OperationGuard {
    pub fn new(resilience: &ResilienceConfig, metrics: Arc<dyn StoreMetrics>) -> Self {
        Self {
            breaker: CircuitBreaker::new(
                CircuitBreakerConfig::from(&resilience.breaker),
                metrics.clone(),
            ),
            retry: RetryPolicy::from(&resilience.retry),
            attempt_timeout: Duration::from_millis(resilience.attempt_timeout_ms),
            metrics,
        }
    }

    /// Runs `f` under timeout, retry, and circuit-breaker policy, timing
    /// the whole unit under the `(domain, operation)` scope.
    pub async fn run<T, F, Fut>(&self, domain: &str, operation: &str, f: F) -> StoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let started = Instant::now();
        let result = self.run_with_retries(domain, operation, f).await;
        self.metrics
            .record_operation(domain, operation, started.elapsed(), result.is_ok());
        result
    }

    async fn run_with_retries<T, F, Fut>(&self, domain: &str, operation: &str, f: F) -> StoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut attempt: u32 = 0;
        let mut backoff = self.retry.initial_backoff;

        loop {
            attempt += 1;
            self.breaker.check()?;

            let failure = match tokio::time::timeout(self.attempt_timeout, f()).await {
                Ok(Ok(value)) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Ok(Err(e)) if !is_transient(&e) => {
                    // The engine answered; its health is not in question
                    self.breaker.record_success();
                    tracing::error!(domain, operation, error = %e, "storage operation failed");
                    return Err(StoreError::storage(e.to_string()));
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("attempt timed out after {:?}", self.attempt_timeout),
            };

            self.breaker.record_failure();

            if attempt >= self.retry.max_attempts {
                return Err(StoreError::Unavailable {
                    attempts: attempt,
                    last_error: failure,
                });
            }

            self.metrics.record_retry(domain, operation, attempt);
            let delay = apply_jitter(backoff, self.retry.jitter);
            tracing::debug!(
                domain,
                operation,
                attempt,
                backoff_ms = delay.as_millis() as u64,
                error = %failure,
                "retrying after transient storage failure"
            );
            tokio::time::sleep(delay).await;
            backoff = next_backoff(backoff, &self.retry);
        }
    }
}

/// Storage-engine handle wrapped in timeout, retry, and circuit-breaker
/// policy. Cheap to clone; clones share the pool and the circuit state.
#[derive(Clone)]
pub struct FaultTolerantDatabase {
    pool: DatabasePool,
    guard: OperationGuard,
}

impl FaultTolerantDatabase {
    pub fn new(
        pool: DatabasePool,
        resilience: &ResilienceConfig,
        metrics: Arc<dyn StoreMetrics>,
    ) -> Self {
        Self {
            pool,
            guard: OperationGuard::new(resilience, metrics),
        }
    }

    /// The wrapped pool, for health checks and migrations
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Write form: performs a unit of work and discards its result
    pub async fn apply<R, F, Fut>(&self, domain: &str, operation: &str, f: F) -> StoreResult<()>
    where
        F: Fn(MySqlPool) -> Fut,
        Fut: Future<Output = Result<R, sqlx::Error>>,
    {
        self.guard
            .run(domain, operation, || f(self.pool.get_pool().clone()))
            .await
            .map(|_| ())
    }

    /// Read form: performs a unit of work and returns its value
    pub async fn query<T, F, Fut>(&self, domain: &str, operation: &str, f: F) -> StoreResult<T>
    where
        F: Fn(MySqlPool) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        self.guard
            .run(domain, operation, || f(self.pool.get_pool().clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use pv_core::observability::NoopStoreMetrics;
    use pv_shared::config::{CircuitBreakerSettings, DatabaseConfig};

    use super::*;

    fn test_resilience() -> ResilienceConfig {
        ResilienceConfig {
            attempt_timeout_ms: 200,
            retry: RetrySettings {
                max_attempts: 3,
                initial_backoff_ms: 5,
                max_backoff_ms: 20,
                multiplier: 2.0,
                jitter: 0.0,
            },
            // High floor so retry tests never trip the breaker
            breaker: CircuitBreakerSettings {
                min_calls: 100,
                ..Default::default()
            },
        }
    }

    fn test_guard(resilience: &ResilienceConfig) -> OperationGuard {
        OperationGuard::new(resilience, Arc::new(NoopStoreMetrics))
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let guard = test_guard(&test_resilience());
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = Arc::clone(&calls);
        let result = guard
            .run("pending_accounts", "insert", || {
                let calls = Arc::clone(&calls_in);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, sqlx::Error>("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_failure_then_succeeds() {
        let guard = test_guard(&test_resilience());
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = Arc::clone(&calls);
        let result = guard
            .run("pending_accounts", "insert", || {
                let calls = Arc::clone(&calls_in);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(sqlx::Error::PoolTimedOut)
                    } else {
                        Ok::<_, sqlx::Error>(())
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_transient_failure_is_not_retried() {
        let guard = test_guard(&test_resilience());
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = Arc::clone(&calls);
        let result: StoreResult<()> = guard
            .run("pending_accounts", "find_for_number", || {
                let calls = Arc::clone(&calls_in);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(sqlx::Error::RowNotFound)
                }
            })
            .await;

        assert!(matches!(result, Err(StoreError::Storage { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_surfaces_unavailable() {
        let guard = test_guard(&test_resilience());
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = Arc::clone(&calls);
        let result: StoreResult<()> = guard
            .run("pending_devices", "insert", || {
                let calls = Arc::clone(&calls_in);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(sqlx::Error::PoolTimedOut)
                }
            })
            .await;

        match result {
            Err(StoreError::Unavailable {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("timed out"));
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempt_timeout_counts_as_transient() {
        let mut resilience = test_resilience();
        resilience.attempt_timeout_ms = 10;
        resilience.retry.max_attempts = 2;
        let guard = test_guard(&resilience);

        let result: StoreResult<()> = guard
            .run("pending_accounts", "vacuum", || async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(())
            })
            .await;

        match result {
            Err(StoreError::Unavailable {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("timed out"));
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_open_circuit_fails_fast_without_calling_engine() {
        let mut resilience = test_resilience();
        // One failure is enough to trip the breaker
        resilience.breaker = CircuitBreakerSettings {
            failure_rate_threshold: 1.0,
            min_calls: 1,
            window_size: 4,
            success_threshold: 1,
            reset_timeout_ms: 60_000,
        };
        let guard = test_guard(&resilience);
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = Arc::clone(&calls);
        let result: StoreResult<()> = guard
            .run("pending_accounts", "insert", || {
                let calls = Arc::clone(&calls_in);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(sqlx::Error::PoolTimedOut)
                }
            })
            .await;

        // The first failure opened the circuit; the second attempt was
        // rejected before reaching the closure
        assert!(matches!(result, Err(StoreError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Subsequent units fail fast with no engine contact at all
        let calls_in = Arc::clone(&calls);
        let result: StoreResult<()> = guard
            .run("pending_accounts", "insert", || {
                let calls = Arc::clone(&calls_in);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(StoreError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_apply_discards_the_result() {
        let config = DatabaseConfig::new("mysql://nobody@127.0.0.1:1/nowhere");
        let pool = DatabasePool::new_lazy(&config).unwrap();
        let database =
            FaultTolerantDatabase::new(pool, &test_resilience(), Arc::new(NoopStoreMetrics));

        let result = database
            .apply("pending_accounts", "insert", |_pool| async move {
                Ok::<_, sqlx::Error>(42u64)
            })
            .await;

        assert!(matches!(result, Ok(())));
    }

    #[tokio::test]
    async fn test_query_returns_the_value() {
        let config = DatabaseConfig::new("mysql://nobody@127.0.0.1:1/nowhere");
        let pool = DatabasePool::new_lazy(&config).unwrap();
        let database =
            FaultTolerantDatabase::new(pool, &test_resilience(), Arc::new(NoopStoreMetrics));

        let result = database
            .query("pending_accounts", "find_for_number", |_pool| async move {
                Ok::<_, sqlx::Error>(Some("123456".to_string()))
            })
            .await;

        assert_eq!(result.unwrap(), Some("123456".to_string()));
    }

    #[test]
    fn test_apply_jitter_zero_factor_is_identity() {
        let dur = Duration::from_millis(100);
        assert_eq!(apply_jitter(dur, 0.0), dur);
    }

    #[test]
    fn test_apply_jitter_stays_within_bounds() {
        let dur = Duration::from_millis(1000);
        for _ in 0..100 {
            let jittered = apply_jitter(dur, 0.25).as_millis();
            assert!((750..=1250).contains(&jittered), "jitter out of bounds: {jittered}ms");
        }
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(150),
            multiplier: 10.0,
            jitter: 0.0,
        };
        let grown = next_backoff(Duration::from_millis(100), &policy);
        assert_eq!(grown, Duration::from_millis(150));
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(is_transient(&sqlx::Error::PoolClosed));
        assert!(is_transient(&sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ))));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
        assert!(!is_transient(&sqlx::Error::Protocol("bad packet".into())));
    }
}
