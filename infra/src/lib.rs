//! # Infrastructure Layer
//!
//! MySQL-backed implementations of the pending-verification stores.
//!
//! ## Architecture
//!
//! - **Connection**: SQLx MySQL pool management and schema migrations
//! - **Fault tolerance**: every store operation runs as a guarded unit of
//!   work with a per-attempt timeout, bounded retries, and a circuit
//!   breaker scoped to the storage engine
//! - **Stores**: `PendingAccounts` (native upsert + vacuum) and
//!   `PendingDevices` (transactional update-then-insert upsert)
//! - **Observability**: a `metrics`-facade sink for the telemetry the
//!   guard reports

pub mod database;
pub mod observability;

use std::sync::Arc;

use pv_core::observability::StoreMetrics;
use pv_shared::config::{DatabaseConfig, ResilienceConfig};

use database::{DatabasePool, FaultTolerantDatabase, PendingAccounts, PendingDevices};

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfraError {
    /// Database connection error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Both pending-verification stores wired to one storage engine.
///
/// The stores share a connection pool and a circuit breaker, so engine
/// health is judged across all traffic.
#[derive(Clone)]
pub struct PendingStores {
    pub accounts: PendingAccounts,
    pub devices: PendingDevices,
    database: FaultTolerantDatabase,
}

impl PendingStores {
    /// Connect to the storage engine and wire up both stores.
    ///
    /// The metrics sink is constructed once per process by the caller and
    /// injected here; use `NoopStoreMetrics` when telemetry is unwanted.
    pub async fn connect(
        database_config: &DatabaseConfig,
        resilience: &ResilienceConfig,
        metrics: Arc<dyn StoreMetrics>,
    ) -> Result<Self, InfraError> {
        let pool = DatabasePool::new(database_config).await?;
        Ok(Self::from_pool(pool, resilience, metrics))
    }

    /// Wire up both stores over an existing pool
    pub fn from_pool(
        pool: DatabasePool,
        resilience: &ResilienceConfig,
        metrics: Arc<dyn StoreMetrics>,
    ) -> Self {
        let database = FaultTolerantDatabase::new(pool, resilience, metrics);
        Self {
            accounts: PendingAccounts::new(database.clone()),
            devices: PendingDevices::new(database.clone()),
            database,
        }
    }

    /// The shared data-access layer, for health checks and migrations
    pub fn database(&self) -> &FaultTolerantDatabase {
        &self.database
    }
}

/// Load store configuration from the environment (honoring a `.env`
/// file when present) and connect.
pub async fn initialize(metrics: Arc<dyn StoreMetrics>) -> Result<PendingStores, InfraError> {
    dotenvy::dotenv().ok();

    let database_config = DatabaseConfig::from_env();
    let resilience = ResilienceConfig::from_env();

    tracing::info!("initializing pending-verification stores");
    let stores = PendingStores::connect(&database_config, &resilience, metrics).await?;
    stores.database().pool().run_migrations().await?;

    Ok(stores)
}
