//! Database connection pool management

use std::str::FromStr;
use std::time::Duration;

use sqlx::{
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
    ConnectOptions, MySqlPool,
};
use tracing::log::LevelFilter;

use crate::InfraError;
use pv_shared::config::DatabaseConfig;

/// MySQL connection pool wrapper.
///
/// Owns pool construction from a [`DatabaseConfig`], connectivity health
/// checks, and schema migrations for the two pending-verification tables.
#[derive(Clone)]
pub struct DatabasePool {
    pool: MySqlPool,
}

impl DatabasePool {
    /// Create a pool and establish the first connection eagerly
    pub async fn new(config: &DatabaseConfig) -> Result<Self, InfraError> {
        tracing::info!(
            max_connections = config.max_connections,
            "creating database connection pool"
        );

        let pool = Self::pool_options(config)
            .connect_with(Self::connect_options(config)?)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to create database pool");
                InfraError::Database(e)
            })?;

        Ok(Self { pool })
    }

    /// Create a pool without connecting.
    ///
    /// Connections are established on first use. Useful for tests and for
    /// processes that must start before the database is reachable.
    pub fn new_lazy(config: &DatabaseConfig) -> Result<Self, InfraError> {
        let pool = Self::pool_options(config).connect_lazy_with(Self::connect_options(config)?);
        Ok(Self { pool })
    }

    fn connect_options(config: &DatabaseConfig) -> Result<MySqlConnectOptions, InfraError> {
        let mut options = MySqlConnectOptions::from_str(&config.url)
            .map_err(|e| InfraError::Config(format!("invalid database URL: {e}")))?;

        let statement_level = if config.enable_logging {
            LevelFilter::Debug
        } else {
            LevelFilter::Off
        };
        options = options.log_statements(statement_level).log_slow_statements(
            LevelFilter::Warn,
            Duration::from_millis(config.slow_query_threshold),
        );

        Ok(options)
    }

    fn pool_options(config: &DatabaseConfig) -> MySqlPoolOptions {
        MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .max_lifetime(Duration::from_secs(config.max_lifetime))
            .test_before_acquire(true)
    }

    /// Get a handle to the underlying SQLx pool
    pub fn get_pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Check database connectivity with a trivial query
    pub async fn health_check(&self) -> Result<bool, InfraError> {
        let row = sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "database health check failed");
                InfraError::Database(e)
            })?;

        let value: i32 = sqlx::Row::try_get(&row, 0).unwrap_or(0);
        Ok(value == 1)
    }

    /// Create the pending-verification tables if they do not exist
    pub async fn run_migrations(&self) -> Result<(), InfraError> {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| InfraError::Config(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Current pool statistics
    pub fn get_statistics(&self) -> PoolStatistics {
        PoolStatistics {
            connections: self.pool.size(),
            idle_connections: self.pool.num_idle(),
            max_connections: self.pool.options().get_max_connections(),
        }
    }

    /// Close all connections; call during shutdown
    pub async fn close(&self) {
        tracing::info!("closing database connection pool");
        self.pool.close().await;
    }
}

/// Connection pool statistics
#[derive(Debug, Clone)]
pub struct PoolStatistics {
    /// Total number of connections in the pool
    pub connections: u32,
    /// Number of idle connections
    pub idle_connections: usize,
    /// Maximum allowed connections
    pub max_connections: u32,
}

impl std::fmt::Display for PoolStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pool: {}/{} connections ({} idle)",
            self.connections, self.max_connections, self.idle_connections
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_creation_with_invalid_url() {
        let config = DatabaseConfig::new("invalid://url");
        let result = DatabasePool::new(&config).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_lazy_pool_does_not_connect() {
        let config = DatabaseConfig::new("mysql://nobody@127.0.0.1:1/nowhere");
        let pool = DatabasePool::new_lazy(&config).unwrap();
        assert_eq!(pool.get_statistics().connections, 0);
    }

    #[test]
    fn test_pool_statistics_display() {
        let stats = PoolStatistics {
            connections: 5,
            idle_connections: 3,
            max_connections: 10,
        };

        let display = format!("{}", stats);
        assert!(display.contains("5/10"));
        assert!(display.contains("3 idle"));
    }
}
