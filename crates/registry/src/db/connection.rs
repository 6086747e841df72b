//! Database connection management

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info};

use crate::config::Settings;
use crate::error::{RegistryError, Result};

/// Database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(settings: &Settings) -> Result<Self> {
        info!(
            "Connecting to database (pool: min={}, max={}, timeout={}s)",
            settings.db_min_connections,
            settings.db_max_connections,
            settings.db_acquire_timeout_secs
        );

        let pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .min_connections(settings.db_min_connections)
            .acquire_timeout(Duration::from_secs(settings.db_acquire_timeout_secs))
            .max_lifetime(Duration::from_secs(settings.db_max_lifetime_secs))
            .connect(&settings.database_url)
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {}", e);
                RegistryError::Database(e)
            })?;

        info!("Database connection established");
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");

        let migration_0001 = include_str!("../../migrations/0001_init.sql");

        sqlx::raw_sql(migration_0001)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Migration 0001 failed: {}", e);
                RegistryError::Database(e)
            })?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(RegistryError::Database)?;
        Ok(())
    }
}
