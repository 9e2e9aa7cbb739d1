//! Database connection management
//!
//! Pool construction is driven directly by the `[database]` section of
//! `Settings`; the remaining pool tunables are fixed here rather than
//! exposed as configuration.

use sqlx::{Pool, Postgres};
use std::time::Duration;

use crate::config::settings::DatabaseConfig;
use crate::utils::errors::CampusGateError;

pub type DatabasePool = Pool<Postgres>;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// Create a connection pool from the configured database section
pub async fn create_pool(config: &DatabaseConfig) -> Result<DatabasePool, CampusGateError> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(IDLE_TIMEOUT)
        .max_lifetime(MAX_LIFETIME)
        .connect(&config.url)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        "Database connection pool created successfully"
    );
    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), CampusGateError> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

/// Check database health
pub async fn health_check(pool: &DatabasePool) -> Result<(), CampusGateError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await?;

    Ok(())
}
