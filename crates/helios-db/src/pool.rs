//! PostgreSQL connection pool management

use helios_core::{AppError, AppResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, warn};

/// Default maximum number of connections in the pool
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default connection acquire timeout in seconds
const DEFAULT_ACQUIRE_TIMEOUT: u64 = 30;

/// Default idle timeout in seconds
const DEFAULT_IDLE_TIMEOUT: u64 = 600;

/// Create a PostgreSQL connection pool
///
/// # Arguments
///
/// * `database_url` - PostgreSQL connection URL
/// * `max_connections` - Maximum pool size (None = default)
pub async fn create_pool(database_url: &str, max_connections: Option<u32>) -> AppResult<PgPool> {
    info!("Creating database connection pool");

    let max_conns = max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS);

    let pool = PgPoolOptions::new()
        .max_connections(max_conns)
        .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT))
        .idle_timeout(Some(Duration::from_secs(DEFAULT_IDLE_TIMEOUT)))
        .test_before_acquire(true)
        .connect(database_url)
        .await
        .map_err(|e| {
            warn!("Failed to create database pool: {}", e);
            AppError::Pool(format!("Failed to connect to database: {}", e))
        })?;

    // Verify the connection before handing the pool out
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| AppError::Database(format!("Database health check failed: {}", e)))?;

    info!(
        "Database pool created successfully with {} max connections",
        max_conns
    );

    Ok(pool)
}
