//! Database connection pool management.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use reservation_kernel::settings::DatabaseSettings;

use crate::error::DbError;

/// Type alias for the SQLite connection pool.
pub type DbPool = SqlitePool;

/// Create a new database connection pool.
///
/// In-memory databases live as long as their connection, so they are
/// pinned to a single connection that is never recycled.
pub async fn create_pool(settings: &DatabaseSettings) -> Result<DbPool, DbError> {
    tracing::info!(url = %settings.url, "creating database pool");

    let options = SqliteConnectOptions::from_str(&settings.url)
        .map_err(DbError::ConnectionFailed)?
        .create_if_missing(true);

    let in_memory = settings.url.contains(":memory:") || settings.url.contains("mode=memory");
    let mut pool_options = SqlitePoolOptions::new()
        .acquire_timeout(Duration::from_secs(settings.connect_timeout_secs));

    pool_options = if in_memory {
        pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool_options.max_connections(settings.max_connections.max(1))
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to create database pool");
            DbError::ConnectionFailed(e)
        })?;

    tracing::info!(in_memory, "database pool created");
    Ok(pool)
}

/// Check if the database connection is healthy.
pub async fn health_check(pool: &DbPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_pool_is_healthy() {
        let pool = create_pool(&DatabaseSettings::default()).await.unwrap();
        health_check(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn missing_directory_fails_to_connect() {
        let settings = DatabaseSettings {
            url: "sqlite:///definitely/missing/dir/reservations.db".to_string(),
            ..DatabaseSettings::default()
        };
        assert!(matches!(
            create_pool(&settings).await,
            Err(DbError::ConnectionFailed(_))
        ));
    }
}
