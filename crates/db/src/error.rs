use thiserror::Error;

/// Database-related errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    #[error("query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    #[error("migration {module}/{id} failed: {source}")]
    MigrationFailed {
        module: String,
        id: String,
        #[source]
        source: sqlx::Error,
    },
}
