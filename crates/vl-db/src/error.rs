//! Error types for vl-db

use thiserror::Error;

/// Catalog access errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Catalog query error (D002)
    #[error("[D002] Catalog query failed: {0}")]
    ExecutionError(String),

    /// Static catalog file could not be read or parsed (D003)
    #[error("[D003] Invalid catalog file {path}: {message}")]
    CatalogFile { path: String, message: String },

    /// Mutex poisoned (D004)
    #[error("[D004] Catalog mutex poisoned: {0}")]
    MutexPoisoned(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}
