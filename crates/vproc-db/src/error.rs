//! Database error types.

use thiserror::Error;

/// Result type for job store operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur while reading or writing job records.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Invalid stored value: {0}")]
    Decode(String),
}

impl DbError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}
