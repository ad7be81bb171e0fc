//! Store error types.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// A missing key is not an error; `get` reports it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Logical key is empty or already carries the namespace prefix.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// Value is empty.
    #[error("empty value for key {0:?}")]
    InvalidValue(String),

    /// More than one row stored under a single key.
    #[error("{count} rows stored under key {key:?}")]
    DuplicateKey { key: String, count: usize },

    /// Backing database failure (connectivity, statement).
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
