//! Error types for the match store

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database driver errors (connection, query execution, decoding)
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// A referenced row does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A record failed a structural integrity check before being written
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl StoreError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new invalid record error
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }
}
