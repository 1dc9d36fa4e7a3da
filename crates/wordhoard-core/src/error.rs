//! Error types for wordhoard-core

use thiserror::Error;

/// Result type alias using wordhoard-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in local wordhoard-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Word (or other entity) not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid sync configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}
