//! Common error types for the portal backend

use thiserror::Error;

/// Common result type for portal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the portal services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested artifact not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Caller's department is not the source of the artifact
    #[error("Not owner: {0}")]
    NotOwner(String),

    /// Sharing attempted by a department outside any cluster
    #[error("Department {0} is not part of any cluster")]
    NotInCluster(i64),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
