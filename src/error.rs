//! Error types for batch-fetch
//!
//! A single crate-wide [`Error`] covers configuration, network, storage and
//! coordination failures. Per-task errors are classified with
//! [`Error::failure_kind`] so the coordinator can record them in its reports.

use crate::types::FailureKind;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for batch-fetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for batch-fetch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "POSTGRES_DB")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// HTTP request or response body failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A URL entry could not be parsed
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl {
        /// The offending entry text
        url: String,
        /// Parser message
        reason: String,
    },

    /// The transformation step failed
    #[error("transform error: {0}")]
    Transform(String),

    /// A task exceeded the configured per-task timeout
    #[error("task timed out after {timeout:?}")]
    Timeout {
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// The run was cancelled while the task was in flight
    #[error("task cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Classify this error for task outcome reporting
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::Network(_) => FailureKind::Network,
            Error::InvalidUrl { .. } => FailureKind::InvalidUrl,
            Error::Database(_) | Error::Sqlx(_) => FailureKind::Storage,
            Error::Transform(_) => FailureKind::Transform,
            Error::Timeout { .. } => FailureKind::Timeout,
            Error::Cancelled => FailureKind::Cancelled,
            Error::Config { .. } | Error::Io(_) => FailureKind::Other,
        }
    }
}
