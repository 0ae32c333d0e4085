//! Database layer for batch-fetch
//!
//! Persists transformed payloads as rows of the `results` table. The backend
//! (PostgreSQL or SQLite) is chosen from the connection URL and accessed
//! through sqlx's `Any` driver, so one [`Database`] type serves both.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - `migrations`: connection lifecycle, schema creation
//! - `results`: inserting and reading result records

use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::{AnyPool, FromRow};

mod migrations;
mod results;

/// SQL dialect behind a connection URL
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// `postgres://` or `postgresql://`
    Postgres,
    /// `sqlite:`
    Sqlite,
}

impl Backend {
    /// Detect the backend from a sqlx connection URL
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "sqlite" => Ok(Backend::Sqlite),
            _ => Err(Error::Config {
                message: format!("unsupported database URL scheme {scheme:?}"),
                key: Some("DATABASE_URL".to_string()),
            }),
        }
    }
}

/// Result record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ResultRecord {
    /// Identifier assigned by the database
    pub id: i64,
    /// Persisted payload
    pub text: String,
}

/// Sink that records one payload as a new result row.
///
/// Every call creates a new record; identical payloads are not deduplicated.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persist `payload`, returning the new record's identifier
    async fn store(&self, payload: &str) -> Result<i64>;
}

/// Database handle for batch-fetch
pub struct Database {
    pool: AnyPool,
    backend: Backend,
}

#[async_trait]
impl ResultStore for Database {
    async fn store(&self, payload: &str) -> Result<i64> {
        self.insert_result(payload).await
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
