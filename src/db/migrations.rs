//! Database lifecycle and schema creation.

use crate::config::DatabaseConfig;
use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

use super::{Backend, Database};

impl Database {
    /// Connect to the database at `url` and make sure the schema exists
    ///
    /// SQLite URLs should carry `?mode=rwc` when the file may not exist yet.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let backend = Backend::from_url(url)?;

        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to connect to database: {}",
                    e
                )))
            })?;

        let db = Self { pool, backend };
        db.run_migrations().await?;

        tracing::debug!(backend = ?backend, "Database ready");

        Ok(db)
    }

    /// Connect using a [`DatabaseConfig`]
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::connect(&config.connection_url(), config.max_connections).await
    }

    /// Create the results table if it does not exist yet
    async fn run_migrations(&self) -> Result<()> {
        let ddl = match self.backend {
            Backend::Postgres => {
                r#"
                CREATE TABLE IF NOT EXISTS results (
                    id BIGSERIAL PRIMARY KEY,
                    text TEXT
                )
                "#
            }
            Backend::Sqlite => {
                r#"
                CREATE TABLE IF NOT EXISTS results (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    text TEXT
                )
                "#
            }
        };

        sqlx::query(ddl).execute(&self.pool).await.map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create results table: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Close the connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Backend this handle talks to
    pub fn backend(&self) -> Backend {
        self.backend
    }
}
