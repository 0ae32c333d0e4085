//! Result record persistence.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Backend, Database, ResultRecord};

impl Database {
    /// Insert a new result row and return its id
    pub async fn insert_result(&self, text: &str) -> Result<i64> {
        let sql = match self.backend {
            Backend::Postgres => "INSERT INTO results (text) VALUES ($1) RETURNING id",
            Backend::Sqlite => "INSERT INTO results (text) VALUES (?) RETURNING id",
        };

        let id: i64 = sqlx::query_scalar(sql)
            .bind(text)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert result: {}",
                    e
                )))
            })?;

        Ok(id)
    }

    /// Number of rows in the results table
    pub async fn count_results(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM results")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count results: {}",
                    e
                )))
            })?;

        Ok(count)
    }

    /// All result rows, ordered by id
    pub async fn list_results(&self) -> Result<Vec<ResultRecord>> {
        let rows = sqlx::query_as::<_, ResultRecord>("SELECT id, text FROM results ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to list results: {}",
                    e
                )))
            })?;

        Ok(rows)
    }
}
