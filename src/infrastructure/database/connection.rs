//! Sqlite connection pool.
//!
//! Grounded on the teacher's `database/connection.rs` pool-configuration
//! idiom (WAL journal mode, bounded pool, busy timeout) without the
//! task-queue-specific schema concerns it also carried.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::domain::errors::{OrchestrationError, OrchestrationResult};

/// Owns the sqlite connection pool backing the durable task store.
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Opens (creating if missing) the database at `database_url` and
    /// configures it for concurrent access from the orchestrator's worker
    /// pool: WAL journaling, foreign keys on, a short busy timeout so
    /// writers back off instead of erroring under contention.
    pub async fn new(database_url: &str) -> OrchestrationResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| OrchestrationError::PersistenceFailed(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(10)
            .idle_timeout(Duration::from_secs(30))
            .max_lifetime(Duration::from_secs(1800))
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Runs pending migrations from the crate-embedded `./migrations`
    /// directory.
    pub async fn migrate(&self) -> OrchestrationResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| OrchestrationError::PersistenceFailed(e.to_string()))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_and_migrates_in_memory_database() {
        let conn = DatabaseConnection::new("sqlite::memory:").await.expect("open");
        conn.migrate().await.expect("migrate");
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
            .fetch_one(conn.pool())
            .await
            .expect("tasks table should exist");
        assert_eq!(row.0, 0);
        conn.close().await;
    }
}
