//! Sqlite-backed [`DurableMemoryStore`].
//!
//! Shares the `memory_entries` table and pool with
//! `infrastructure::database::task_repository`; row-mapping follows the
//! same idiom.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{OrchestrationError, OrchestrationResult};
use crate::domain::models::{MemoryEntry, MemoryScope};
use crate::domain::ports::memory_repository::DurableMemoryStore;

fn scope_str(scope: MemoryScope) -> &'static str {
    match scope {
        MemoryScope::Global => "global",
        MemoryScope::Task => "task",
        MemoryScope::Agent => "agent",
    }
}

fn parse_scope(s: &str) -> OrchestrationResult<MemoryScope> {
    Ok(match s {
        "global" => MemoryScope::Global,
        "task" => MemoryScope::Task,
        "agent" => MemoryScope::Agent,
        other => return Err(OrchestrationError::PersistenceFailed(format!("unknown memory scope {other}"))),
    })
}

fn row_to_entry(row: &SqliteRow) -> OrchestrationResult<MemoryEntry> {
    let id: String = row.try_get("id")?;
    let scope: String = row.try_get("scope")?;
    let metadata: String = row.try_get("metadata")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(MemoryEntry {
        id: Uuid::parse_str(&id).map_err(|e| OrchestrationError::PersistenceFailed(e.to_string()))?,
        scope: parse_scope(&scope)?,
        namespace: row.try_get("namespace")?,
        content: row.try_get("content")?,
        embedding: None,
        metadata: serde_json::from_str(&metadata)?,
        ttl_seconds: None,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| OrchestrationError::PersistenceFailed(e.to_string()))?,
    })
}

pub struct MemoryRepositoryImpl {
    pool: SqlitePool,
}

impl MemoryRepositoryImpl {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DurableMemoryStore for MemoryRepositoryImpl {
    async fn save(&self, entry: &MemoryEntry) -> OrchestrationResult<()> {
        let metadata = serde_json::to_string(&entry.metadata)?;
        sqlx::query(
            "INSERT INTO memory_entries (id, scope, namespace, content, metadata, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (id) DO UPDATE SET scope = excluded.scope, namespace = excluded.namespace, \
             content = excluded.content, metadata = excluded.metadata",
        )
        .bind(entry.id.to_string())
        .bind(scope_str(entry.scope))
        .bind(&entry.namespace)
        .bind(&entry.content)
        .bind(metadata)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query(&self, namespace: &str, scope: Option<MemoryScope>, limit: usize) -> OrchestrationResult<Vec<MemoryEntry>> {
        let rows = match scope {
            Some(scope) => {
                sqlx::query("SELECT * FROM memory_entries WHERE namespace = ? AND scope = ? ORDER BY created_at DESC LIMIT ?")
                    .bind(namespace)
                    .bind(scope_str(scope))
                    .bind(limit as i64)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM memory_entries WHERE namespace = ? ORDER BY created_at DESC LIMIT ?")
                    .bind(namespace)
                    .bind(limit as i64)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(row_to_entry).collect()
    }
}
