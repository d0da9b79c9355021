//! Memory tier ports: ephemeral key/value + stream, semantic
//! vector search, and the durable store reuses [`super::task_repository`].

use async_trait::async_trait;

use crate::domain::errors::OrchestrationResult;
use crate::domain::models::{MemoryEntry, MemoryScope, StreamEvent};

/// Short-lived, TTL-bearing key/value and append-only stream storage.
/// Backed by an in-process store in `infrastructure::memory::ephemeral`;
/// a Redis-backed adapter is a natural drop-in behind this same port.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> OrchestrationResult<()>;
    async fn get(&self, key: &str) -> OrchestrationResult<Option<String>>;
    async fn delete(&self, key: &str) -> OrchestrationResult<()>;

    async fn append_stream(&self, stream: &str, event: &StreamEvent) -> OrchestrationResult<()>;
    async fn read_stream(&self, stream: &str, limit: usize) -> OrchestrationResult<Vec<StreamEvent>>;
}

/// Semantic search over embedded memory entries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, entry: &MemoryEntry) -> OrchestrationResult<()>;
    async fn search(&self, query: &str, scope_key: &str, limit: usize) -> OrchestrationResult<Vec<MemoryEntry>>;
}

/// Authoritative store for memory entries that are neither TTL-bound nor
/// carry an embedding. Backed by the `memory_entries` table in
/// `infrastructure::database`; task/subtask persistence is a separate
/// concern, covered by [`super::task_repository::TaskRepository`].
#[async_trait]
pub trait DurableMemoryStore: Send + Sync {
    async fn save(&self, entry: &MemoryEntry) -> OrchestrationResult<()>;
    async fn query(&self, namespace: &str, scope: Option<MemoryScope>, limit: usize) -> OrchestrationResult<Vec<MemoryEntry>>;
}
