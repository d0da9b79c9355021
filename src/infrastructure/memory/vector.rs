//! In-memory cosine-similarity vector store.
//!
//! Vector-store *driver* code (a real embedded-database or hosted vector
//! service client) is out of scope; this is the reference implementation
//! of the `upsert`/`search` operations the `VectorStore` port specifies.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::errors::OrchestrationResult;
use crate::domain::models::MemoryEntry;
use crate::domain::ports::memory_repository::VectorStore;

use super::embedder::{cosine_similarity, Embedder, HashEmbedder};

/// Entries are bucketed by `scope_key` (the caller-supplied namespace) so a
/// search never ranks across unrelated tasks.
pub struct InMemoryVectorStore<E: Embedder = HashEmbedder> {
    embedder: E,
    entries: RwLock<HashMap<String, Vec<MemoryEntry>>>,
}

impl<E: Embedder> InMemoryVectorStore<E> {
    pub fn new(embedder: E) -> Self {
        Self { embedder, entries: RwLock::new(HashMap::new()) }
    }
}

impl Default for InMemoryVectorStore<HashEmbedder> {
    fn default() -> Self {
        Self::new(HashEmbedder)
    }
}

#[async_trait]
impl<E: Embedder> VectorStore for InMemoryVectorStore<E> {
    async fn upsert(&self, entry: &MemoryEntry) -> OrchestrationResult<()> {
        let mut entry = entry.clone();
        if entry.embedding.is_none() {
            entry.embedding = Some(self.embedder.embed(&entry.content));
        }
        let mut entries = self.entries.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let bucket = entries.entry(entry.namespace.clone()).or_default();
        if let Some(existing) = bucket.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry;
        } else {
            bucket.push(entry);
        }
        Ok(())
    }

    async fn search(&self, query: &str, scope_key: &str, limit: usize) -> OrchestrationResult<Vec<MemoryEntry>> {
        let query_embedding = self.embedder.embed(query);
        let entries = self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(bucket) = entries.get(scope_key) else { return Ok(Vec::new()) };

        let mut scored: Vec<(f32, MemoryEntry)> = bucket
            .iter()
            .filter_map(|entry| {
                let embedding = entry.embedding.as_ref()?;
                Some((cosine_similarity(&query_embedding, embedding), entry.clone()))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, entry)| entry).collect())
    }
}
