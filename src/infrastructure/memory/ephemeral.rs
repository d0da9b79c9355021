//! In-process ephemeral key/value and append-only stream store.
//!
//! Backs the `EphemeralStore` port. A Redis-backed adapter is a natural
//! drop-in replacement behind the same trait for multi-process deployments;
//! this implementation is sufficient for a single orchestrator process.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::errors::OrchestrationResult;
use crate::domain::models::StreamEvent;
use crate::domain::ports::memory_repository::EphemeralStore;

/// Streams are capped per-key so a long-lived task can't grow memory
/// without bound; readers only ever ask for a bounded tail anyway.
const MAX_STREAM_LEN: usize = 1000;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

#[derive(Default)]
pub struct InMemoryEphemeralStore {
    kv: RwLock<HashMap<String, Entry>>,
    streams: RwLock<HashMap<String, Vec<StreamEvent>>>,
}

impl InMemoryEphemeralStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EphemeralStore for InMemoryEphemeralStore {
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> OrchestrationResult<()> {
        let expires_at = ttl_secs.map(|secs| Instant::now() + Duration::from_secs(secs));
        let mut kv = self.kv.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        kv.insert(key.to_string(), Entry { value: value.to_string(), expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> OrchestrationResult<Option<String>> {
        let mut kv = self.kv.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        match kv.get(key) {
            Some(entry) if entry.is_expired() => {
                kv.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> OrchestrationResult<()> {
        let mut kv = self.kv.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        kv.remove(key);
        Ok(())
    }

    async fn append_stream(&self, stream: &str, event: &StreamEvent) -> OrchestrationResult<()> {
        let mut streams = self.streams.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let entries = streams.entry(stream.to_string()).or_default();
        entries.push(event.clone());
        if entries.len() > MAX_STREAM_LEN {
            let overflow = entries.len() - MAX_STREAM_LEN;
            entries.drain(0..overflow);
        }
        Ok(())
    }

    async fn read_stream(&self, stream: &str, limit: usize) -> OrchestrationResult<Vec<StreamEvent>> {
        let streams = self.streams.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(streams
            .get(stream)
            .map(|entries| entries.iter().rev().take(limit).rev().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = InMemoryEphemeralStore::new();
        store.set("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let store = InMemoryEphemeralStore::new();
        store.set("k", "v", Some(0)).await.unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let store = InMemoryEphemeralStore::new();
        store.set("k", "v", None).await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn stream_reads_return_most_recent_in_order() {
        let store = InMemoryEphemeralStore::new();
        for i in 0..5 {
            let event = StreamEvent {
                action: "write".to_string(),
                entry_id: uuid::Uuid::new_v4(),
                extra: serde_json::json!({ "seq": i }),
            };
            store.append_stream("memory:stream:task-1", &event).await.unwrap();
        }
        let tail = store.read_stream("memory:stream:task-1", 2).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].extra["seq"], 3);
        assert_eq!(tail[1].extra["seq"], 4);
    }

    #[tokio::test]
    async fn stream_is_capped_at_max_length() {
        let store = InMemoryEphemeralStore::new();
        for _ in 0..(MAX_STREAM_LEN + 10) {
            let event = StreamEvent { action: "write".to_string(), entry_id: uuid::Uuid::new_v4(), extra: serde_json::json!({}) };
            store.append_stream("s", &event).await.unwrap();
        }
        let tail = store.read_stream("s", MAX_STREAM_LEN + 10).await.unwrap();
        assert_eq!(tail.len(), MAX_STREAM_LEN);
    }
}
