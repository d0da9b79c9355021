//! Memory Manager: federates the ephemeral, vector, and durable tiers
//! behind one read/write facade, with context-window-aware compression
//! on read.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::OrchestrationResult;
use crate::domain::models::memory::{MemoryEntry, MemoryScope, StreamEvent};
use crate::domain::ports::memory_repository::{DurableMemoryStore, EphemeralStore, VectorStore};
use crate::services::context_truncation::estimate_tokens;
use crate::services::context_window::model_context_window;

/// Retrieved-document content is capped to this share of the token
/// budget during the second compression pass.
const DOC_TRUNCATION_BUDGET_DIVISOR: usize = 4;
/// Entry count is capped to `limit / this` during the final pass.
const ENTRY_COUNT_BUDGET_DIVISOR: usize = 1000;
/// Minimum entry count floor so the final pass never empties the result.
const MIN_ENTRY_COUNT: usize = 1;
/// Share of the provider's context window below which no compression runs.
const FIT_THRESHOLD: f32 = 0.9;
/// Conversation-history compression keeps at most this many recent entries.
const MAX_CONVERSATION_TURNS: usize = 5;

fn task_namespace(task_id: Uuid) -> String {
    format!("task:{task_id}")
}

fn agent_namespace(agent_id: &str) -> String {
    format!("agent:{agent_id}")
}

const GLOBAL_NAMESPACE: &str = "global";

/// Federates the three memory tiers. Holds `Arc`s so it can be shared
/// across concurrently-dispatched agents within a task.
pub struct MemoryManager {
    ephemeral: Arc<dyn EphemeralStore>,
    vector: Arc<dyn VectorStore>,
    durable: Arc<dyn DurableMemoryStore>,
}

impl MemoryManager {
    pub fn new(ephemeral: Arc<dyn EphemeralStore>, vector: Arc<dyn VectorStore>, durable: Arc<dyn DurableMemoryStore>) -> Self {
        Self { ephemeral, vector, durable }
    }

    /// Fans the entry out to the tiers it applies to. Only a durable-tier
    /// failure is reported back; ephemeral/vector writes are best-effort.
    pub async fn write(&self, entry: &MemoryEntry) -> OrchestrationResult<()> {
        if let Some(ttl) = entry.ttl_seconds {
            let key = format!("memory:{}:{}", entry.namespace, entry.id);
            let _ = self.ephemeral.set(&key, &entry.content, Some(ttl)).await;
        }
        if entry.embedding.is_some() {
            let _ = self.vector.upsert(entry).await;
        }

        let result = self.durable.save(entry).await;

        let stream = format!("memory:stream:{}", entry.namespace);
        let event = StreamEvent { action: "write".to_string(), entry_id: entry.id, extra: serde_json::json!({ "namespace": entry.namespace }) };
        let _ = self.ephemeral.append_stream(&stream, &event).await;

        result
    }

    /// Unions agent -> task -> global retrievals, deduplicates, and
    /// compresses the result to fit `provider`'s context window.
    pub async fn read(&self, task_id: Uuid, agent_id: &str, query_text: Option<&str>, provider: &str, limit: usize) -> Vec<MemoryEntry> {
        let mut entries = Vec::new();

        for (scope, namespace) in [
            (MemoryScope::Agent, agent_namespace(agent_id)),
            (MemoryScope::Task, task_namespace(task_id)),
            (MemoryScope::Global, GLOBAL_NAMESPACE.to_string()),
        ] {
            if let Ok(found) = self.durable.query(&namespace, Some(scope), limit).await {
                entries.extend(found);
            }
        }

        if let Some(query) = query_text {
            if let Ok(found) = self.vector.search(query, &task_namespace(task_id), limit).await {
                entries.extend(found);
            }
        }

        dedup_by_key(&mut entries);
        self.compress_to_fit(entries, provider, limit)
    }

    fn compress_to_fit(&self, mut entries: Vec<MemoryEntry>, provider: &str, limit: usize) -> Vec<MemoryEntry> {
        let window = model_context_window(provider);
        let budget = (window as f32 * FIT_THRESHOLD) as usize;

        if total_tokens(&entries) <= budget {
            return entries;
        }

        entries.sort_by_key(|e| e.created_at);
        if entries.len() > MAX_CONVERSATION_TURNS {
            let overflow = entries.len() - MAX_CONVERSATION_TURNS;
            entries.drain(0..overflow);
        }
        if total_tokens(&entries) <= budget {
            return entries;
        }

        let doc_char_budget = (limit / DOC_TRUNCATION_BUDGET_DIVISOR).max(1);
        for entry in &mut entries {
            if entry.content.chars().count() > doc_char_budget {
                entry.content = entry.content.chars().take(doc_char_budget).collect();
            }
        }
        if total_tokens(&entries) <= budget {
            return entries;
        }

        let entry_cap = (limit / ENTRY_COUNT_BUDGET_DIVISOR).max(MIN_ENTRY_COUNT);
        entries.truncate(entry_cap);
        entries
    }
}

fn total_tokens(entries: &[MemoryEntry]) -> usize {
    entries.iter().map(|e| estimate_tokens(&e.content)).sum()
}

/// Drops an entry if either its id or its first-100-chars content key has
/// already been seen, matching the "id-or-first-100-chars" dedup rule.
fn dedup_by_key(entries: &mut Vec<MemoryEntry>) {
    let mut seen_ids = std::collections::HashSet::new();
    let mut seen_keys = std::collections::HashSet::new();
    entries.retain(|entry| {
        let key = entry.dedup_key();
        if seen_ids.contains(&entry.id) || seen_keys.contains(&key) {
            return false;
        }
        seen_ids.insert(entry.id);
        seen_keys.insert(key);
        true
    });
}
