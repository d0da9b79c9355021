//! Memory entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Ownership scope of a memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryScope {
    Global,
    Task,
    Agent,
}

/// A unit of stored context, federated across the ephemeral, vector, and
/// durable tiers of the Memory Manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: Uuid,
    pub scope: MemoryScope,
    /// Hierarchical string, e.g. `task:<id>`.
    pub namespace: String,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub metadata: Value,
    /// If set, the ephemeral tier owns this entry.
    pub ttl_seconds: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(scope: MemoryScope, namespace: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            scope,
            namespace: namespace.into(),
            content: content.into(),
            embedding: None,
            metadata: serde_json::json!({}),
            ttl_seconds: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = Some(ttl_seconds);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// The dedup key used by `Memory Manager::read`: id, or
    /// the first 100 characters of content when comparing across tiers.
    pub fn dedup_key(&self) -> String {
        self.content.chars().take(100).collect()
    }
}

/// A single event published on an ephemeral stream (`memory:stream:<task>`).
/// Always a JSON object carrying at minimum `action` and `entry_id`;
/// consumers must tolerate additional fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    pub action: String,
    pub entry_id: Uuid,
    #[serde(flatten)]
    pub extra: Value,
}
