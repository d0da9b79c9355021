//! Agent runtime models.
//!
//! Dynamic role polymorphism: a free-form role label drives prompt text
//! while a `capability`-selected executing class (`AgentRuntimeKind`)
//! drives behavior.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::delegation::Capability;

/// The executing class selected by capability. `Synthesis` is not a
/// planner capability (see [`Capability`]) but is assignable to the
/// agent invoked by the orchestrator's synthesize step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRuntimeKind {
    Research,
    Analysis,
    Coding,
    Review,
    Synthesis,
}

impl From<Capability> for AgentRuntimeKind {
    fn from(capability: Capability) -> Self {
        match capability {
            Capability::Research => Self::Research,
            Capability::Analysis => Self::Analysis,
            Capability::Coding => Self::Coding,
            Capability::Review => Self::Review,
        }
    }
}

/// Runtime status of an agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Processing,
    Error,
}

/// The outcome of one agent's `process` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_id: String,
    pub task_id: Uuid,
    pub content: String,
    pub confidence: f32,
    pub evidence: Vec<String>,
    pub metadata: serde_json::Value,
    pub tokens_used: u64,
    pub error: Option<String>,
}

impl AgentResult {
    pub fn success(agent_id: impl Into<String>, task_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            task_id,
            content: content.into(),
            confidence: 0.8,
            evidence: Vec::new(),
            metadata: serde_json::json!({}),
            tokens_used: 0,
            error: None,
        }
    }

    pub fn failure(agent_id: impl Into<String>, task_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            task_id,
            content: String::new(),
            confidence: 0.0,
            evidence: Vec::new(),
            metadata: serde_json::json!({}),
            tokens_used: 0,
            error: Some(error.into()),
        }
    }
}

/// Additional context carried alongside a subtask dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskContextExtension {
    pub original_task: Option<String>,
    pub agent_position: Option<usize>,
    pub previous_attempt: Option<String>,
    pub supervisor_feedback: Option<String>,
    pub supervisor_score: Option<f32>,
    pub supervisor_decision: Option<String>,
    pub rework_instruction: Option<String>,
}
