//! Task and SubTask models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use super::debate::DebateState;
use super::validation::ValidationResult;

/// Maximum number of times a subtask may be dispatched for rework.
pub const MAX_REWORK_ATTEMPTS: u32 = 2;

/// Lifecycle status of a [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Validating,
    Debating,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Whether this status is one of the three terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Lifecycle status of a [`SubTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// One agent's unit of work within a [`Task`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    pub id: Uuid,
    pub parent_task_id: Uuid,
    /// The specific instruction handed to one agent.
    pub description: String,
    pub agent_id: String,
    /// Role label; may be a dynamic role name beyond the standard five.
    pub agent_type: String,
    pub status: SubTaskStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub rework_count: u32,
}

impl SubTask {
    pub fn new(parent_task_id: Uuid, agent_id: impl Into<String>, agent_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_task_id,
            description: description.into(),
            agent_id: agent_id.into(),
            agent_type: agent_type.into(),
            status: SubTaskStatus::Pending,
            result: None,
            error: None,
            rework_count: 0,
        }
    }

    /// Record a rework dispatch. Callers are responsible for never exceeding
    /// [`MAX_REWORK_ATTEMPTS`]; this only increments the counter.
    pub fn record_rework(&mut self) {
        self.rework_count = (self.rework_count + 1).min(MAX_REWORK_ATTEMPTS);
    }
}

/// The top-level unit of work submitted to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub description: String,
    pub status: TaskStatus,
    /// Provider hint, may be `"auto"`.
    pub provider: String,
    pub context: HashMap<String, Value>,
    /// At minimum carries `content`, `agents`, `agent_outputs` once populated.
    pub result: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub tokens_used: u64,
    pub agents_count: u32,
    pub progress: f32,
    pub debate_state: Option<DebateState>,
    pub subtasks: Vec<SubTask>,
    pub validation_results: Option<ValidationResult>,
}

impl Task {
    /// Create a new task in `pending` status.
    pub fn new(description: impl Into<String>, provider: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            status: TaskStatus::Pending,
            provider: provider.into(),
            context: HashMap::new(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            tokens_used: 0,
            agents_count: 0,
            progress: 0.0,
            debate_state: None,
            subtasks: Vec::new(),
            validation_results: None,
        }
    }

    /// Transition to a new status, maintaining the invariants
    /// `progress = 1.0 <=> status = completed` and `completed_at` set iff
    /// terminal.
    pub fn transition(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = Utc::now();
        if status.is_terminal() {
            self.completed_at = Some(self.updated_at);
        }
        self.progress = if status == TaskStatus::Completed { 1.0 } else { self.progress };
    }

    /// Mark the task failed with the given error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.transition(TaskStatus::Failed);
    }

    /// Mark the task cancelled.
    pub fn cancel(&mut self) {
        self.transition(TaskStatus::Cancelled);
    }
}
