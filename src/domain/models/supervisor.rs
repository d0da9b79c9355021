//! Supervisor critique models.

use serde::{Deserialize, Serialize};

/// Default score threshold below which a REWORK decision is emitted.
pub const DEFAULT_REWORK_THRESHOLD: f32 = 7.0;

/// Supervisor decision for an agent's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Accept,
    Rework,
    Reject,
}

/// Structured rework guidance attached to a REWORK/REJECT decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReworkInstructions {
    pub reason: String,
    pub focus_areas: Vec<String>,
}

/// The supervisor's evaluation of one agent's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorCritique {
    pub agent_id: String,
    pub agent_type: String,
    /// Score in `[0, 10]`.
    pub score: f32,
    pub decision: Decision,
    pub rework_required: bool,
    pub rework_instructions: Option<ReworkInstructions>,
    pub evaluation: serde_json::Value,
}
