//! Query expansion models.

use serde::{Deserialize, Serialize};

/// Complexity threshold separating `direct` from `decompose` execution.
pub const COMPLEXITY_THRESHOLD: f32 = 0.4;
/// Complexity above which `requires_debate` is set.
pub const DEBATE_COMPLEXITY_THRESHOLD: f32 = 0.7;

/// How the expanded query should be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Direct,
    Decompose,
}

/// The output of `QueryExpander::expand`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryExpansion {
    pub original_query: String,
    pub complexity_score: f32,
    pub execution_mode: ExecutionMode,
    pub expanded_queries: Vec<String>,
    pub clarifying_questions: Vec<String>,
    pub intent_hypotheses: Vec<String>,
    pub requires_debate: bool,
    pub suggested_agent_roles: Vec<String>,
}

impl QueryExpansion {
    /// The trivial `direct` expansion: mode `direct`, a single expanded
    /// query equal to the input, no debate.
    pub fn direct(query: impl Into<String>, complexity_score: f32) -> Self {
        let query = query.into();
        Self {
            expanded_queries: vec![query.clone()],
            original_query: query,
            complexity_score,
            execution_mode: ExecutionMode::Direct,
            clarifying_questions: Vec::new(),
            intent_hypotheses: Vec::new(),
            requires_debate: false,
            suggested_agent_roles: Vec::new(),
        }
    }
}
