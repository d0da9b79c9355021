//! Delegation planning models.

use serde::{Deserialize, Serialize};

/// Minimum number of planned agents unless the strategy is `single`.
pub const MIN_AGENTS: usize = 4;
/// Maximum number of planned agents.
pub const MAX_AGENTS: usize = 15;

/// The standard five role labels used to pad a plan to [`MIN_AGENTS`].
pub const STANDARD_ROLES: [&str; 5] = ["researcher", "analyst", "coder", "reviewer", "synthesizer"];

/// Capability drives which executing class is selected for an agent;
/// the role label (see [`AgentPlan::agent_type`]) may be an arbitrary
/// dynamic string independent of this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Research,
    Analysis,
    Coding,
    Review,
}

impl Capability {
    /// Infer a capability from a standard role label, falling back to
    /// `Analysis` for unrecognized / dynamic roles.
    pub fn from_role_label(role: &str) -> Self {
        match role.to_lowercase().as_str() {
            "researcher" => Self::Research,
            "coder" => Self::Coding,
            "reviewer" => Self::Review,
            _ => Self::Analysis,
        }
    }
}

/// How the orchestrator should dispatch the planned agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    Single,
    Parallel,
    Sequential,
    Debate,
}

/// A single planned agent slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPlan {
    /// Role label, possibly a dynamic (non-standard) name.
    pub agent_type: String,
    pub agent_name: String,
    pub description: String,
    pub subtask_description: String,
    pub provider: String,
    pub priority: u32,
    pub capability: Capability,
}

/// The output of the Delegator: a roster, per-agent subtasks, and an
/// execution strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationPlan {
    pub execution_strategy: ExecutionStrategy,
    pub agents: Vec<AgentPlan>,
    pub requires_debate: bool,
    pub complexity_score: f32,
    pub task_interpretation: String,
    pub main_tasks_identified: Vec<String>,
    pub research_approach: String,
    pub reasoning: String,
}

impl DelegationPlan {
    /// Choose the execution strategy step 5: `single` for
    /// one agent, `debate` if analysis requested it, else `sequential`.
    /// Complexity alone never implies `debate`.
    pub fn choose_strategy(agent_count: usize, requires_debate: bool) -> ExecutionStrategy {
        if agent_count <= 1 {
            ExecutionStrategy::Single
        } else if requires_debate {
            ExecutionStrategy::Debate
        } else {
            ExecutionStrategy::Sequential
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_inference_falls_back_to_analysis() {
        assert_eq!(Capability::from_role_label("researcher"), Capability::Research);
        assert_eq!(Capability::from_role_label("quantum-archivist"), Capability::Analysis);
    }

    #[test]
    fn strategy_single_agent() {
        assert_eq!(DelegationPlan::choose_strategy(1, false), ExecutionStrategy::Single);
    }

    #[test]
    fn strategy_debate_requires_explicit_flag() {
        assert_eq!(DelegationPlan::choose_strategy(5, true), ExecutionStrategy::Debate);
        assert_eq!(DelegationPlan::choose_strategy(5, false), ExecutionStrategy::Sequential);
    }
}
