//! Debate engine models.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Default maximum number of debate rounds.
pub const DEFAULT_MAX_ROUNDS: u32 = 5;
/// Default weighted-score convergence supermajority threshold.
pub const DEFAULT_CONVERGENCE_THRESHOLD: f32 = 0.8;
/// Default score-margin convergence threshold.
pub const DEFAULT_SCORE_MARGIN_THRESHOLD: f32 = 0.3;

/// Debate state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    Proposal,
    Critique,
    Rebuttal,
    Voting,
    Judgment,
    Converged,
}

/// One agent's proposal in a given round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub round: u32,
    pub agent_id: String,
    pub content: String,
    pub confidence: f32,
    pub evidence: Vec<String>,
}

/// One agent's critique of another agent's proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Critique {
    pub round: u32,
    pub critic_agent_id: String,
    pub target_proposal_id: Uuid,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub score: f32,
}

/// A rebuttal offered in response to a critique; may be empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rebuttal {
    pub round: u32,
    pub agent_id: String,
    pub target_critique_round: u32,
    pub content: String,
}

/// Round-based debate state machine over a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateState {
    pub task_id: Uuid,
    pub topic: String,
    pub round: u32,
    pub max_rounds: u32,
    pub phase: DebatePhase,
    pub proposals: Vec<Proposal>,
    pub critiques: Vec<Critique>,
    pub rebuttals: Vec<Rebuttal>,
    pub votes: HashMap<String, Uuid>,
    pub scores: HashMap<Uuid, f32>,
    pub winner: Option<Uuid>,
    pub converged: bool,
}

impl DebateState {
    pub fn new(task_id: Uuid, topic: impl Into<String>, max_rounds: u32) -> Self {
        Self {
            task_id,
            topic: topic.into(),
            round: 1,
            max_rounds,
            phase: DebatePhase::Proposal,
            proposals: Vec::new(),
            critiques: Vec::new(),
            rebuttals: Vec::new(),
            votes: HashMap::new(),
            scores: HashMap::new(),
            winner: None,
            converged: false,
        }
    }

    /// Proposals submitted in the current round.
    pub fn current_round_proposals(&self) -> Vec<&Proposal> {
        self.proposals.iter().filter(|p| p.round == self.round).collect()
    }
}

/// Weights for the weighted multi-criterion voting formula.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub votes: f32,
    pub critique: f32,
    pub confidence: f32,
    pub evidence: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            votes: 0.35,
            critique: 0.35,
            confidence: 0.15,
            evidence: 0.15,
        }
    }
}
