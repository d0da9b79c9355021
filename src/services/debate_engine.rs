//! Debate Engine: propose -> critique -> rebut -> vote -> score -> converge
//! round-based state machine over a roster of agents.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use uuid::Uuid;

use crate::domain::models::debate::{Critique, DebatePhase, DebateState, Proposal, ScoringWeights, DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_SCORE_MARGIN_THRESHOLD};
use crate::services::agent_runtime::Agent;

/// Drives a [`DebateState`] to convergence over a fixed roster of agents.
pub struct DebateEngine<'a> {
    agents: &'a [Arc<Agent>],
    weights: ScoringWeights,
}

impl<'a> DebateEngine<'a> {
    pub fn new(agents: &'a [Arc<Agent>]) -> Self {
        Self { agents, weights: ScoringWeights::default() }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Runs rounds until convergence, mutating and returning the final
    /// [`DebateState`].
    pub async fn run(&self, task_id: Uuid, topic: &str, max_rounds: u32) -> DebateState {
        let mut state = DebateState::new(task_id, topic, max_rounds);

        loop {
            self.run_proposals(&mut state).await;
            self.run_critiques(&mut state).await;
            self.run_votes(&mut state).await;
            self.score_round(&mut state);

            if self.has_converged(&state) {
                state.phase = DebatePhase::Converged;
                state.converged = true;
                state.winner = state.scores.iter().max_by(|a, b| a.1.total_cmp(b.1)).map(|(id, _)| *id);
                break;
            }

            state.round += 1;
            state.phase = DebatePhase::Proposal;
        }

        state
    }

    async fn run_proposals(&self, state: &mut DebateState) {
        state.phase = DebatePhase::Proposal;
        let round = state.round;
        let topic = state.topic.clone();

        let futures = self.agents.iter().map(|agent| {
            let previous: Option<Proposal> = state.proposals.iter().rev().find(|p| p.agent_id == agent.agent_id && p.round == round - 1).cloned();
            let own_proposal_ids: Vec<Uuid> = state.proposals.iter().filter(|p| p.agent_id == agent.agent_id).map(|p| p.id).collect();
            let own_critiques: Vec<Critique> = state.critiques.iter().filter(|c| own_proposal_ids.contains(&c.target_proposal_id)).cloned().collect();
            let topic = topic.clone();
            async move {
                let refs: Vec<&Critique> = own_critiques.iter().collect();
                agent.generate_proposal(&topic, round, previous.as_ref(), &refs).await
            }
        });

        state.proposals.extend(join_all(futures).await);
    }

    async fn run_critiques(&self, state: &mut DebateState) {
        state.phase = DebatePhase::Critique;
        let round = state.round;
        let current = state.current_round_proposals().into_iter().cloned().collect::<Vec<_>>();

        let mut futures = Vec::new();
        for agent in self.agents {
            for proposal in &current {
                if proposal.agent_id == agent.agent_id {
                    continue;
                }
                let proposal = proposal.clone();
                futures.push(async move { agent.critique_proposal(&proposal, round).await });
            }
        }

        state.critiques.extend(join_all(futures).await);
        state.phase = DebatePhase::Rebuttal;
    }

    async fn run_votes(&self, state: &mut DebateState) {
        state.phase = DebatePhase::Voting;
        let current = state.current_round_proposals().into_iter().cloned().collect::<Vec<_>>();

        let futures = self.agents.iter().map(|agent| {
            let current = current.clone();
            async move { (agent.agent_id.clone(), agent.vote(&current).await) }
        });

        for (agent_id, vote) in join_all(futures).await {
            if let Some(proposal_id) = vote {
                state.votes.insert(agent_id, proposal_id);
            }
        }
    }

    fn score_round(&self, state: &mut DebateState) {
        state.phase = DebatePhase::Judgment;
        let round = state.round;
        let total_votes = state.votes.len().max(1) as f32;
        let current = state.current_round_proposals().into_iter().cloned().collect::<Vec<_>>();

        for proposal in &current {
            let votes = state.votes.values().filter(|&&v| v == proposal.id).count() as f32;
            let critiques_for: Vec<&_> = state.critiques.iter().filter(|c| c.target_proposal_id == proposal.id && c.round == round).collect();
            let avg_critique = if critiques_for.is_empty() { 5.0 } else { critiques_for.iter().map(|c| c.score).sum::<f32>() / critiques_for.len() as f32 };
            let evidence_component = (proposal.evidence.len() as f32 / 5.0).min(1.0);

            let score = self.weights.votes * (votes / total_votes)
                + self.weights.critique * (avg_critique / 10.0)
                + self.weights.confidence * proposal.confidence
                + self.weights.evidence * evidence_component;

            state.scores.insert(proposal.id, score.clamp(0.0, 1.0));
        }
    }

    fn has_converged(&self, state: &DebateState) -> bool {
        if state.round >= state.max_rounds {
            return true;
        }

        let total_votes = state.votes.len().max(1) as f32;
        let vote_counts: HashMap<Uuid, usize> = state.votes.values().fold(HashMap::new(), |mut acc, id| {
            *acc.entry(*id).or_insert(0) += 1;
            acc
        });
        if vote_counts.values().any(|&count| count as f32 / total_votes >= DEFAULT_CONVERGENCE_THRESHOLD) {
            return true;
        }

        let mut scores: Vec<f32> = state.scores.values().copied().collect();
        scores.sort_by(|a, b| b.total_cmp(a));
        if scores.len() >= 2 && (scores[0] - scores[1]) > DEFAULT_SCORE_MARGIN_THRESHOLD {
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::agent::AgentRuntimeKind;
    use crate::domain::ports::llm_provider::LlmProvider;
    use crate::infrastructure::providers::MockLlmProvider;
    use crate::services::circuit_breaker::CircuitBreakerService;
    use crate::services::llm_router::LlmRouter;
    use crate::services::tool_registry::ToolRegistry;
    use std::collections::HashMap as Map;
    use std::sync::Arc;

    fn agent(id: &str, mock: MockLlmProvider) -> Arc<Agent> {
        let mut providers: Map<String, Arc<dyn LlmProvider>> = Map::new();
        providers.insert("openai".to_string(), Arc::new(mock));
        let router = Arc::new(LlmRouter::new(crate::domain::models::config::ProvidersConfig::default(), Arc::new(CircuitBreakerService::default()), providers));
        Arc::new(Agent::new(id, "debater", AgentRuntimeKind::Analysis, "openai", router, Arc::new(ToolRegistry::new())))
    }

    #[tokio::test]
    async fn converges_within_max_rounds_and_picks_a_winner() {
        let agents = vec![
            agent("a", MockLlmProvider::new("openai").with_response("proposal A").with_response(r#"{"strengths":["clear"],"weaknesses":[],"score":9}"#).with_response(r#"{"vote":"placeholder"}"#)),
            agent("b", MockLlmProvider::new("openai").with_response("proposal B").with_response(r#"{"strengths":[],"weaknesses":["vague"],"score":4}"#).with_response(r#"{"vote":"placeholder"}"#)),
        ];
        let engine = DebateEngine::new(&agents);
        let state = engine.run(Uuid::new_v4(), "should we ship feature X", 5).await;

        assert!(state.converged);
        assert!(state.winner.is_some());
        assert!(state.round <= 5);
    }

    #[tokio::test]
    async fn never_exceeds_max_rounds() {
        let agents = vec![
            agent("a", MockLlmProvider::new("openai").with_response("A1").with_response("A2").with_response("A3").with_response(r#"{"strengths":[],"weaknesses":[],"score":5}"#).with_response(r#"{"strengths":[],"weaknesses":[],"score":5}"#).with_response(r#"{"strengths":[],"weaknesses":[],"score":5}"#).with_response(r#"{"vote":"x"}"#).with_response(r#"{"vote":"x"}"#).with_response(r#"{"vote":"x"}"#)),
            agent("b", MockLlmProvider::new("openai").with_response("B1").with_response("B2").with_response("B3").with_response(r#"{"strengths":[],"weaknesses":[],"score":5}"#).with_response(r#"{"strengths":[],"weaknesses":[],"score":5}"#).with_response(r#"{"strengths":[],"weaknesses":[],"score":5}"#).with_response(r#"{"vote":"x"}"#).with_response(r#"{"vote":"x"}"#).with_response(r#"{"vote":"x"}"#)),
        ];
        let engine = DebateEngine::new(&agents);
        let state = engine.run(Uuid::new_v4(), "topic", 3).await;

        assert_eq!(state.round, 3);
        assert!(state.converged);
    }
}
