//! Agent Runtime: the polymorphic worker that turns a subtask into an
//! [`AgentResult`], plus the debate operations (`generate_proposal`,
//! `critique_proposal`, `vote`).
//!
//! Dynamic role polymorphism: `role_label` drives prompt text while
//! `capability` drives which prompt-assembly branch runs (only research
//! capability triggers the autonomous web-search snippet).

use std::sync::{Arc, RwLock};

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::models::agent::{AgentResult, AgentRuntimeKind, AgentStatus, TaskContextExtension};
use crate::domain::models::debate::{Critique, Proposal};
use crate::domain::ports::llm_provider::{CompletionRequest, Message};
use crate::services::extract_json_from_response;
use crate::services::llm_router::LlmRouter;
use crate::services::tool_registry::ToolRegistry;

/// How much of a rework's previous attempt is quoted back into the prompt.
const PREVIOUS_ATTEMPT_CLIP_CHARS: usize = 1500;
/// How much of the original task is used to seed an autonomous web search.
const WEB_SEARCH_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Deserialize, Default)]
struct CritiqueJson {
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default = "default_critique_score")]
    score: f32,
}

fn default_critique_score() -> f32 {
    5.0
}

#[derive(Debug, Deserialize)]
struct VoteJson {
    vote: String,
}

/// One role-typed worker. Holds non-owning references to the router and
/// tool registry; owns its own runtime status and load.
pub struct Agent {
    pub agent_id: String,
    pub role_label: String,
    pub capability: AgentRuntimeKind,
    pub provider: String,
    router: Arc<LlmRouter>,
    tools: Arc<ToolRegistry>,
    status: RwLock<AgentStatus>,
    current_load: RwLock<f32>,
}

impl Agent {
    pub fn new(
        agent_id: impl Into<String>,
        role_label: impl Into<String>,
        capability: AgentRuntimeKind,
        provider: impl Into<String>,
        router: Arc<LlmRouter>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            role_label: role_label.into(),
            capability,
            provider: provider.into(),
            router,
            tools,
            status: RwLock::new(AgentStatus::Idle),
            current_load: RwLock::new(0.0),
        }
    }

    pub fn status(&self) -> AgentStatus {
        *self.status.read().expect("agent status lock poisoned")
    }

    pub fn current_load(&self) -> f32 {
        *self.current_load.read().expect("agent load lock poisoned")
    }

    fn role_system_prompt(&self) -> String {
        format!("You are acting as the {} agent ({:?} capability) on a multi-agent team.", self.role_label, self.capability)
    }

    fn enter_processing(&self) {
        *self.status.write().expect("agent status lock poisoned") = AgentStatus::Processing;
        *self.current_load.write().expect("agent load lock poisoned") = 1.0;
    }

    fn leave_processing(&self, failed: bool) {
        *self.status.write().expect("agent status lock poisoned") = if failed { AgentStatus::Error } else { AgentStatus::Idle };
        *self.current_load.write().expect("agent load lock poisoned") = 0.0;
    }

    /// Processes one subtask, producing an [`AgentResult`]. `extension`
    /// carries the team position and, on a rework dispatch, the
    /// supervisor's feedback on a previous attempt.
    pub async fn process(&self, task_id: Uuid, original_task: &str, subtask_description: &str, extension: &TaskContextExtension) -> AgentResult {
        self.enter_processing();

        let web_snippet = if self.capability == AgentRuntimeKind::Research {
            self.gather_web_snippet(original_task).await
        } else {
            None
        };

        let prompt = self.build_prompt(original_task, subtask_description, web_snippet.as_deref(), extension);
        let request = CompletionRequest::new(&self.provider, vec![Message::system(self.role_system_prompt()), Message::user(prompt)]);

        let result = match self.router.completion(request).await {
            Ok(response) => {
                self.leave_processing(false);
                AgentResult {
                    agent_id: self.agent_id.clone(),
                    task_id,
                    content: response.content,
                    confidence: 0.8,
                    evidence: web_snippet.into_iter().collect(),
                    metadata: json!({ "role": self.role_label, "capability": format!("{:?}", self.capability) }),
                    tokens_used: response.tokens_used,
                    error: None,
                }
            }
            Err(err) => {
                self.leave_processing(true);
                AgentResult::failure(self.agent_id.clone(), task_id, err.to_string())
            }
        };
        result
    }

    async fn gather_web_snippet(&self, task_description: &str) -> Option<String> {
        let excerpt: String = task_description.chars().take(WEB_SEARCH_EXCERPT_CHARS).collect();
        let result = self.tools.execute("web_search", json!({ "query": excerpt, "max_results": 3 })).await;
        let results = result.get("results")?.as_array()?;
        if results.is_empty() {
            return None;
        }
        let joined = results
            .iter()
            .filter_map(|r| r.get("content").and_then(serde_json::Value::as_str))
            .collect::<Vec<_>>()
            .join("\n");
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }

    fn build_prompt(&self, original_task: &str, subtask_description: &str, web_snippet: Option<&str>, extension: &TaskContextExtension) -> String {
        let mut sections = vec![
            format!("Original task: {original_task}"),
            format!("Your subtask: {subtask_description}"),
        ];

        if let Some(position) = extension.agent_position {
            sections.push(format!("Your position on the team: {position}"));
        }
        if let Some(snippet) = web_snippet {
            sections.push(format!("Web search findings:\n{snippet}"));
        }
        if let Some(previous) = &extension.previous_attempt {
            let clipped: String = previous.chars().take(PREVIOUS_ATTEMPT_CLIP_CHARS).collect();
            sections.push(format!(
                "This is a rework. Supervisor score: {:.1}/10. Decision: {}. Feedback: {}. Instruction: {}.\n\
                 Previous attempt:\n{clipped}",
                extension.supervisor_score.unwrap_or(0.0),
                extension.supervisor_decision.as_deref().unwrap_or("REWORK"),
                extension.supervisor_feedback.as_deref().unwrap_or(""),
                extension.rework_instruction.as_deref().unwrap_or("address the feedback"),
            ));
        }

        sections.join("\n\n")
    }

    /// Produces this round's proposal, optionally referencing the agent's
    /// previous-round proposal and critiques targeted at it.
    pub async fn generate_proposal(&self, topic: &str, round: u32, previous: Option<&Proposal>, targeting_critiques: &[&Critique]) -> Proposal {
        let mut prompt = format!("Debate topic: {topic}\nRound {round}: produce your proposal.");
        if let Some(prev) = previous {
            prompt.push_str(&format!("\nYour previous proposal:\n{}", prev.content));
        }
        if !targeting_critiques.is_empty() {
            let critiques = targeting_critiques.iter().map(|c| format!("- {}", c.weaknesses.join("; "))).collect::<Vec<_>>().join("\n");
            prompt.push_str(&format!("\nCritiques of your previous proposal:\n{critiques}"));
        }

        let request = CompletionRequest::new(&self.provider, vec![Message::system(self.role_system_prompt()), Message::user(prompt)]);
        let (content, confidence) = match self.router.completion(request).await {
            Ok(response) => (response.content, 0.7),
            Err(_) => (format!("[{} unavailable this round]", self.role_label), 0.0),
        };

        Proposal { id: Uuid::new_v4(), round, agent_id: self.agent_id.clone(), content, confidence, evidence: Vec::new() }
    }

    /// Critiques another agent's proposal. Falls back to a neutral score
    /// with a placeholder weakness if the structured critique fails to
    /// parse.
    pub async fn critique_proposal(&self, proposal: &Proposal, round: u32) -> Critique {
        let prompt = format!(
            "Critique the following proposal. Respond with JSON \
             {{\"strengths\": [...], \"weaknesses\": [...], \"score\": 1-10}}.\n\nProposal:\n{}",
            proposal.content
        );
        let request = CompletionRequest::new(&self.provider, vec![Message::user(prompt)]);

        let parsed = match self.router.completion(request).await {
            Ok(response) => {
                let json_text = extract_json_from_response(&response.content);
                serde_json::from_str::<CritiqueJson>(&json_text).ok()
            }
            Err(_) => None,
        };

        let CritiqueJson { strengths, weaknesses, score } = parsed.unwrap_or_else(|| CritiqueJson {
            strengths: Vec::new(),
            weaknesses: vec!["no critique available".to_string()],
            score: default_critique_score(),
        });

        Critique {
            round,
            critic_agent_id: self.agent_id.clone(),
            target_proposal_id: proposal.id,
            strengths,
            weaknesses,
            score: score.clamp(1.0, 10.0),
        }
    }

    /// Votes for the single best proposal among `proposals`, never its
    /// own. Returns `None` if no other proposal exists to vote for.
    pub async fn vote(&self, proposals: &[Proposal]) -> Option<Uuid> {
        let others: Vec<&Proposal> = proposals.iter().filter(|p| p.agent_id != self.agent_id).collect();
        if others.is_empty() {
            return None;
        }

        let listing = others.iter().enumerate().map(|(i, p)| format!("{}. ({}): {}", i + 1, p.id, p.content)).collect::<Vec<_>>().join("\n");
        let prompt = format!("Vote for the single best proposal below (not your own). Respond with JSON {{\"vote\": \"<proposal-id>\"}}.\n\n{listing}");
        let request = CompletionRequest::new(&self.provider, vec![Message::user(prompt)]);

        let voted = match self.router.completion(request).await {
            Ok(response) => {
                let json_text = extract_json_from_response(&response.content);
                serde_json::from_str::<VoteJson>(&json_text).ok().and_then(|v| Uuid::parse_str(&v.vote).ok())
            }
            Err(_) => None,
        };

        voted
            .filter(|id| others.iter().any(|p| &p.id == id))
            .or_else(|| others.first().map(|p| p.id))
    }
}
