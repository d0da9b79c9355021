//! Supervisor: a stateful critic that scores an agent's output and emits
//! an ACCEPT/REWORK/REJECT decision, bounded by a per-agent rework count.

use std::collections::HashMap;
use std::sync::RwLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::domain::models::supervisor::{Decision, ReworkInstructions, SupervisorCritique, DEFAULT_REWORK_THRESHOLD};
use crate::domain::models::task::MAX_REWORK_ATTEMPTS;
use crate::domain::ports::llm_provider::{CompletionRequest, Message};
use crate::services::extract_json_from_response;
use crate::services::llm_router::LlmRouter;

#[derive(Debug, Deserialize)]
struct ReworkInstructionsJson {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    priority_fixes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CritiqueJson {
    overall_score: f32,
    #[serde(default)]
    verdict: String,
    #[serde(default)]
    rework_required: bool,
    #[serde(default)]
    rework_instructions: Option<ReworkInstructionsJson>,
    #[serde(default)]
    critical_issues: Vec<String>,
}

struct ParsedCritique {
    score: f32,
    verdict: String,
    rework_required: bool,
    rework_instructions: Option<ReworkInstructions>,
    critical_issues: Vec<String>,
    evaluation: serde_json::Value,
}

fn normalize_verdict(verdict: &str) -> String {
    let upper = verdict.to_uppercase();
    match upper.as_str() {
        "REVISE" | "NEEDS_REWORK" | "NEEDS_MINOR_IMPROVEMENT" => "NEEDS_REWORK".to_string(),
        other => other.to_string(),
    }
}

/// Extracts a `X/10`-style score and a verdict keyword from free text when
/// the model does not return valid JSON.
fn regex_fallback(text: &str) -> ParsedCritique {
    let score_re = Regex::new(r"(\d+(?:\.\d+)?)\s*/\s*10").expect("valid regex");
    let score = score_re
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .unwrap_or(5.0)
        .clamp(0.0, 10.0);

    let lowered = text.to_lowercase();
    let verdict = if lowered.contains("reject") {
        "REJECT".to_string()
    } else if ["revise", "needs_rework", "needs minor improvement", "rework"].iter().any(|k| lowered.contains(k)) {
        "NEEDS_REWORK".to_string()
    } else if score >= 8.0 {
        "ACCEPT".to_string()
    } else if score >= 5.0 {
        "NEEDS_REWORK".to_string()
    } else {
        "REJECT".to_string()
    };

    ParsedCritique {
        score,
        verdict,
        rework_required: verdict == "NEEDS_REWORK",
        rework_instructions: None,
        critical_issues: Vec::new(),
        evaluation: json!({ "raw": text, "parse": "regex_fallback" }),
    }
}

fn parse_critique(response_text: &str) -> ParsedCritique {
    let json_text = extract_json_from_response(response_text);
    match serde_json::from_str::<CritiqueJson>(&json_text) {
        Ok(parsed) => ParsedCritique {
            score: parsed.overall_score.clamp(0.0, 10.0),
            verdict: normalize_verdict(&parsed.verdict),
            rework_required: parsed.rework_required,
            rework_instructions: parsed.rework_instructions.map(|r| ReworkInstructions { reason: r.reason, focus_areas: r.priority_fixes }),
            critical_issues: parsed.critical_issues,
            evaluation: serde_json::from_str(&json_text).unwrap_or(json!({ "raw": response_text })),
        },
        Err(_) => regex_fallback(response_text),
    }
}

/// Stateful critic. Tracks reworks per agent so repeated failures
/// eventually force acceptance rather than looping forever.
pub struct Supervisor<'a> {
    router: &'a LlmRouter,
    provider: String,
    rework_counts: RwLock<HashMap<String, u32>>,
}

impl<'a> Supervisor<'a> {
    pub fn new(router: &'a LlmRouter, provider: impl Into<String>) -> Self {
        Self { router, provider: provider.into(), rework_counts: RwLock::new(HashMap::new()) }
    }

    pub fn rework_count(&self, agent_id: &str) -> u32 {
        *self.rework_counts.read().expect("rework_counts lock poisoned").get(agent_id).unwrap_or(&0)
    }

    pub async fn critique(&self, agent_type: &str, agent_id: &str, output: &str, task_description: &str, quality_criteria: Option<&str>) -> SupervisorCritique {
        let prompt = format!(
            "Evaluate the following {agent_type} agent output against the task it was assigned. \
             {criteria}Respond with JSON {{\"overall_score\": 0-10, \"verdict\": \"ACCEPT|REVISE|REJECT\", \
             \"rework_required\": bool, \"rework_instructions\": {{\"reason\": \"...\", \"priority_fixes\": [...]}}, \
             \"critical_issues\": [...]}}.\n\nTask: {task_description}\n\nOutput:\n{output}",
            criteria = quality_criteria.map(|c| format!("Quality criteria: {c}. ")).unwrap_or_default(),
        );
        let request = CompletionRequest::new(&self.provider, vec![Message::system("You are a strict quality supervisor."), Message::user(prompt)]);

        let parsed = match self.router.completion(request).await {
            Ok(response) => parse_critique(&response.content),
            Err(err) => ParsedCritique {
                score: 5.0,
                verdict: "NEEDS_REWORK".to_string(),
                rework_required: true,
                rework_instructions: Some(ReworkInstructions { reason: format!("critique call failed: {err}"), focus_areas: vec![] }),
                critical_issues: Vec::new(),
                evaluation: json!({ "error": err.to_string() }),
            },
        };

        let decision = self.decide(agent_id, &parsed);
        let rework_required = decision == Decision::Rework;

        SupervisorCritique {
            agent_id: agent_id.to_string(),
            agent_type: agent_type.to_string(),
            score: parsed.score,
            decision,
            rework_required,
            rework_instructions: parsed.rework_instructions,
            evaluation: parsed.evaluation,
        }
    }

    fn decide(&self, agent_id: &str, parsed: &ParsedCritique) -> Decision {
        let exhausted = self.rework_count(agent_id) > MAX_REWORK_ATTEMPTS;
        if exhausted {
            return Decision::Accept;
        }

        let decision = if !parsed.critical_issues.is_empty() || parsed.verdict == "REJECT" {
            Decision::Reject
        } else if parsed.rework_required || parsed.score < DEFAULT_REWORK_THRESHOLD || parsed.verdict == "NEEDS_REWORK" {
            Decision::Rework
        } else {
            Decision::Accept
        };

        if decision == Decision::Rework {
            let mut counts = self.rework_counts.write().expect("rework_counts lock poisoned");
            *counts.entry(agent_id.to_string()).or_insert(0) += 1;
        }

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::llm_provider::LlmProvider;
    use crate::infrastructure::providers::MockLlmProvider;
    use crate::services::circuit_breaker::CircuitBreakerService;
    use std::collections::HashMap as Map;
    use std::sync::Arc;

    fn router_with(mock: MockLlmProvider) -> LlmRouter {
        let mut providers: Map<String, Arc<dyn LlmProvider>> = Map::new();
        providers.insert("openai".to_string(), Arc::new(mock));
        LlmRouter::new(crate::domain::models::config::ProvidersConfig::default(), Arc::new(CircuitBreakerService::default()), providers)
    }

    #[tokio::test]
    async fn high_score_json_accepts() {
        let router = router_with(MockLlmProvider::new("openai").with_response(r#"{"overall_score":9,"verdict":"ACCEPT","rework_required":false,"critical_issues":[]}"#));
        let supervisor = Supervisor::new(&router, "openai");
        let critique = supervisor.critique("analyst", "agent-1", "good output", "task", None).await;
        assert_eq!(critique.decision, Decision::Accept);
    }

    #[tokio::test]
    async fn low_score_json_reworks_and_increments_count() {
        let router = router_with(MockLlmProvider::new("openai").with_response(r#"{"overall_score":5.5,"verdict":"REVISE","rework_required":true,"critical_issues":[]}"#));
        let supervisor = Supervisor::new(&router, "openai");
        let critique = supervisor.critique("analyst", "agent-1", "weak output", "task", None).await;
        assert_eq!(critique.decision, Decision::Rework);
        assert_eq!(supervisor.rework_count("agent-1"), 1);
    }

    #[tokio::test]
    async fn critical_issues_force_reject() {
        let router = router_with(MockLlmProvider::new("openai").with_response(r#"{"overall_score":6,"verdict":"ACCEPT","rework_required":false,"critical_issues":["hallucinated citation"]}"#));
        let supervisor = Supervisor::new(&router, "openai");
        let critique = supervisor.critique("analyst", "agent-1", "output", "task", None).await;
        assert_eq!(critique.decision, Decision::Reject);
    }

    #[tokio::test]
    async fn malformed_response_falls_back_to_regex_extraction() {
        let router = router_with(MockLlmProvider::new("openai").with_response("Score: 3/10. This needs rework due to missing sources."));
        let supervisor = Supervisor::new(&router, "openai");
        let critique = supervisor.critique("analyst", "agent-1", "output", "task", None).await;
        assert_eq!(critique.score, 3.0);
        assert_eq!(critique.decision, Decision::Rework);
    }

    #[tokio::test]
    async fn exhausted_reworks_force_accept() {
        let rework_response = r#"{"overall_score":2,"verdict":"NEEDS_REWORK","rework_required":true,"critical_issues":[]}"#;
        let router = router_with(
            MockLlmProvider::new("openai")
                .with_response(rework_response)
                .with_response(rework_response)
                .with_response(rework_response)
                .with_response(rework_response),
        );
        let supervisor = Supervisor::new(&router, "openai");
        for _ in 0..3 {
            let critique = supervisor.critique("analyst", "agent-1", "output", "task", None).await;
            assert_eq!(critique.decision, Decision::Rework);
        }
        assert_eq!(supervisor.rework_count("agent-1"), 3);
        let fourth = supervisor.critique("analyst", "agent-1", "output", "task", None).await;
        assert_eq!(fourth.decision, Decision::Accept);
    }
}
