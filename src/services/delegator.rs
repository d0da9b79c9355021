//! Delegator: plans an execution strategy, an agent roster, and per-agent
//! subtasks from a natural-language task description.
//!
//! Grounded on `original_source/backend/core/delegator.py`'s
//! analyze -> plan -> pad -> decompose -> choose-strategy pipeline.

use serde::Deserialize;

use crate::domain::models::delegation::{
    AgentPlan, Capability, DelegationPlan, MAX_AGENTS, MIN_AGENTS, STANDARD_ROLES,
};
use crate::domain::ports::llm_provider::{CompletionRequest, Message};
use crate::services::extract_json_from_response;
use crate::services::llm_router::LlmRouter;

#[derive(Debug, Deserialize)]
struct AgentConfigEntry {
    role: String,
    #[serde(default)]
    capability: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    #[serde(default)]
    task_interpretation: String,
    #[serde(default)]
    main_tasks_identified: Vec<String>,
    #[serde(default)]
    research_approach: String,
    #[serde(default)]
    requires_debate: bool,
    #[serde(default)]
    complexity: f32,
    #[serde(default)]
    agent_config: Vec<AgentConfigEntry>,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Deserialize, Default)]
struct DecompositionResponse {
    #[serde(default)]
    subtasks: Vec<String>,
}

fn parse_capability(s: &str) -> Option<Capability> {
    match s.to_lowercase().as_str() {
        "research" => Some(Capability::Research),
        "analysis" => Some(Capability::Analysis),
        "coding" => Some(Capability::Coding),
        "review" => Some(Capability::Review),
        _ => None,
    }
}

fn fallback_analysis(task_description: &str) -> AnalysisResponse {
    AnalysisResponse {
        task_interpretation: task_description.to_string(),
        main_tasks_identified: vec![task_description.to_string()],
        research_approach: "direct analysis".to_string(),
        requires_debate: false,
        complexity: 0.3,
        agent_config: vec![AgentConfigEntry { role: "analyst".to_string(), capability: Some("analysis".to_string()) }],
        reasoning: "fallback: analysis call failed or produced unparseable output".to_string(),
    }
}

/// Plans an execution strategy, a roster of role-typed agents, and the
/// per-agent subtasks that will be dispatched to them.
pub struct Delegator<'a> {
    router: &'a LlmRouter,
    cloud_priority: Vec<String>,
}

impl<'a> Delegator<'a> {
    pub fn new(router: &'a LlmRouter, cloud_priority: Vec<String>) -> Self {
        Self { router, cloud_priority }
    }

    pub async fn delegate(&self, task_description: &str, provider_hint: &str) -> DelegationPlan {
        let analysis = self.analyze(task_description, provider_hint).await;
        let mut roles = Self::plan_roles(&analysis);
        Self::pad_floor(&mut roles);
        roles.truncate(MAX_AGENTS);
        let subtask_descriptions = self.decompose(task_description, &analysis, &roles, provider_hint).await;

        let agents: Vec<AgentPlan> = roles
            .into_iter()
            .enumerate()
            .map(|(idx, (agent_type, capability))| AgentPlan {
                agent_name: format!("{agent_type}-{idx}"),
                description: format!("{agent_type} agent for: {task_description}"),
                subtask_description: subtask_descriptions.get(idx).cloned().unwrap_or_else(|| task_description.to_string()),
                provider: self.provider_for(idx, provider_hint),
                priority: idx as u32,
                capability,
                agent_type,
            })
            .collect();

        let requires_debate = analysis.requires_debate;
        let execution_strategy = DelegationPlan::choose_strategy(agents.len(), requires_debate);

        DelegationPlan {
            execution_strategy,
            requires_debate,
            complexity_score: analysis.complexity.clamp(0.0, 1.0),
            task_interpretation: analysis.task_interpretation,
            main_tasks_identified: analysis.main_tasks_identified,
            research_approach: analysis.research_approach,
            reasoning: analysis.reasoning,
            agents,
        }
    }

    async fn analyze(&self, task_description: &str, provider_hint: &str) -> AnalysisResponse {
        let prompt = format!(
            "Analyze the following task and respond with a JSON object with fields \
             task_interpretation, main_tasks_identified (list), research_approach, \
             requires_debate (bool), complexity (0-1), reasoning, and agent_config \
             (a list of 4 to 15 entries, each {{role, capability, expertise}}).\n\nTask: {task_description}"
        );
        let request = CompletionRequest::new(
            provider_hint,
            vec![Message::system("You are a task delegation planner."), Message::user(prompt)],
        );

        match self.router.completion(request).await {
            Ok(response) => {
                let json_text = extract_json_from_response(&response.content);
                serde_json::from_str(&json_text).unwrap_or_else(|_| fallback_analysis(task_description))
            }
            Err(_) => fallback_analysis(task_description),
        }
    }

    /// Dynamic role names are preserved verbatim; capability is either the
    /// analyzed value or inferred from the role label.
    fn plan_roles(analysis: &AnalysisResponse) -> Vec<(String, Capability)> {
        analysis
            .agent_config
            .iter()
            .map(|entry| {
                let capability = entry.capability.as_deref().and_then(parse_capability).unwrap_or_else(|| Capability::from_role_label(&entry.role));
                (entry.role.clone(), capability)
            })
            .collect()
    }

    /// A single analyzed role is an explicit "this task doesn't need a
    /// team" decision and is left as-is; an empty or 2-3 role roster pads
    /// up to the floor.
    fn pad_floor(roles: &mut Vec<(String, Capability)>) {
        if roles.len() == 1 || roles.len() >= MIN_AGENTS {
            return;
        }
        let mut idx = 0;
        while roles.len() < MIN_AGENTS {
            let role = STANDARD_ROLES[idx % STANDARD_ROLES.len()];
            roles.push((role.to_string(), Capability::from_role_label(role)));
            idx += 1;
        }
    }

    fn provider_for(&self, index: usize, provider_hint: &str) -> String {
        if provider_hint != "auto" {
            return provider_hint.to_string();
        }
        if self.cloud_priority.is_empty() {
            return "auto".to_string();
        }
        self.cloud_priority[index % self.cloud_priority.len()].clone()
    }

    async fn decompose(
        &self,
        task_description: &str,
        analysis: &AnalysisResponse,
        roles: &[(String, Capability)],
        provider_hint: &str,
    ) -> Vec<String> {
        if roles.len() <= 1 {
            return vec![task_description.to_string()];
        }

        let n = roles.len();
        let role_list = roles.iter().map(|(r, _)| r.as_str()).collect::<Vec<_>>().join(", ");
        let prompt = format!(
            "Break the following task into exactly {n} distinct subtask instructions, one per \
             agent role ({role_list}). Do not repeat the original task verbatim; each subtask \
             must add unique value. Respond with JSON {{\"subtasks\": [...]}} with exactly {n} \
             strings.\n\nTask: {task_description}"
        );
        let request = CompletionRequest::new(
            provider_hint,
            vec![Message::system("You are a task decomposition planner."), Message::user(prompt)],
        );

        let parsed = match self.router.completion(request).await {
            Ok(response) => {
                let json_text = extract_json_from_response(&response.content);
                serde_json::from_str::<DecompositionResponse>(&json_text).ok().map(|d| d.subtasks)
            }
            Err(_) => None,
        };

        match parsed {
            Some(subtasks) if subtasks.len() == n => subtasks,
            _ => Self::synthesize_subtasks(task_description, analysis, roles),
        }
    }

    fn synthesize_subtasks(task_description: &str, analysis: &AnalysisResponse, roles: &[(String, Capability)]) -> Vec<String> {
        if analysis.main_tasks_identified.len() == roles.len() {
            return analysis.main_tasks_identified.clone();
        }
        roles
            .iter()
            .map(|(role, _)| format!("As the {role}, address: {} ({task_description})", analysis.task_interpretation))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::delegation::ExecutionStrategy;
    use crate::infrastructure::providers::MockLlmProvider;
    use crate::services::circuit_breaker::CircuitBreakerService;
    use crate::domain::ports::llm_provider::LlmProvider;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn router_with(mock: MockLlmProvider) -> LlmRouter {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        providers.insert("auto".to_string(), Arc::new(mock));
        let mut config = crate::domain::models::config::ProvidersConfig::default();
        config.cloud_priority = vec!["auto".to_string()];
        config.model_table.insert("auto".to_string(), "auto".to_string());
        LlmRouter::new(config, Arc::new(CircuitBreakerService::default()), providers)
    }

    #[tokio::test]
    async fn well_formed_analysis_produces_matching_roster() {
        let analysis = r#"{"task_interpretation":"plan a launch","main_tasks_identified":["a","b"],
            "research_approach":"desk research","requires_debate":false,"complexity":0.6,
            "reasoning":"multi-faceted","agent_config":[
            {"role":"researcher","capability":"research"},
            {"role":"analyst","capability":"analysis"},
            {"role":"coder","capability":"coding"},
            {"role":"reviewer","capability":"review"}]}"#;
        let decomposition = r#"{"subtasks":["find competitors","analyze pricing","draft landing page","review copy"]}"#;
        let router = router_with(MockLlmProvider::new("auto").with_response(analysis).with_response(decomposition));

        let delegator = Delegator::new(&router, vec!["auto".to_string()]);
        let plan = delegator.delegate("launch the product", "auto").await;

        assert_eq!(plan.agents.len(), 4);
        assert_eq!(plan.agents[0].agent_type, "researcher");
        assert_eq!(plan.agents[0].subtask_description, "find competitors");
        assert_eq!(plan.execution_strategy, ExecutionStrategy::Sequential);
    }

    #[tokio::test]
    async fn analysis_failure_falls_back_to_single_agent_plan() {
        let router = router_with(MockLlmProvider::new("auto").with_timeout_error());
        let delegator = Delegator::new(&router, vec!["auto".to_string()]);
        let plan = delegator.delegate("capitalize the word hello", "auto").await;

        assert_eq!(plan.agents.len(), 1);
        assert_eq!(plan.agents[0].agent_type, "analyst");
        assert_eq!(plan.execution_strategy, ExecutionStrategy::Single);
    }

    #[tokio::test]
    async fn partial_roster_pads_to_floor() {
        let analysis = r#"{"task_interpretation":"x","main_tasks_identified":["a","b"],
            "research_approach":"x","requires_debate":false,"complexity":0.5,"reasoning":"x",
            "agent_config":[{"role":"researcher","capability":"research"},{"role":"analyst","capability":"analysis"}]}"#;
        let router = router_with(MockLlmProvider::new("auto").with_response(analysis).with_timeout_error());
        let delegator = Delegator::new(&router, vec!["auto".to_string()]);
        let plan = delegator.delegate("investigate and report", "auto").await;

        assert_eq!(plan.agents.len(), MIN_AGENTS);
        assert_eq!(plan.agents[0].agent_type, "researcher");
        assert_eq!(plan.agents[2].agent_type, "coder");
    }

    #[tokio::test]
    async fn empty_roster_pads_to_floor() {
        let analysis = r#"{"task_interpretation":"x","main_tasks_identified":["a"],
            "research_approach":"x","requires_debate":false,"complexity":0.5,"reasoning":"x",
            "agent_config":[]}"#;
        let router = router_with(MockLlmProvider::new("auto").with_response(analysis).with_timeout_error());
        let delegator = Delegator::new(&router, vec!["auto".to_string()]);
        let plan = delegator.delegate("investigate and report", "auto").await;

        assert_eq!(plan.agents.len(), MIN_AGENTS);
    }

    #[tokio::test]
    async fn oversized_roster_is_clamped_to_ceiling() {
        let roles: Vec<String> = (0..20).map(|i| format!(r#"{{"role":"r{i}","capability":"analysis"}}"#)).collect();
        let analysis = format!(
            r#"{{"task_interpretation":"x","main_tasks_identified":["a"],
            "research_approach":"x","requires_debate":false,"complexity":0.5,"reasoning":"x",
            "agent_config":[{}]}}"#,
            roles.join(",")
        );
        let router = router_with(MockLlmProvider::new("auto").with_response(analysis).with_timeout_error());
        let delegator = Delegator::new(&router, vec!["auto".to_string()]);
        let plan = delegator.delegate("investigate and report", "auto").await;

        assert_eq!(plan.agents.len(), MAX_AGENTS);
    }

    #[tokio::test]
    async fn auto_provider_round_robins_across_cloud_priority() {
        let analysis = r#"{"task_interpretation":"x","main_tasks_identified":[],
            "research_approach":"x","requires_debate":false,"complexity":0.5,"reasoning":"x",
            "agent_config":[{"role":"a","capability":"research"},{"role":"b","capability":"analysis"},
            {"role":"c","capability":"coding"},{"role":"d","capability":"review"}]}"#;
        let router = router_with(MockLlmProvider::new("auto").with_response(analysis).with_timeout_error());
        let delegator = Delegator::new(&router, vec!["google".to_string(), "anthropic".to_string()]);
        let plan = delegator.delegate("x", "auto").await;

        assert_eq!(plan.agents[0].provider, "google");
        assert_eq!(plan.agents[1].provider, "anthropic");
        assert_eq!(plan.agents[2].provider, "google");
        assert_eq!(plan.agents[3].provider, "anthropic");
    }
}
