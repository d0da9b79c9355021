//! Orchestrator: the authoritative end-to-end task lifecycle — delegate,
//! materialize agents and subtasks, parallel execute, critique, rework,
//! validate, synthesize, persist.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use futures::stream::{self, StreamExt};
use serde_json::json;
use uuid::Uuid;

use crate::domain::errors::{OrchestrationError, OrchestrationResult};
use crate::domain::models::agent::{AgentResult, AgentRuntimeKind, TaskContextExtension};
use crate::domain::models::config::OrchestratorConfig;
use crate::domain::models::debate::DEFAULT_MAX_ROUNDS;
use crate::domain::models::delegation::ExecutionStrategy;
use crate::domain::models::supervisor::Decision;
use crate::domain::models::task::{SubTask, SubTaskStatus, Task, TaskStatus, MAX_REWORK_ATTEMPTS};
use crate::domain::models::validation::ValidationResult;
use crate::domain::ports::task_repository::TaskRepository;
use crate::services::agent_runtime::Agent;
use crate::services::debate_engine::DebateEngine;
use crate::services::delegator::Delegator;
use crate::services::llm_router::LlmRouter;
use crate::services::supervisor::Supervisor;
use crate::services::tool_registry::ToolRegistry;

/// How much of each agent's content is quoted in the synthesizer prompt.
const SYNTHESIS_CONTRACTION_CHARS: usize = 1500;

/// Drives a [`Task`] from `pending` to a terminal status, checkpointing
/// best-effort after every step.
pub struct Orchestrator {
    tasks: Arc<dyn TaskRepository>,
    router: Arc<LlmRouter>,
    tools: Arc<ToolRegistry>,
    cloud_priority: Vec<String>,
    config: OrchestratorConfig,
    task_agents: RwLock<HashMap<Uuid, Vec<Arc<Agent>>>>,
}

impl Orchestrator {
    pub fn new(tasks: Arc<dyn TaskRepository>, router: Arc<LlmRouter>, tools: Arc<ToolRegistry>, cloud_priority: Vec<String>) -> Self {
        Self::with_config(tasks, router, tools, cloud_priority, OrchestratorConfig::default())
    }

    pub fn with_config(
        tasks: Arc<dyn TaskRepository>,
        router: Arc<LlmRouter>,
        tools: Arc<ToolRegistry>,
        cloud_priority: Vec<String>,
        config: OrchestratorConfig,
    ) -> Self {
        Self { tasks, router, tools, cloud_priority, config, task_agents: RwLock::new(HashMap::new()) }
    }

    /// Bound on concurrently in-flight agent calls, always at least one.
    fn concurrency_limit(&self) -> usize {
        self.config.max_parallel_agents.max(1)
    }

    /// Rework attempts allowed this run, capped by the domain's absolute ceiling.
    fn rework_attempts(&self) -> u32 {
        self.config.max_rework_attempts.min(MAX_REWORK_ATTEMPTS)
    }

    /// Agents currently materialized for `task_id`, if any.
    pub fn agents_for(&self, task_id: Uuid) -> Vec<Arc<Agent>> {
        self.task_agents.read().expect("task_agents lock poisoned").get(&task_id).cloned().unwrap_or_default()
    }

    /// Creates and persists a new task in `pending` status. Does not run it.
    pub async fn submit(&self, description: impl Into<String>, provider: impl Into<String>) -> OrchestrationResult<Task> {
        let task = Task::new(description, provider);
        self.tasks.create(&task).await?;
        Ok(task)
    }

    /// Runs the full lifecycle for an already-persisted task.
    pub async fn run(&self, task_id: Uuid) {
        let Ok(Some(mut task)) = self.tasks.get(&task_id.to_string()).await else {
            tracing::warn!(%task_id, "orchestrator run: task not found");
            return;
        };

        if let Err(err) = self.execute(&mut task).await {
            if !matches!(err, OrchestrationError::Cancelled) {
                task.fail(err.to_string());
                self.checkpoint(&task).await;
            }
        }

        self.task_agents.write().expect("task_agents lock poisoned").remove(&task_id);
    }

    async fn execute(&self, task: &mut Task) -> OrchestrationResult<()> {
        task.transition(TaskStatus::InProgress);
        self.checkpoint(task).await;
        if self.is_cancelled(task.id).await {
            return Err(OrchestrationError::Cancelled);
        }

        let delegator = Delegator::new(&self.router, self.cloud_priority.clone());
        let plan = delegator.delegate(&task.description, &task.provider).await;
        task.context.insert("delegation_plan".to_string(), serde_json::to_value(&plan).unwrap_or(json!({})));
        self.checkpoint(task).await;

        if plan.agents.is_empty() {
            return Err(OrchestrationError::FatalPlan("delegation produced no agents".to_string()));
        }

        let agents: Vec<Arc<Agent>> = plan
            .agents
            .iter()
            .map(|entry| {
                Arc::new(Agent::new(
                    format!("{}-{}", entry.agent_name, task.id),
                    entry.agent_type.clone(),
                    AgentRuntimeKind::from(entry.capability),
                    entry.provider.clone(),
                    self.router.clone(),
                    self.tools.clone(),
                ))
            })
            .collect();
        self.task_agents.write().expect("task_agents lock poisoned").insert(task.id, agents.clone());

        let supervisor = Supervisor::new(&self.router, task.provider.clone());

        for (idx, agent) in agents.iter().enumerate() {
            task.subtasks.push(SubTask::new(task.id, agent.agent_id.clone(), agent.role_label.clone(), plan.agents[idx].subtask_description.clone()));
        }
        for subtask in &task.subtasks {
            let _ = self.tasks.create_subtask(&task.id.to_string(), subtask).await;
        }

        let mut results: Vec<AgentResult> = if plan.execution_strategy == ExecutionStrategy::Debate {
            self.run_debate(task, &agents).await
        } else {
            self.dispatch(task, &agents, &plan.agents.iter().map(|a| a.subtask_description.clone()).collect::<Vec<_>>()).await
        };

        self.record_results(task, &results);
        self.checkpoint(task).await;

        let mut critiques = self.critique_all(&supervisor, task, &agents, &results).await;
        self.rework_loop(task, &agents, &supervisor, &mut results, &mut critiques).await;

        task.transition(TaskStatus::Validating);
        self.checkpoint(task).await;
        let validation = self.aggregate_validation(&critiques);
        task.validation_results = Some(validation.clone());

        if self.config.quality_gate_enabled && !validation.passed {
            return Err(OrchestrationError::ValidationFailed(validation.summary));
        }

        let synthesis = self.synthesize(task, &agents, &results).await;

        task.result = Some(json!({
            "content": synthesis.content,
            "agents": agents.iter().map(|a| a.role_label.clone()).collect::<Vec<_>>(),
            "agent_outputs": results.iter().map(|r| json!({"agent_id": r.agent_id, "content": r.content, "confidence": r.confidence})).collect::<Vec<_>>(),
        }));
        task.tokens_used = results.iter().map(|r| r.tokens_used).sum::<u64>() + synthesis.tokens_used;
        task.agents_count = task.subtasks.len() as u32;
        task.transition(TaskStatus::Completed);
        self.checkpoint(task).await;

        Ok(())
    }

    async fn dispatch(&self, task: &Task, agents: &[Arc<Agent>], subtask_descriptions: &[String]) -> Vec<AgentResult> {
        let futures = agents.iter().enumerate().map(|(idx, agent)| {
            let extension = TaskContextExtension { original_task: Some(task.description.clone()), agent_position: Some(idx), ..Default::default() };
            let description = task.description.clone();
            let subtask_description = subtask_descriptions[idx].clone();
            let task_id = task.id;
            async move { agent.process(task_id, &description, &subtask_description, &extension).await }
        });
        stream::iter(futures).buffered(self.concurrency_limit()).collect().await
    }

    async fn run_debate(&self, task: &mut Task, agents: &[Arc<Agent>]) -> Vec<AgentResult> {
        let engine = DebateEngine::new(agents);
        let state = engine.run(task.id, &task.description, DEFAULT_MAX_ROUNDS).await;
        let final_round = state.round;

        let results = agents
            .iter()
            .map(|agent| {
                let content = state
                    .proposals
                    .iter()
                    .rev()
                    .find(|p| p.agent_id == agent.agent_id && p.round == final_round)
                    .or_else(|| state.proposals.iter().rev().find(|p| p.agent_id == agent.agent_id))
                    .map(|p| p.content.clone())
                    .unwrap_or_default();
                AgentResult::success(agent.agent_id.clone(), task.id, content)
            })
            .collect();

        task.debate_state = Some(state);
        results
    }

    fn record_results(&self, task: &mut Task, results: &[AgentResult]) {
        for (subtask, result) in task.subtasks.iter_mut().zip(results) {
            if let Some(error) = &result.error {
                subtask.status = SubTaskStatus::Failed;
                subtask.error = Some(error.clone());
            } else {
                subtask.status = SubTaskStatus::Completed;
                subtask.result = Some(json!({ "content": result.content, "confidence": result.confidence }));
            }
        }
    }

    async fn critique_all(&self, supervisor: &Supervisor<'_>, task: &Task, agents: &[Arc<Agent>], results: &[AgentResult]) -> Vec<crate::domain::models::supervisor::SupervisorCritique> {
        let futures = agents.iter().zip(results).map(|(agent, result)| {
            supervisor.critique(&agent.role_label, &agent.agent_id, &result.content, &task.description, None)
        });
        stream::iter(futures).buffered(self.concurrency_limit()).collect().await
    }

    async fn rework_loop(
        &self,
        task: &mut Task,
        agents: &[Arc<Agent>],
        supervisor: &Supervisor<'_>,
        results: &mut [AgentResult],
        critiques: &mut Vec<crate::domain::models::supervisor::SupervisorCritique>,
    ) {
        for _ in 0..self.rework_attempts() {
            let needs_rework: Vec<usize> = critiques
                .iter()
                .enumerate()
                .filter(|(_, c)| c.rework_required || matches!(c.decision, Decision::Rework | Decision::Reject))
                .map(|(i, _)| i)
                .collect();
            if needs_rework.is_empty() {
                break;
            }

            let futures = needs_rework.iter().map(|&idx| {
                let agent = &agents[idx];
                let critique = &critiques[idx];
                let previous_attempt = results[idx].content.clone();
                let reason = critique.rework_instructions.as_ref().map(|r| r.reason.clone()).unwrap_or_else(|| "quality below threshold".to_string());
                let rework_instruction = if critique.decision == Decision::Reject {
                    format!("This was rejected. You must substantially rewrite it: {reason}")
                } else {
                    format!("Revise to address: {reason}")
                };
                let extension = TaskContextExtension {
                    original_task: Some(task.description.clone()),
                    agent_position: Some(idx),
                    previous_attempt: Some(previous_attempt),
                    supervisor_feedback: Some(reason),
                    supervisor_score: Some(critique.score),
                    supervisor_decision: Some(format!("{:?}", critique.decision).to_uppercase()),
                    rework_instruction: Some(rework_instruction),
                };
                let description = task.description.clone();
                let subtask_description = task.subtasks[idx].description.clone();
                let task_id = task.id;
                async move { (idx, agent.process(task_id, &description, &subtask_description, &extension).await) }
            });

            let reworked: Vec<(usize, AgentResult)> = stream::iter(futures).buffered(self.concurrency_limit()).collect().await;
            for (idx, result) in reworked {
                results[idx] = result;
                task.subtasks[idx].record_rework();
            }
            self.record_results(task, results);
            self.checkpoint(task).await;

            let recritique_futures = needs_rework.iter().map(|&idx| {
                let agent = &agents[idx];
                supervisor.critique(&agent.role_label, &agent.agent_id, &results[idx].content, &task.description, None)
            });
            let recritiques: Vec<_> = stream::iter(recritique_futures).buffered(self.concurrency_limit()).collect().await;
            for (idx, critique) in needs_rework.iter().zip(recritiques) {
                critiques[*idx] = critique;
            }
        }
    }

    fn aggregate_validation(&self, critiques: &[crate::domain::models::supervisor::SupervisorCritique]) -> ValidationResult {
        let accepted = critiques.iter().filter(|c| c.decision == Decision::Accept).count();
        ValidationResult {
            score: if critiques.is_empty() { 100 } else { ((critiques.iter().map(|c| c.score).sum::<f32>() / critiques.len() as f32) * 10.0) as i32 },
            passed: critiques.iter().all(|c| c.decision != Decision::Reject),
            issues: Vec::new(),
            critiques: critiques.iter().map(|c| serde_json::to_value(c).unwrap_or(json!({}))).collect(),
            scores: critiques.iter().map(|c| c.score / 10.0).collect(),
            summary: format!("{accepted}/{} agent outputs accepted by the supervisor", critiques.len()),
            validator: "supervisor".to_string(),
            supervisor_id: Some("supervisor".to_string()),
        }
    }

    async fn synthesize(&self, task: &Task, agents: &[Arc<Agent>], results: &[AgentResult]) -> AgentResult {
        let synthesizer_idx = agents.iter().position(|a| a.role_label.to_lowercase().contains("synthes")).unwrap_or(agents.len() - 1);
        let synthesizer = &agents[synthesizer_idx];

        let summary = task.validation_results.as_ref().map(|v| v.summary.clone()).unwrap_or_default();
        let contracted: String = agents
            .iter()
            .zip(results)
            .map(|(agent, result)| {
                let clipped: String = result.content.chars().take(SYNTHESIS_CONTRACTION_CHARS).collect();
                format!("### {} ({})\n{clipped}", agent.role_label, agent.agent_id)
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!("Synthesize the following agent outputs into one final answer.\n\nValidation summary: {summary}\n\n{contracted}");
        let extension = TaskContextExtension { original_task: Some(task.description.clone()), ..Default::default() };
        synthesizer.process(task.id, &task.description, &prompt, &extension).await
    }

    async fn is_cancelled(&self, task_id: Uuid) -> bool {
        matches!(self.tasks.get(&task_id.to_string()).await, Ok(Some(t)) if t.status == TaskStatus::Cancelled)
    }

    async fn checkpoint(&self, task: &Task) {
        if self.is_cancelled(task.id).await {
            return;
        }
        if let Err(err) = self.tasks.update(task).await {
            tracing::warn!(task_id = %task.id, error = %err, "checkpoint failed");
        }
        for subtask in &task.subtasks {
            if let Err(err) = self.tasks.update_subtask(&task.id.to_string(), subtask).await {
                tracing::warn!(task_id = %task.id, subtask_id = %subtask.id, error = %err, "subtask checkpoint failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::ProvidersConfig;
    use crate::domain::models::supervisor::SupervisorCritique;
    use crate::services::circuit_breaker::CircuitBreakerService;
    use std::collections::HashMap as Map;

    struct UnusedRepo;

    #[async_trait::async_trait]
    impl TaskRepository for UnusedRepo {
        async fn create(&self, _task: &Task) -> OrchestrationResult<()> {
            unreachable!("not exercised by these tests")
        }
        async fn get(&self, _task_id: &str) -> OrchestrationResult<Option<Task>> {
            unreachable!("not exercised by these tests")
        }
        async fn update(&self, _task: &Task) -> OrchestrationResult<()> {
            unreachable!("not exercised by these tests")
        }
        async fn list(&self, _limit: u32, _offset: u32) -> OrchestrationResult<Vec<Task>> {
            unreachable!("not exercised by these tests")
        }
        async fn delete(&self, _task_id: &str) -> OrchestrationResult<()> {
            unreachable!("not exercised by these tests")
        }
        async fn create_subtask(&self, _task_id: &str, _subtask: &SubTask) -> OrchestrationResult<()> {
            unreachable!("not exercised by these tests")
        }
        async fn update_subtask(&self, _task_id: &str, _subtask: &SubTask) -> OrchestrationResult<()> {
            unreachable!("not exercised by these tests")
        }
        async fn list_subtasks(&self, _task_id: &str) -> OrchestrationResult<Vec<SubTask>> {
            unreachable!("not exercised by these tests")
        }
    }

    fn orchestrator(config: OrchestratorConfig) -> Orchestrator {
        let router = Arc::new(LlmRouter::new(ProvidersConfig::default(), Arc::new(CircuitBreakerService::default()), Map::new()));
        Orchestrator::with_config(Arc::new(UnusedRepo), router, Arc::new(ToolRegistry::new()), vec!["openai".to_string()], config)
    }

    fn critique(decision: Decision, score: f32) -> SupervisorCritique {
        SupervisorCritique {
            agent_id: "agent-1".to_string(),
            agent_type: "researcher".to_string(),
            score,
            decision,
            rework_required: decision == Decision::Rework,
            rework_instructions: None,
            evaluation: json!({}),
        }
    }

    #[test]
    fn concurrency_limit_never_drops_to_zero() {
        let orch = orchestrator(OrchestratorConfig { max_parallel_agents: 0, ..OrchestratorConfig::default() });
        assert_eq!(orch.concurrency_limit(), 1);
    }

    #[test]
    fn rework_attempts_capped_by_domain_ceiling() {
        let orch = orchestrator(OrchestratorConfig { max_rework_attempts: 100, ..OrchestratorConfig::default() });
        assert_eq!(orch.rework_attempts(), MAX_REWORK_ATTEMPTS);
    }

    #[test]
    fn rework_attempts_honors_a_lower_configured_bound() {
        let orch = orchestrator(OrchestratorConfig { max_rework_attempts: 1, ..OrchestratorConfig::default() });
        assert_eq!(orch.rework_attempts(), 1);
    }

    #[test]
    fn aggregate_validation_passes_when_nothing_is_rejected() {
        let orch = orchestrator(OrchestratorConfig::default());
        let critiques = vec![critique(Decision::Accept, 9.0), critique(Decision::Rework, 6.0)];
        let validation = orch.aggregate_validation(&critiques);
        assert!(validation.passed);
        assert_eq!(validation.scores.len(), 2);
    }

    #[test]
    fn aggregate_validation_fails_on_any_rejection() {
        let orch = orchestrator(OrchestratorConfig::default());
        let critiques = vec![critique(Decision::Accept, 9.0), critique(Decision::Reject, 2.0)];
        let validation = orch.aggregate_validation(&critiques);
        assert!(!validation.passed);
    }

    #[test]
    fn record_results_marks_subtasks_from_agent_outcomes() {
        let orch = orchestrator(OrchestratorConfig::default());
        let task_id = Uuid::new_v4();
        let mut task = Task::new("do the thing", "openai");
        task.id = task_id;
        task.subtasks.push(SubTask::new(task_id, "agent-1".to_string(), "researcher".to_string(), "investigate".to_string()));
        task.subtasks.push(SubTask::new(task_id, "agent-2".to_string(), "writer".to_string(), "draft".to_string()));

        let results = vec![AgentResult::success("agent-1", task_id, "findings"), AgentResult::failure("agent-2", task_id, "timed out")];
        orch.record_results(&mut task, &results);

        assert_eq!(task.subtasks[0].status, SubTaskStatus::Completed);
        assert_eq!(task.subtasks[1].status, SubTaskStatus::Failed);
        assert_eq!(task.subtasks[1].error.as_deref(), Some("timed out"));
    }
}
