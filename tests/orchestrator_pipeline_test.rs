//! End-to-end run of a task through `Orchestrator` against a real
//! sqlite-backed `TaskRepository`, with a scripted `MockLlmProvider`
//! standing in for every LLM call the pipeline makes (analyze, dispatch,
//! critique, synthesize).

use std::collections::HashMap;
use std::sync::Arc;

use taskswarm::domain::models::config::{OrchestratorConfig, ProvidersConfig};
use taskswarm::domain::models::task::TaskStatus;
use taskswarm::domain::ports::llm_provider::LlmProvider;
use taskswarm::domain::ports::task_repository::TaskRepository;
use taskswarm::infrastructure::database::{DatabaseConnection, TaskRepositoryImpl};
use taskswarm::infrastructure::providers::MockLlmProvider;
use taskswarm::services::circuit_breaker::CircuitBreakerService;
use taskswarm::services::llm_router::LlmRouter;
use taskswarm::services::orchestrator::Orchestrator;
use taskswarm::services::tool_registry::ToolRegistry;

const ANALYSIS: &str = r#"{
    "task_interpretation": "summarize last week's incidents",
    "main_tasks_identified": ["summarize last week's incidents"],
    "research_approach": "direct analysis",
    "requires_debate": false,
    "complexity": 0.2,
    "reasoning": "single well-scoped request",
    "agent_config": [{"role": "analyst", "capability": "analysis"}]
}"#;

const CRITIQUE_ACCEPT: &str = r#"{
    "overall_score": 9.0,
    "verdict": "ACCEPT",
    "rework_required": false,
    "rework_instructions": null,
    "critical_issues": []
}"#;

#[tokio::test]
async fn single_agent_task_runs_to_completion() {
    let conn = DatabaseConnection::new("sqlite::memory:").await.expect("open db");
    conn.migrate().await.expect("run migrations");
    let tasks = Arc::new(TaskRepositoryImpl::new(conn.pool().clone()));

    let mock = MockLlmProvider::new("openai")
        .with_response(ANALYSIS)
        .with_response("here is the incident summary")
        .with_response(CRITIQUE_ACCEPT)
        .with_response("final synthesized report");

    let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
    providers.insert("openai".to_string(), Arc::new(mock));
    let router = Arc::new(LlmRouter::new(ProvidersConfig::default(), Arc::new(CircuitBreakerService::default()), providers));
    let tools = Arc::new(ToolRegistry::new());

    let orchestrator = Orchestrator::with_config(tasks.clone(), router, tools, vec!["openai".to_string()], OrchestratorConfig::default());

    let task = orchestrator.submit("summarize last week's incidents", "openai").await.expect("submit");
    orchestrator.run(task.id).await;

    let finished = tasks.get(&task.id.to_string()).await.expect("get").expect("task exists");
    assert_eq!(finished.status, TaskStatus::Completed);
    assert_eq!(finished.subtasks.len(), 1);
    assert_eq!(finished.agents_count, 1);
    assert!(finished.validation_results.as_ref().expect("validation present").passed);

    let content = finished.result.as_ref().and_then(|r| r.get("content")).and_then(|c| c.as_str()).unwrap_or_default();
    assert_eq!(content, "final synthesized report");
}

#[tokio::test]
async fn quality_gate_fails_task_when_supervisor_rejects() {
    let conn = DatabaseConnection::new("sqlite::memory:").await.expect("open db");
    conn.migrate().await.expect("run migrations");
    let tasks = Arc::new(TaskRepositoryImpl::new(conn.pool().clone()));

    const CRITIQUE_REJECT: &str = r#"{
        "overall_score": 1.0,
        "verdict": "REJECT",
        "rework_required": true,
        "rework_instructions": {"reason": "missing key facts", "priority_fixes": ["add sources"]},
        "critical_issues": ["fabricated a date"]
    }"#;

    // The default config allows 2 rework passes; the supervisor keeps
    // rejecting so both passes run before the gate fails the task.
    let mock = MockLlmProvider::new("openai")
        .with_response(ANALYSIS)
        .with_response("first attempt")
        .with_response(CRITIQUE_REJECT)
        .with_response("reworked attempt 1")
        .with_response(CRITIQUE_REJECT)
        .with_response("reworked attempt 2")
        .with_response(CRITIQUE_REJECT);

    let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
    providers.insert("openai".to_string(), Arc::new(mock));
    let router = Arc::new(LlmRouter::new(ProvidersConfig::default(), Arc::new(CircuitBreakerService::default()), providers));
    let tools = Arc::new(ToolRegistry::new());

    let config = OrchestratorConfig { quality_gate_enabled: true, ..OrchestratorConfig::default() };
    let orchestrator = Orchestrator::with_config(tasks.clone(), router, tools, vec!["openai".to_string()], config);

    let task = orchestrator.submit("summarize last week's incidents", "openai").await.expect("submit");
    orchestrator.run(task.id).await;

    let finished = tasks.get(&task.id.to_string()).await.expect("get").expect("task exists");
    assert_eq!(finished.status, TaskStatus::Failed);
    assert!(finished.error.is_some());
}
