//! Persistence API: task CRUD, subtasks/validation/debate lookups, live
//! stream subscription, and chat-over-result. Thin orchestration over
//! [`TaskRepository`], the ephemeral stream, and the LLM router; the HTTP
//! layer is a direct pass-through onto these methods.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::errors::OrchestrationResult;
use crate::domain::models::memory::StreamEvent;
use crate::domain::models::task::{Task, TaskStatus};
use crate::domain::ports::memory_repository::EphemeralStore;
use crate::domain::ports::task_repository::TaskRepository;
use crate::services::llm_router::LlmRouter;
use crate::services::orchestrator::Orchestrator;
use crate::services::tool_registry::ToolRegistry;

/// Result content is clipped to this many characters before it's quoted
/// into a chat prompt.
const CHAT_RESULT_CLIP_CHARS: usize = 4000;
/// How many web-search hits `chat` folds into its RAG prompt.
const CHAT_WEB_SEARCH_RESULTS: u32 = 3;

/// Reply to `POST /api/tasks/{id}/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub agent: Option<String>,
    pub sources: Vec<String>,
}

/// Wraps task storage, the ephemeral stream, and the orchestrator behind
/// the operations the HTTP layer needs.
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    ephemeral: Arc<dyn EphemeralStore>,
    router: Arc<LlmRouter>,
    tools: Arc<ToolRegistry>,
    orchestrator: Arc<Orchestrator>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>, ephemeral: Arc<dyn EphemeralStore>, router: Arc<LlmRouter>, tools: Arc<ToolRegistry>, orchestrator: Arc<Orchestrator>) -> Self {
        Self { tasks, ephemeral, router, tools, orchestrator }
    }

    /// `POST /api/tasks`. Persists a new task and, if `auto_execute`,
    /// launches its lifecycle as a detached background job.
    pub async fn submit(&self, description: impl Into<String>, provider: impl Into<String>, auto_execute: bool) -> OrchestrationResult<Task> {
        let task = self.orchestrator.submit(description, provider).await?;

        if auto_execute {
            let orchestrator = self.orchestrator.clone();
            let task_id = task.id;
            tokio::spawn(async move { orchestrator.run(task_id).await });
        }

        Ok(task)
    }

    /// `GET /api/tasks/{id}`.
    pub async fn get(&self, task_id: &str) -> OrchestrationResult<Option<Task>> {
        self.tasks.get(task_id).await
    }

    /// `GET /api/tasks`, sorted by `created_at` descending and optionally
    /// filtered by status. `limit`/`offset` apply after filtering.
    pub async fn list(&self, status: Option<TaskStatus>, limit: u32, offset: u32) -> OrchestrationResult<Vec<Task>> {
        let mut tasks = self.tasks.list(limit.saturating_add(offset).max(limit), 0).await?;
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(status) = status {
            tasks.retain(|t| t.status == status);
        }
        Ok(tasks.into_iter().skip(offset as usize).take(limit as usize).collect())
    }

    /// `GET /api/tasks/{id}/subtasks`.
    pub async fn subtasks(&self, task_id: &str) -> OrchestrationResult<Vec<crate::domain::models::task::SubTask>> {
        self.tasks.list_subtasks(task_id).await
    }

    /// `GET /api/tasks/{id}/validation`.
    pub async fn validation(&self, task_id: &str) -> OrchestrationResult<Option<crate::domain::models::validation::ValidationResult>> {
        Ok(self.tasks.get(task_id).await?.and_then(|t| t.validation_results))
    }

    /// `GET /api/tasks/{id}/debate`.
    pub async fn debate(&self, task_id: &str) -> OrchestrationResult<Option<crate::domain::models::debate::DebateState>> {
        Ok(self.tasks.get(task_id).await?.and_then(|t| t.debate_state))
    }

    /// `DELETE /api/tasks/{id}`. Only tasks in a cancellable status
    /// transition; in-flight calls drain on their own and are discarded
    /// by the orchestrator's own cancellation check.
    pub async fn cancel(&self, task_id: &str) -> OrchestrationResult<Option<Task>> {
        let Some(mut task) = self.tasks.get(task_id).await? else {
            return Ok(None);
        };
        if matches!(task.status, TaskStatus::InProgress | TaskStatus::Validating | TaskStatus::Debating | TaskStatus::Pending) {
            task.cancel();
            self.tasks.update(&task).await?;
        }
        Ok(Some(task))
    }

    /// `GET /api/tasks/{id}/stream`. Returns the events currently buffered
    /// on the task's ephemeral stream; the HTTP layer turns this into SSE
    /// frames and polls it for new entries.
    pub async fn stream_events(&self, task_id: &str, limit: usize) -> Vec<StreamEvent> {
        self.ephemeral.read_stream(&format!("memory:stream:task:{task_id}"), limit).await.unwrap_or_default()
    }

    /// `POST /api/tasks/{id}/chat`. Builds a RAG prompt from the task
    /// description, its truncated result, and optional web-search hits,
    /// then answers with a single completion against `target_agent`'s
    /// provider if named, else the task's own provider.
    pub async fn chat(&self, task_id: &str, message: &str, use_web_search: bool, target_agent: Option<&str>, context: Option<&str>) -> OrchestrationResult<ChatReply> {
        use crate::domain::errors::OrchestrationError;
        use crate::domain::ports::llm_provider::{CompletionRequest, Message};

        let task = self.tasks.get(task_id).await?.ok_or_else(|| OrchestrationError::ParseFailed(format!("unknown task {task_id}")))?;

        let result_excerpt: String = task
            .result
            .as_ref()
            .and_then(|r| r.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .chars()
            .take(CHAT_RESULT_CLIP_CHARS)
            .collect();

        let mut sources = Vec::new();
        let mut search_section = String::new();
        if use_web_search {
            let hits = self.tools.execute("web_search", json!({ "query": message, "max_results": CHAT_WEB_SEARCH_RESULTS })).await;
            if let Some(array) = hits.as_array() {
                for hit in array {
                    if let Some(url) = hit.get("url").and_then(Value::as_str) {
                        sources.push(url.to_string());
                    }
                }
                search_section = format!("\n\nWeb search results:\n{}", serde_json::to_string_pretty(&hits).unwrap_or_default());
            }
        }

        let extra_context = context.map(|c| format!("\n\nAdditional context: {c}")).unwrap_or_default();
        let prompt = format!(
            "You are answering a follow-up question about a completed task.\n\nTask: {}\n\nResult so far:\n{result_excerpt}{search_section}{extra_context}\n\nQuestion: {message}",
            task.description
        );

        let provider = target_agent.unwrap_or(task.provider.as_str());
        let request = CompletionRequest::new(provider, vec![Message::system("Answer using only the task context and search results provided."), Message::user(prompt)]);
        let response = self.router.completion(request).await?;

        Ok(ChatReply { response: response.content, agent: target_agent.map(str::to_string), sources })
    }
}
