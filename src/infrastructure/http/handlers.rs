//! Request handlers for the task API.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::models::task::{Task, TaskStatus};
use crate::infrastructure::http::state::{AppState, Settings};

/// How often `/stream` polls the ephemeral stream for new events.
const STREAM_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// `/stream` stops polling once the task is terminal and this many
/// consecutive polls returned nothing new.
const STREAM_QUIET_POLLS_BEFORE_CLOSE: u32 = 3;

fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[derive(Debug, Deserialize)]
pub struct SubmitTaskBody {
    pub description: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_true")]
    pub auto_execute: bool,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

fn default_provider() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct SubmitTaskResponse {
    pub id: String,
    pub status: TaskStatus,
    pub description: String,
    pub expansion: Option<serde_json::Value>,
}

pub async fn submit_task(State(state): State<AppState>, Json(body): Json<SubmitTaskBody>) -> impl IntoResponse {
    match state.tasks.submit(body.description, body.provider, body.auto_execute).await {
        Ok(task) => {
            Json(SubmitTaskResponse { id: task.id.to_string(), status: task.status, description: task.description.clone(), expansion: task.context.get("delegation_plan").cloned() }).into_response()
        }
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

pub async fn list_tasks(State(state): State<AppState>, Query(query): Query<ListTasksQuery>) -> impl IntoResponse {
    match state.tasks.list(query.status, query.limit, query.offset).await {
        Ok(tasks) => Json(json!({ "tasks": tasks })).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.tasks.get(&id).await {
        Ok(Some(task)) => Json(task).into_response(),
        Ok(None) => not_found().into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

pub async fn get_subtasks(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.tasks.subtasks(&id).await {
        Ok(subtasks) => Json(json!({ "subtasks": subtasks })).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

pub async fn get_validation(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.tasks.validation(&id).await {
        Ok(validation) => Json(json!({ "validation": validation })).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

pub async fn get_debate(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.tasks.debate(&id).await {
        Ok(debate) => Json(debate).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

pub async fn cancel_task(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.tasks.cancel(&id).await {
        Ok(Some(task)) => Json(task).into_response(),
        Ok(None) => not_found().into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub message: String,
    #[serde(default)]
    pub use_web_search: bool,
    #[serde(default)]
    pub target_agent: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

pub async fn chat(State(state): State<AppState>, Path(id): Path<String>, Json(body): Json<ChatBody>) -> impl IntoResponse {
    match state.tasks.chat(&id, &body.message, body.use_web_search, body.target_agent.as_deref(), body.context.as_deref()).await {
        Ok(reply) => Json(reply).into_response(),
        Err(err) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    }
}

pub async fn stream_task(State(state): State<AppState>, Path(id): Path<String>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let initial = (state, id, 0usize, 0u32);
    let events = stream::unfold(initial, |(state, id, seen, quiet_polls)| async move {
        tokio::time::sleep(STREAM_POLL_INTERVAL).await;
        let buffered = state.tasks.stream_events(&id, 1000).await;

        if buffered.len() > seen {
            let fresh = buffered[seen..].to_vec();
            let frame = json!(fresh);
            let event = Event::default().json_data(&frame).unwrap_or_else(|_| Event::default().data("{}"));
            return Some((Ok(event), (state, id, buffered.len(), 0)));
        }

        let terminal = matches!(state.tasks.get(&id).await, Ok(Some(task)) if task.status.is_terminal());
        let next_quiet = quiet_polls + 1;
        if terminal && next_quiet >= STREAM_QUIET_POLLS_BEFORE_CLOSE {
            return None;
        }

        let keepalive = Event::default().comment("keepalive");
        Some((Ok(keepalive), (state, id, seen, next_quiet)))
    });
    Sse::new(events)
}

#[derive(Debug, Deserialize)]
pub struct AgentsQuery {
    pub task_id: Option<uuid::Uuid>,
}

/// Snapshot of agents materialized for `task_id`. Agents exist only for
/// the lifetime of their owning task, so an absent `task_id` returns an
/// empty roster rather than a cross-task listing.
pub async fn list_agents(State(state): State<AppState>, Query(query): Query<AgentsQuery>) -> impl IntoResponse {
    let agents = query.task_id.map(|id| state.orchestrator.agents_for(id)).unwrap_or_default();
    Json(json!({
        "agents": agents.iter().map(|a| json!({
            "agent_id": a.agent_id,
            "role": a.role_label,
            "capability": a.capability,
            "status": a.status(),
            "current_load": a.current_load(),
        })).collect::<Vec<_>>()
    }))
}

#[derive(Debug, Deserialize)]
pub struct AgentMemoryQuery {
    pub task_id: uuid::Uuid,
    pub query: Option<String>,
    #[serde(default = "default_memory_limit")]
    pub limit: usize,
}

fn default_memory_limit() -> usize {
    20
}

pub async fn agent_memory(State(state): State<AppState>, Path(agent_id): Path<String>, Query(query): Query<AgentMemoryQuery>) -> impl IntoResponse {
    let provider = match state.tasks.get(&query.task_id.to_string()).await {
        Ok(Some(task)) => task.provider,
        _ => "auto".to_string(),
    };
    let entries = state.memory.read(query.task_id, &agent_id, query.query.as_deref(), &provider, query.limit).await;
    Json(json!({ "entries": entries }))
}

pub async fn providers_status(State(state): State<AppState>) -> impl IntoResponse {
    let statuses: Vec<_> = state
        .providers
        .cloud_priority
        .iter()
        .map(|provider| json!({ "provider": provider, "circuit_state": format!("{:?}", state.breaker.state(provider)) }))
        .collect();
    Json(json!({ "providers": statuses }))
}

pub async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.settings.read().await.clone())
}

pub async fn post_settings(State(state): State<AppState>, Json(body): Json<Settings>) -> impl IntoResponse {
    if let Err(err) = body.persist(&state.settings_path) {
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }
    *state.settings.write().await = body;
    StatusCode::NO_CONTENT.into_response()
}

pub async fn get_settings_models(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "models": state.providers.model_table }))
}

pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    match state.tasks.list(None, 10_000, 0).await {
        Ok(tasks) => Json(task_stats(&tasks)).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    match state.tasks.list(None, 10_000, 0).await {
        Ok(tasks) => Json(json!({ "healthy": true, "stats": task_stats(&tasks) })).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

fn task_stats(tasks: &[Task]) -> serde_json::Value {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.status == TaskStatus::Completed).count();
    let failed = tasks.iter().filter(|t| t.status == TaskStatus::Failed).count();
    let in_progress = tasks.iter().filter(|t| matches!(t.status, TaskStatus::InProgress | TaskStatus::Validating | TaskStatus::Debating)).count();
    json!({ "total": total, "completed": completed, "failed": failed, "in_progress": in_progress })
}
