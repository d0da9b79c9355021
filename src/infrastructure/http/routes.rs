//! Route table wiring handlers to the REST surface described in
//! SPEC_FULL §6.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/tasks", post(handlers::submit_task).get(handlers::list_tasks))
        .route("/api/tasks/:id", get(handlers::get_task).delete(handlers::cancel_task))
        .route("/api/tasks/:id/subtasks", get(handlers::get_subtasks))
        .route("/api/tasks/:id/validation", get(handlers::get_validation))
        .route("/api/tasks/:id/debate", get(handlers::get_debate))
        .route("/api/tasks/:id/stream", get(handlers::stream_task))
        .route("/api/tasks/:id/chat", post(handlers::chat))
        .route("/api/agents", get(handlers::list_agents))
        .route("/api/agents/status", get(handlers::list_agents))
        .route("/api/agents/:id/memory", get(handlers::agent_memory))
        .route("/api/providers/status", get(handlers::providers_status))
        .route("/api/settings", get(handlers::get_settings).post(handlers::post_settings))
        .route("/api/settings/models", get(handlers::get_settings_models))
        .route("/api/stats", get(handlers::stats))
        .route("/api/status", get(handlers::status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
