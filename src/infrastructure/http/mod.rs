//! Axum HTTP surface: the task API described in SPEC_FULL §6.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
