//! Domain error taxonomy for the orchestration engine.
//!
//! Mirrors the abstract error kinds named in the specification: each
//! variant is recoverable at a specific call site (router fallback,
//! tool-error payload, best-effort checkpoint, JSON-parse fallback,
//! rework loop, cancellation) and only `FatalPlan` or an explicit
//! propagation is meant to surface as a task failure.

use thiserror::Error;

/// Errors surfaced by the orchestration pipeline.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// A call to an LLM provider failed (timeout, HTTP error, auth, quota)
    /// and no fallback provider could absorb it.
    #[error("LLM call failed for provider {provider}: {message}")]
    LlmCallFailed { provider: String, message: String },

    /// A tool invocation failed. Tools themselves never raise this to their
    /// caller — it is used only where a caller chooses not to degrade.
    #[error("tool call failed for {tool}: {message}")]
    ToolCallFailed { tool: String, message: String },

    /// A durable-store checkpoint failed. Logged, never propagated as task
    /// failure; retained here for sites that want to observe it.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    /// Structured LLM output failed to parse as JSON and no regex/default
    /// fallback applied.
    #[error("failed to parse structured output: {0}")]
    ParseFailed(String),

    /// A quality gate scored below threshold; handled by the rework loop.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// The task was cancelled externally.
    #[error("task cancelled")]
    Cancelled,

    /// The plan was impossible to execute (e.g. no agents could be created).
    #[error("fatal planning error: {0}")]
    FatalPlan(String),
}

impl OrchestrationError {
    /// Whether this error kind should ever surface as a task transitioning
    /// to `failed`: only `FatalPlan` and an unhandled `Cancelled` do.
    pub fn is_task_fatal(&self) -> bool {
        matches!(self, Self::FatalPlan(_))
    }
}

/// Result alias used throughout the domain and service layers.
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

impl From<sqlx::Error> for OrchestrationError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceFailed(err.to_string())
    }
}

impl From<serde_json::Error> for OrchestrationError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseFailed(err.to_string())
    }
}
