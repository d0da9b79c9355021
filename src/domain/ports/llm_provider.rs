//! LLM provider port.
//!
//! Grounded on the teacher's `domain/ports/llm_substrate.rs` trait shape,
//! re-cut to a unified `completion(...)` signature.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One message in a chat-style completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

/// A named tool exposed to the model for tool-calling, if supported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Request shape accepted by [`LlmProvider::completion`], the router's
/// single entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub tools: Option<Vec<ToolSpec>>,
    pub stream: bool,
    pub response_format: Option<String>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 0.7,
            max_tokens: None,
            tools: None,
            stream: false,
            response_format: None,
        }
    }
}

/// Why a completion terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

/// Response returned by [`LlmProvider::completion`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub finish_reason: FinishReason,
    pub tokens_used: u64,
    pub model: String,
}

/// Errors a concrete vendor adapter may raise. The [`crate::services::
/// llm_router::LlmRouter`] folds all of these into a single
/// `LLMCallFailed` kind toward its own callers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to provider timed out")]
    Timeout,
    #[error("http error: {0}")]
    Http(String),
    #[error("authentication failed")]
    Authentication,
    #[error("quota exceeded")]
    Quota,
}

/// A concrete LLM vendor adapter. One implementation handles any number of
/// `model` strings (model resolution happens above this port, in the
/// router); a `MockLlmProvider` test double lives in
/// `infrastructure::providers::mock` for deterministic unit tests.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stable provider id, e.g. `"anthropic"`. Used as the circuit breaker
    /// scope key.
    fn provider_id(&self) -> &str;

    async fn completion(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;
}
