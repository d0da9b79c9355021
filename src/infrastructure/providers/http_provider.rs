//! Generic HTTP vendor adapter for [`LlmProvider`].
//!
//! Concrete vendor SDKs are out of scope; this adapter speaks the
//! OpenAI-compatible chat-completions wire shape that most cloud vendors
//! (including Google's and OpenRouter's compatibility endpoints) accept,
//! configured per-provider by `ProvidersConfig::endpoint_table`. Grounded
//! on the teacher's `infrastructure/claude/client.rs` rate-limited
//! `reqwest::Client` idiom.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::ports::llm_provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Message, ProviderError};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u64,
}

fn parse_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("length") => FinishReason::Length,
        Some("tool_calls") => FinishReason::ToolCalls,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

/// One HTTP-backed vendor; `provider_id` scopes circuit breaker state and
/// `endpoint`/`api_key` are resolved from config and the environment by
/// the router before constructing this adapter.
pub struct HttpLlmProvider {
    provider_id: String,
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpLlmProvider {
    pub fn new(provider_id: impl Into<String>, endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            provider_id: provider_id.into(),
            endpoint: endpoint.into(),
            api_key,
            client: reqwest::Client::builder().timeout(timeout).build().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn completion(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::Authentication);
        }
        if status.as_u16() == 429 {
            return Err(ProviderError::Quota);
        }
        if !status.is_success() {
            return Err(ProviderError::Http(format!("{} from {}", status, self.provider_id)));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| ProviderError::Http(e.to_string()))?;
        let choice = parsed.choices.into_iter().next().ok_or_else(|| ProviderError::Http("empty choices array".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content,
            finish_reason: parse_finish_reason(choice.finish_reason.as_deref()),
            tokens_used: parsed.usage.map(|u| u.total_tokens).unwrap_or(0),
            model: request.model,
        })
    }
}
