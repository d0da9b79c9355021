//! Deterministic [`LlmProvider`] test double.
//!
//! Grounded on the teacher's `adapters/substrates/mock.rs` scripted-response
//! idiom: callers queue canned responses (or a fixed error) up front and
//! the mock replays them in order, recording every request it received.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ports::llm_provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider, ProviderError};

enum Scripted {
    Response(CompletionResponse),
    Error(fn() -> ProviderError),
}

pub struct MockLlmProvider {
    provider_id: String,
    queue: Mutex<VecDeque<Scripted>>,
    received: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmProvider {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self { provider_id: provider_id.into(), queue: Mutex::new(VecDeque::new()), received: Mutex::new(Vec::new()) }
    }

    /// Queue a successful response with `finish_reason: stop`.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.queue.lock().unwrap().push_back(Scripted::Response(CompletionResponse {
            content: content.into(),
            finish_reason: FinishReason::Stop,
            tokens_used: 100,
            model: "mock".to_string(),
        }));
        self
    }

    /// Queue a response with an explicit finish reason, e.g. to exercise
    /// truncation-recovery with `FinishReason::Length`.
    pub fn with_response_finishing(self, content: impl Into<String>, finish_reason: FinishReason) -> Self {
        self.queue.lock().unwrap().push_back(Scripted::Response(CompletionResponse {
            content: content.into(),
            finish_reason,
            tokens_used: 100,
            model: "mock".to_string(),
        }));
        self
    }

    pub fn with_timeout_error(self) -> Self {
        self.queue.lock().unwrap().push_back(Scripted::Error(|| ProviderError::Timeout));
        self
    }

    pub fn requests_received(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn completion(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        self.received.lock().unwrap().push(request.clone());
        let scripted = self.queue.lock().unwrap().pop_front();
        match scripted {
            Some(Scripted::Response(mut response)) => {
                response.model = request.model;
                Ok(response)
            }
            Some(Scripted::Error(make_err)) => Err(make_err()),
            None => Ok(CompletionResponse {
                content: "mock default response".to_string(),
                finish_reason: FinishReason::Stop,
                tokens_used: 10,
                model: request.model,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::llm_provider::Message;

    #[tokio::test]
    async fn replays_queued_responses_in_fifo_order() {
        let provider = MockLlmProvider::new("anthropic").with_response("first").with_response("second");
        let request = CompletionRequest::new("claude-3-5-sonnet-20241022", vec![Message::user("hi")]);

        let first = provider.completion(request.clone()).await.unwrap();
        assert_eq!(first.content, "first");
        let second = provider.completion(request).await.unwrap();
        assert_eq!(second.content, "second");
        assert_eq!(provider.requests_received(), 2);
    }

    #[tokio::test]
    async fn replays_queued_error() {
        let provider = MockLlmProvider::new("anthropic").with_timeout_error();
        let request = CompletionRequest::new("claude-3-5-sonnet-20241022", vec![Message::user("hi")]);
        let err = provider.completion(request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout));
    }
}
