//! Unified LLM completion router.
//!
//! Grounded on `original_source/backend/llm/router.py`'s `SwarmOSRouter`:
//! symbolic-model resolution, provider-based static fallback, and
//! try/finally credential scoping around the vendor call, re-cut onto
//! this crate's `LlmProvider` port and [`CircuitBreakerService`] instead
//! of a LiteLLM `Router` instance.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::errors::{OrchestrationError, OrchestrationResult};
use crate::domain::models::config::ProvidersConfig;
use crate::domain::ports::llm_provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Message, ProviderError};
use crate::infrastructure::credentials::CredentialScope;
use crate::services::circuit_breaker::{CircuitBreakerService, CircuitCheckResult};

/// Visited-set bound on fallback-chain walking; the configured fallback
/// table is small and should never legitimately cycle this long.
const MAX_FALLBACK_HOPS: usize = 8;

pub struct LlmRouter {
    config: ProvidersConfig,
    breaker: Arc<CircuitBreakerService>,
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl LlmRouter {
    pub fn new(config: ProvidersConfig, breaker: Arc<CircuitBreakerService>, providers: HashMap<String, Arc<dyn LlmProvider>>) -> Self {
        Self { config, breaker, providers }
    }

    /// Resolves a symbolic `model` (`auto`, a bare provider id, or an
    /// already-resolved `provider/model` string) to `(provider_id,
    /// concrete_model_id)`.
    fn resolve_model(&self, model: &str) -> OrchestrationResult<(String, String)> {
        if let Some((provider, _)) = model.split_once('/') {
            return Ok((provider.to_string(), model.to_string()));
        }

        let provider = if model == "auto" {
            self.config
                .cloud_priority
                .first()
                .cloned()
                .ok_or_else(|| OrchestrationError::FatalPlan("no cloud providers configured for auto resolution".to_string()))?
        } else {
            model.to_string()
        };

        let concrete = self
            .config
            .model_table
            .get(&provider)
            .cloned()
            .ok_or_else(|| OrchestrationError::FatalPlan(format!("no model configured for provider {provider}")))?;

        Ok((provider, concrete))
    }

    /// Walks the static fallback chain starting at `provider`, returning
    /// the first provider whose circuit breaker currently allows calls.
    /// Falls back to `provider` itself if every hop is rejected (the
    /// caller will then see the failure directly from the vendor call).
    fn select_reachable_provider(&self, provider: &str) -> String {
        if self.breaker.check(provider) == CircuitCheckResult::Allowed {
            return provider.to_string();
        }

        let mut current = provider.to_string();
        let mut visited = std::collections::HashSet::new();
        visited.insert(current.clone());

        for _ in 0..MAX_FALLBACK_HOPS {
            let Some(next) = self.config.fallback_table.get(&current) else { break };
            if !visited.insert(next.clone()) {
                break;
            }
            if self.breaker.check(next) == CircuitCheckResult::Allowed {
                return next.clone();
            }
            current = next.clone();
        }
        provider.to_string()
    }

    fn provider_error_to_message(err: &ProviderError) -> String {
        err.to_string()
    }

    async fn call_provider(&self, provider_id: &str, request: CompletionRequest) -> OrchestrationResult<CompletionResponse> {
        let adapter = self
            .providers
            .get(provider_id)
            .ok_or_else(|| OrchestrationError::LlmCallFailed { provider: provider_id.to_string(), message: "no adapter registered".to_string() })?;

        let _credential_scope = CredentialScope::for_provider(&self.config.credential_env_vars, provider_id);

        match adapter.completion(request).await {
            Ok(response) => {
                self.breaker.record_success(provider_id);
                Ok(response)
            }
            Err(err) => {
                self.breaker.record_failure(provider_id);
                Err(OrchestrationError::LlmCallFailed { provider: provider_id.to_string(), message: Self::provider_error_to_message(&err) })
            }
        }
    }

    /// The router's single entry point. `request.model` is the symbolic
    /// model; the resolved vendor id is written back into the response
    /// model field by the underlying adapter.
    pub async fn completion(&self, mut request: CompletionRequest) -> OrchestrationResult<CompletionResponse> {
        let (provider, concrete_model) = self.resolve_model(&request.model)?;
        let provider = self.select_reachable_provider(&provider);
        request.model = concrete_model;

        let first = self.call_provider(&provider, request.clone()).await?;

        if first.finish_reason != FinishReason::Length {
            return Ok(first);
        }

        // Truncation recovery: one continuation call, concatenated.
        let mut continuation_messages = request.messages.clone();
        continuation_messages.push(Message::assistant(first.content.clone()));
        continuation_messages.push(Message::user("continue"));
        let continuation_request = CompletionRequest { messages: continuation_messages, ..request };

        let second = self.call_provider(&provider, continuation_request).await?;

        Ok(CompletionResponse {
            content: format!("{}{}", first.content, second.content),
            finish_reason: second.finish_reason,
            tokens_used: first.tokens_used + second.tokens_used,
            model: second.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::providers::MockLlmProvider;

    fn router_with(providers: HashMap<String, Arc<dyn LlmProvider>>) -> LlmRouter {
        LlmRouter::new(ProvidersConfig::default(), Arc::new(CircuitBreakerService::default()), providers)
    }

    #[tokio::test]
    async fn resolves_auto_to_highest_priority_cloud_provider() {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        providers.insert("google".to_string(), Arc::new(MockLlmProvider::new("google").with_response("hi from google")));
        let router = router_with(providers);

        let response = router.completion(CompletionRequest::new("auto", vec![Message::user("hello")])).await.unwrap();
        assert_eq!(response.content, "hi from google");
    }

    #[tokio::test]
    async fn already_resolved_model_with_slash_keeps_its_provider_prefix() {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        providers.insert("openrouter".to_string(), Arc::new(MockLlmProvider::new("openrouter").with_response("routed")));
        let router = router_with(providers);

        let response = router.completion(CompletionRequest::new("openrouter/anthropic/claude-3-opus", vec![Message::user("hi")])).await.unwrap();
        assert_eq!(response.content, "routed");
    }

    #[tokio::test]
    async fn open_circuit_substitutes_fallback_provider() {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        providers.insert("google".to_string(), Arc::new(MockLlmProvider::new("google").with_response("should not be used")));
        providers.insert("anthropic".to_string(), Arc::new(MockLlmProvider::new("anthropic").with_response("fallback response")));

        let breaker = Arc::new(CircuitBreakerService::default());
        for _ in 0..5 {
            breaker.record_failure("google");
        }
        let router = LlmRouter::new(ProvidersConfig::default(), breaker, providers);

        let response = router.completion(CompletionRequest::new("auto", vec![Message::user("hello")])).await.unwrap();
        assert_eq!(response.content, "fallback response");
    }

    #[tokio::test]
    async fn truncated_response_triggers_one_continuation_call() {
        use crate::domain::ports::llm_provider::FinishReason;

        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        providers.insert(
            "anthropic".to_string(),
            Arc::new(
                MockLlmProvider::new("anthropic")
                    .with_response_finishing("first half ", FinishReason::Length)
                    .with_response_finishing("second half", FinishReason::Stop),
            ),
        );
        let router = router_with(providers);

        let response = router.completion(CompletionRequest::new("anthropic", vec![Message::user("write a long essay")])).await.unwrap();
        assert_eq!(response.content, "first half second half");
        assert_eq!(response.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn provider_failure_becomes_llm_call_failed() {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        providers.insert("anthropic".to_string(), Arc::new(MockLlmProvider::new("anthropic").with_timeout_error()));
        let router = router_with(providers);

        let err = router.completion(CompletionRequest::new("anthropic", vec![Message::user("hi")])).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::LlmCallFailed { provider, .. } if provider == "anthropic"));
    }
}
