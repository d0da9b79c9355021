//! Query Expander: scores query complexity and, for ambiguous or
//! multi-part queries, decomposes them into sub-queries, clarifying
//! questions, and suggested agent roles.

use serde::Deserialize;

use crate::domain::models::query::{ExecutionMode, QueryExpansion, COMPLEXITY_THRESHOLD, DEBATE_COMPLEXITY_THRESHOLD};
use crate::domain::ports::llm_provider::{CompletionRequest, Message};
use crate::services::extract_json_from_response;
use crate::services::llm_router::LlmRouter;

const CONJUNCTIONS: &[&str] = &["and", "or", "but", "also", "additionally", "as well as"];
const TEMPORAL_TERMS: &[&str] = &["then", "after", "before", "first", "next", "finally", "subsequently"];
const EVALUATIVE_VERBS: &[&str] = &["compare", "evaluate", "analyze", "assess", "critique", "recommend", "decide", "determine", "judge"];
const LONG_QUERY_WORD_COUNT: usize = 20;

const ROLE_KEYWORDS: &[(&str, &[&str])] = &[
    ("researcher", &["research", "find", "search", "investigate", "gather"]),
    ("analyst", &["compare", "evaluate", "analyze", "assess"]),
    ("coder", &["code", "implement", "build", "program"]),
    ("reviewer", &["review", "check", "verify", "validate"]),
    ("synthesizer", &["summarize", "synthesize", "combine", "conclude"]),
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Lexical heuristic: one pass counting conjunctions, temporal terms, and
/// evaluative verbs, plus a length bump for long queries. Four categories,
/// 0.15 each, starting from a 0.3 floor — yields `[0.3, 0.9]`.
fn heuristic_complexity(query: &str) -> f32 {
    let lowered = query.to_lowercase();
    let mut score: f32 = 0.3;
    if contains_any(&lowered, CONJUNCTIONS) {
        score += 0.15;
    }
    if contains_any(&lowered, TEMPORAL_TERMS) {
        score += 0.15;
    }
    if contains_any(&lowered, EVALUATIVE_VERBS) {
        score += 0.15;
    }
    if query.split_whitespace().count() > LONG_QUERY_WORD_COUNT {
        score += 0.15;
    }
    score.min(0.9)
}

fn suggested_roles_for(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    ROLE_KEYWORDS
        .iter()
        .filter(|(_, keywords)| contains_any(&lowered, keywords))
        .map(|(role, _)| (*role).to_string())
        .collect()
}

#[derive(Debug, Deserialize)]
struct RefinedComplexity {
    complexity: f32,
}

#[derive(Debug, Deserialize, Default)]
struct DecompositionResponse {
    #[serde(default)]
    clarifying_questions: Vec<String>,
    #[serde(default)]
    intent_hypotheses: Vec<String>,
    #[serde(default)]
    expanded_queries: Vec<String>,
}

/// Scores query complexity and expands ambiguous queries.
pub struct QueryExpander<'a> {
    router: &'a LlmRouter,
    provider: String,
}

impl<'a> QueryExpander<'a> {
    pub fn new(router: &'a LlmRouter, provider: impl Into<String>) -> Self {
        Self { router, provider: provider.into() }
    }

    pub async fn expand(&self, query: &str) -> QueryExpansion {
        let complexity = self.refine_complexity(query, heuristic_complexity(query)).await;

        if complexity < COMPLEXITY_THRESHOLD {
            return QueryExpansion::direct(query, complexity);
        }

        let decomposition = self.decompose(query).await;
        let requires_debate = complexity > DEBATE_COMPLEXITY_THRESHOLD;

        let mut suggested_agent_roles = Vec::new();
        for sub_query in &decomposition.expanded_queries {
            for role in suggested_roles_for(sub_query) {
                if !suggested_agent_roles.contains(&role) {
                    suggested_agent_roles.push(role);
                }
            }
        }

        QueryExpansion {
            original_query: query.to_string(),
            complexity_score: complexity,
            execution_mode: ExecutionMode::Decompose,
            expanded_queries: decomposition.expanded_queries,
            clarifying_questions: decomposition.clarifying_questions,
            intent_hypotheses: decomposition.intent_hypotheses,
            requires_debate,
            suggested_agent_roles,
        }
    }

    async fn refine_complexity(&self, query: &str, heuristic: f32) -> f32 {
        let prompt = format!(
            "Rate the complexity of the following query on a scale from 0 to 1, where 1 means \
             it needs multiple perspectives or steps to answer well. Respond with JSON \
             {{\"complexity\": x}}.\n\nQuery: {query}"
        );
        let request = CompletionRequest::new(&self.provider, vec![Message::user(prompt)]);
        match self.router.completion(request).await {
            Ok(response) => {
                let json_text = extract_json_from_response(&response.content);
                serde_json::from_str::<RefinedComplexity>(&json_text).map(|r| r.complexity.clamp(0.0, 1.0)).unwrap_or(heuristic)
            }
            Err(_) => heuristic,
        }
    }

    async fn decompose(&self, query: &str) -> DecompositionResponse {
        let prompt = format!(
            "The following query is ambiguous or multi-part. Produce clarifying questions, \
             intent hypotheses, and a list of focused sub-queries that together cover it. \
             Respond with JSON {{\"clarifying_questions\": [...], \"intent_hypotheses\": [...], \
             \"expanded_queries\": [...]}}.\n\nQuery: {query}"
        );
        let request = CompletionRequest::new(&self.provider, vec![Message::user(prompt)]);
        let fallback = || DecompositionResponse { expanded_queries: vec![query.to_string()], ..Default::default() };

        match self.router.completion(request).await {
            Ok(response) => {
                let json_text = extract_json_from_response(&response.content);
                serde_json::from_str(&json_text).unwrap_or_else(|_| fallback())
            }
            Err(_) => fallback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::llm_provider::LlmProvider;
    use crate::infrastructure::providers::MockLlmProvider;
    use crate::services::circuit_breaker::CircuitBreakerService;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn router_with(mock: MockLlmProvider) -> LlmRouter {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        providers.insert("openai".to_string(), Arc::new(mock));
        LlmRouter::new(crate::domain::models::config::ProvidersConfig::default(), Arc::new(CircuitBreakerService::default()), providers)
    }

    #[tokio::test]
    async fn simple_query_takes_direct_path() {
        let router = router_with(MockLlmProvider::new("openai").with_response(r#"{"complexity":0.3}"#));
        let expander = QueryExpander::new(&router, "openai");
        let expansion = expander.expand("capitalize the word hello").await;

        assert_eq!(expansion.execution_mode, ExecutionMode::Direct);
        assert_eq!(expansion.expanded_queries, vec!["capitalize the word hello"]);
        assert!(!expansion.requires_debate);
    }

    #[tokio::test]
    async fn exactly_threshold_complexity_takes_decompose_path() {
        let decomposition = r#"{"clarifying_questions":["which region?"],"intent_hypotheses":["market entry"],
            "expanded_queries":["research competitors in the target market","analyze pricing options"]}"#;
        let router = router_with(MockLlmProvider::new("openai").with_response(r#"{"complexity":0.4}"#).with_response(decomposition));
        let expander = QueryExpander::new(&router, "openai");
        let expansion = expander.expand("should we enter this market").await;

        assert_eq!(expansion.execution_mode, ExecutionMode::Decompose);
        assert_eq!(expansion.expanded_queries.len(), 2);
        assert!(expansion.suggested_agent_roles.contains(&"researcher".to_string()));
        assert!(expansion.suggested_agent_roles.contains(&"analyst".to_string()));
    }

    #[tokio::test]
    async fn high_complexity_requires_debate() {
        let decomposition = r#"{"clarifying_questions":[],"intent_hypotheses":[],"expanded_queries":["x"]}"#;
        let router = router_with(MockLlmProvider::new("openai").with_response(r#"{"complexity":0.85}"#).with_response(decomposition));
        let expander = QueryExpander::new(&router, "openai");
        let expansion = expander.expand("a deeply contested multi-part question").await;

        assert!(expansion.requires_debate);
    }

    #[tokio::test]
    async fn model_refinement_failure_falls_back_to_heuristic() {
        let router = router_with(MockLlmProvider::new("openai").with_timeout_error());
        let expander = QueryExpander::new(&router, "openai");
        let expansion = expander.expand("capitalize hello").await;

        assert_eq!(expansion.execution_mode, ExecutionMode::Direct);
    }
}
