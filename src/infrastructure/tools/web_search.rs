//! `web_search(query, max_results)` built-in tool.
//!
//! Concrete search vendor SDKs are out of scope; [`SearchVendor`] is the
//! vendor-agnostic seam, with one generic HTTP implementation configured
//! by endpoint + API key (spec's "fixed preference order" collapses to a
//! single configured vendor here; a model's native grounded-search tool
//! is the documented fallback when no vendor is configured).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::ports::tool::{Tool, ToolError};

/// One search result.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub score: Option<f32>,
}

/// A pluggable search backend. `GenericHttpSearchVendor` is the only
/// concrete implementation; other vendors plug in behind this trait
/// without the tool itself changing.
#[async_trait]
pub trait SearchVendor: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, String>;
}

#[derive(Debug, Deserialize)]
struct VendorResponse {
    results: Vec<SearchResult>,
}

/// Generic HTTP search vendor: posts `{query, max_results}` to a
/// configured endpoint and expects `{results: [...]}` back.
pub struct GenericHttpSearchVendor {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GenericHttpSearchVendor {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self { client, endpoint: endpoint.into(), api_key }
    }
}

#[async_trait]
impl SearchVendor for GenericHttpSearchVendor {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, String> {
        let mut builder = self.client.post(&self.endpoint).json(&json!({ "query": query, "max_results": max_results }));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("http {}", response.status()));
        }
        let parsed: VendorResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(parsed.results)
    }
}

pub struct WebSearchTool {
    vendor: Box<dyn SearchVendor>,
}

impl WebSearchTool {
    pub fn new(vendor: Box<dyn SearchVendor>) -> Self {
        Self { vendor }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web and returns an ordered list of {title, url, content, score} results."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "max_results": { "type": "integer", "minimum": 1 }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing required field `query`".to_string()))?;
        let max_results = arguments.get("max_results").and_then(Value::as_u64).unwrap_or(5) as u32;

        match self.vendor.search(query, max_results).await {
            Ok(results) => Ok(json!({ "results": results })),
            Err(e) => Ok(json!({ "error": e, "results": [] })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedVendor(Vec<SearchResult>);

    #[async_trait]
    impl SearchVendor for FixedVendor {
        async fn search(&self, _query: &str, _max_results: u32) -> Result<Vec<SearchResult>, String> {
            Ok(self.0.clone())
        }
    }

    struct FailingVendor;

    #[async_trait]
    impl SearchVendor for FailingVendor {
        async fn search(&self, _query: &str, _max_results: u32) -> Result<Vec<SearchResult>, String> {
            Err("vendor unreachable".to_string())
        }
    }

    #[tokio::test]
    async fn returns_results_as_structured_payload() {
        let vendor = FixedVendor(vec![SearchResult { title: "t".to_string(), url: "u".to_string(), content: Some("c".to_string()), score: Some(0.9) }]);
        let tool = WebSearchTool::new(Box::new(vendor));
        let result = tool.call(json!({ "query": "rust async traits" })).await.unwrap();
        assert_eq!(result["results"][0]["title"], "t");
    }

    #[tokio::test]
    async fn vendor_failure_becomes_structured_error_not_raised_err() {
        let tool = WebSearchTool::new(Box::new(FailingVendor));
        let result = tool.call(json!({ "query": "anything" })).await.unwrap();
        assert_eq!(result["error"], "vendor unreachable");
    }

    #[tokio::test]
    async fn missing_query_is_invalid_arguments() {
        let tool = WebSearchTool::new(Box::new(FixedVendor(vec![])));
        let err = tool.call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
