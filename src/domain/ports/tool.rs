//! Tool registry port.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool {0} not found")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("tool execution failed: {0}")]
    ExecutionFailed(String),
}

/// A callable exposed to agents during task execution. Vendor-agnostic:
/// `web_search` and `fetch_url` are built in, and embedding applications
/// register their own via [`crate::services::tool_registry::ToolRegistry::register`].
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;

    async fn call(&self, arguments: Value) -> Result<Value, ToolError>;
}
