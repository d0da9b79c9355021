//! Tool Registry: a name -> callable map dispatched by name with
//! structured arguments, wrapping the built-in `web_search`/`fetch_url`
//! tools plus a `register` extension point for embedding applications.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::domain::ports::tool::Tool;

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Dispatches `name` with `arguments`. Tools never raise to their
    /// caller: a missing tool or a tool-level failure both become a
    /// structured `{"error": ...}` payload instead.
    pub async fn execute(&self, name: &str, arguments: Value) -> Value {
        let Some(tool) = self.tools.get(name) else {
            return json!({ "error": format!("tool {name} not found") });
        };
        match tool.call(arguments).await {
            Ok(value) => value,
            Err(err) => json!({ "error": err.to_string() }),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::domain::ports::tool::ToolError;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its arguments"
        }
        fn parameters_schema(&self) -> Value {
            json!({})
        }
        async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
            Ok(arguments)
        }
    }

    #[tokio::test]
    async fn dispatches_registered_tool_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let result = registry.execute("echo", json!({"a": 1})).await;
        assert_eq!(result, json!({"a": 1}));
    }

    #[tokio::test]
    async fn missing_tool_becomes_structured_error_not_panic() {
        let registry = ToolRegistry::new();
        let result = registry.execute("nonexistent", json!({})).await;
        assert!(result["error"].is_string());
    }
}
