//! Application services for the orchestration engine.

pub mod agent_runtime;
pub mod circuit_breaker;
pub mod context_truncation;
pub mod context_window;
pub mod debate_engine;
pub mod delegator;
pub mod llm_router;
pub mod memory_manager;
pub mod orchestrator;
pub mod query_expander;
pub mod quality_validator;
pub mod supervisor;
pub mod task_service;
pub mod tool_registry;

pub use agent_runtime::Agent;
pub use circuit_breaker::{CircuitBreakerConfig, CircuitBreakerService, CircuitCheckResult, CircuitState};
pub use context_truncation::{estimate_tokens, truncate_context_sections, truncate_section, truncate_to_token_budget, TruncationConfig};
pub use context_window::{model_context_window, ContextWindowCheck, ContextWindowGuard, ContextWindowGuardConfig};
pub use debate_engine::DebateEngine;
pub use delegator::Delegator;
pub use llm_router::LlmRouter;
pub use memory_manager::MemoryManager;
pub use orchestrator::Orchestrator;
pub use quality_validator::validate as validate_quality;
pub use query_expander::QueryExpander;
pub use supervisor::Supervisor;
pub use task_service::TaskService;
pub use tool_registry::ToolRegistry;

/// Extract a JSON object from LLM text output.
///
/// Handles markdown code blocks (```json...```) and JSON embedded in prose text.
pub fn extract_json_from_response(response: &str) -> String {
    let trimmed = response.trim();

    // Handle ```json ... ``` blocks
    if trimmed.starts_with("```json") {
        if let Some(end) = trimmed.rfind("```") {
            if end > 7 {
                return trimmed[7..end].trim().to_string();
            }
        }
    }

    // Handle ``` ... ``` blocks
    if trimmed.starts_with("```") {
        if let Some(end) = trimmed.rfind("```") {
            let start = if trimmed.starts_with("```\n") { 4 } else { 3 };
            if end > start {
                return trimmed[start..end].trim().to_string();
            }
        }
    }

    // If it already looks like a JSON object, use it directly
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return trimmed.to_string();
    }

    // Try to find a JSON object embedded in text
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                return trimmed[start..=end].to_string();
            }
        }
    }

    trimmed.to_string()
}
