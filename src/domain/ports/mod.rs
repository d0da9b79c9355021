//! Domain ports (interfaces) for the orchestration engine.

pub mod llm_provider;
pub mod memory_repository;
pub mod task_repository;
pub mod tool;

pub use llm_provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Message, ProviderError,
    ToolSpec,
};
pub use memory_repository::{DurableMemoryStore, EphemeralStore, VectorStore};
pub use task_repository::TaskRepository;
pub use tool::{Tool, ToolError};
