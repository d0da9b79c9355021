//! Domain models
//!
//! Pure domain entities with business logic and validation rules.
//! These models are framework-agnostic and contain no infrastructure concerns.

pub mod agent;
pub mod config;
pub mod debate;
pub mod delegation;
pub mod memory;
pub mod query;
pub mod supervisor;
pub mod task;
pub mod validation;

pub use agent::{AgentResult, AgentRuntimeKind, AgentStatus, TaskContextExtension};
pub use config::{
    CircuitBreakerSettings, Config, DatabaseConfig, MemoryConfig, OrchestratorConfig,
    ProvidersConfig, ToolsConfig,
};
pub use debate::{Critique, DebatePhase, DebateState, Proposal, Rebuttal, ScoringWeights};
pub use delegation::{AgentPlan, Capability, DelegationPlan, ExecutionStrategy, MAX_AGENTS, MIN_AGENTS, STANDARD_ROLES};
pub use memory::{MemoryEntry, MemoryScope, StreamEvent};
pub use query::{ExecutionMode, QueryExpansion, COMPLEXITY_THRESHOLD, DEBATE_COMPLEXITY_THRESHOLD};
pub use supervisor::{Decision, ReworkInstructions, SupervisorCritique, DEFAULT_REWORK_THRESHOLD};
pub use task::{SubTask, SubTaskStatus, Task, TaskStatus, MAX_REWORK_ATTEMPTS};
pub use validation::{Severity, ValidationIssue, ValidationResult};
