//! Taskswarm — a multi-agent task orchestration engine.
//!
//! Plans a team of specialized LLM agents for a natural-language task,
//! executes them with supervised quality control (critique, rework,
//! debate), and synthesizes a final answer. See the module docs on
//! [`domain`], [`services`], and [`infrastructure`] for the hexagonal
//! layering: pure models and ports, business logic, and adapters.

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{OrchestrationError, OrchestrationResult};
