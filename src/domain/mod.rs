//! Domain layer for the task orchestration engine.
//!
//! This module contains core business logic and domain models, framework
//! agnostic and independent of any infrastructure concern.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{OrchestrationError, OrchestrationResult};
