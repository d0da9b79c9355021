//! Thin CLI layer over the orchestrator: task submission/inspection and
//! an HTTP `serve` command. Output formatting intentionally stays plain
//! (`--json` for machine consumption); the HTTP surface in
//! `infrastructure::http` is the primary API.

pub mod commands;
pub mod types;

pub use types::{Cli, Commands};
