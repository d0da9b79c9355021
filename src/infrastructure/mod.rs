//! Infrastructure layer
//!
//! Adapters for external systems, implementing the domain's ports:
//! - `database`: sqlite-backed durable task/memory store (sqlx)
//! - `memory`: in-process ephemeral KV/stream and vector stores
//! - `providers`: HTTP LLM vendor adapters
//! - `tools`: built-in web_search/fetch_url tools
//! - `http`: axum HTTP surface (task submission, SSE streams)
//! - `config`, `logging`, `credentials`: ambient stack

pub mod config;
pub mod credentials;
pub mod database;
pub mod http;
pub mod logging;
pub mod memory;
pub mod providers;
pub mod tools;
