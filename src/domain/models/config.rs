//! Application configuration (SPEC_FULL §10.3), grounded on the teacher's
//! `domain/models/config.rs` defaulting idiom.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::infrastructure::logging::config::LogConfig;

/// Top-level application configuration, loaded by
/// [`crate::infrastructure::config::loader::ConfigLoader`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LogConfig::default(),
            providers: ProvidersConfig::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            memory: MemoryConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Durable-store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_db_path() -> String {
    ".taskswarm/taskswarm.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

/// Per-provider credentials and the provider -> concrete model table
///.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Ordered by priority; `auto` picks the first entry here that is a
    /// cloud provider (not `local`).
    #[serde(default = "default_cloud_priority")]
    pub cloud_priority: Vec<String>,
    /// provider id -> concrete vendor model id.
    #[serde(default = "default_model_table")]
    pub model_table: HashMap<String, String>,
    /// provider id -> chat-completions endpoint URL.
    #[serde(default = "default_endpoint_table")]
    pub endpoint_table: HashMap<String, String>,
    /// provider id -> fallback provider id.
    #[serde(default = "default_fallback_table")]
    pub fallback_table: HashMap<String, String>,
    /// provider id -> API key env var name.
    #[serde(default = "default_credential_env_vars")]
    pub credential_env_vars: HashMap<String, String>,
    /// Local inference endpoint, excluded from `auto` resolution.
    pub local_endpoint: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            cloud_priority: default_cloud_priority(),
            model_table: default_model_table(),
            endpoint_table: default_endpoint_table(),
            fallback_table: default_fallback_table(),
            credential_env_vars: default_credential_env_vars(),
            local_endpoint: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_cloud_priority() -> Vec<String> {
    vec!["google".to_string(), "anthropic".to_string(), "openai".to_string()]
}

fn default_model_table() -> HashMap<String, String> {
    HashMap::from([
        ("google".to_string(), "gemini-1.5-pro".to_string()),
        ("anthropic".to_string(), "claude-3-5-sonnet-20241022".to_string()),
        ("openai".to_string(), "gpt-4o".to_string()),
        ("openrouter".to_string(), "openrouter/auto".to_string()),
    ])
}

fn default_endpoint_table() -> HashMap<String, String> {
    HashMap::from([
        ("google".to_string(), "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions".to_string()),
        ("anthropic".to_string(), "https://api.anthropic.com/v1/messages".to_string()),
        ("openai".to_string(), "https://api.openai.com/v1/chat/completions".to_string()),
        ("openrouter".to_string(), "https://openrouter.ai/api/v1/chat/completions".to_string()),
    ])
}

fn default_fallback_table() -> HashMap<String, String> {
    HashMap::from([
        ("google".to_string(), "anthropic".to_string()),
        ("anthropic".to_string(), "openai".to_string()),
        ("openai".to_string(), "openrouter".to_string()),
        ("openrouter".to_string(), "google".to_string()),
    ])
}

fn default_credential_env_vars() -> HashMap<String, String> {
    HashMap::from([
        ("google".to_string(), "GOOGLE_API_KEY".to_string()),
        ("anthropic".to_string(), "ANTHROPIC_API_KEY".to_string()),
        ("openai".to_string(), "OPENAI_API_KEY".to_string()),
        ("openrouter".to_string(), "OPENROUTER_API_KEY".to_string()),
    ])
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            half_open_max_calls: default_half_open_max_calls(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

fn default_half_open_max_calls() -> u32 {
    3
}

/// Memory manager tier URLs and compression thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub ephemeral_store_url: Option<String>,
    pub vector_store_url: Option<String>,
    #[serde(default = "default_compression_share")]
    pub compression_share: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            ephemeral_store_url: None,
            vector_store_url: None,
            compression_share: default_compression_share(),
        }
    }
}

fn default_compression_share() -> f32 {
    0.9
}

/// Orchestrator bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_max_rework_attempts")]
    pub max_rework_attempts: u32,
    #[serde(default = "default_max_parallel_agents")]
    pub max_parallel_agents: usize,
    #[serde(default)]
    pub quality_gate_enabled: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rework_attempts: default_max_rework_attempts(),
            max_parallel_agents: default_max_parallel_agents(),
            quality_gate_enabled: false,
        }
    }
}

fn default_max_rework_attempts() -> u32 {
    2
}

fn default_max_parallel_agents() -> usize {
    15
}

/// Tool registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub web_search_endpoint: Option<String>,
    pub web_search_api_key_env: Option<String>,
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_fetch_url_clip_chars")]
    pub fetch_url_clip_chars: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            web_search_endpoint: None,
            web_search_api_key_env: None,
            timeout_secs: default_tool_timeout_secs(),
            fetch_url_clip_chars: default_fetch_url_clip_chars(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

fn default_fetch_url_clip_chars() -> usize {
    10_000
}
