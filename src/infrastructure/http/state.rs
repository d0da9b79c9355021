//! Shared application state injected into every axum handler.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::models::config::ProvidersConfig;
use crate::services::circuit_breaker::CircuitBreakerService;
use crate::services::memory_manager::MemoryManager;
use crate::services::orchestrator::Orchestrator;
use crate::services::task_service::TaskService;

/// Per-provider model preference, persisted to `settings_path` as JSON.
/// `GET/POST /api/settings` round-trip this structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub preferred_models: HashMap<String, String>,
}

#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<TaskService>,
    pub orchestrator: Arc<Orchestrator>,
    pub memory: Arc<MemoryManager>,
    pub breaker: Arc<CircuitBreakerService>,
    pub providers: ProvidersConfig,
    pub settings: Arc<RwLock<Settings>>,
    pub settings_path: PathBuf,
}

impl AppState {
    pub fn new(tasks: Arc<TaskService>, orchestrator: Arc<Orchestrator>, memory: Arc<MemoryManager>, breaker: Arc<CircuitBreakerService>, providers: ProvidersConfig, settings_path: PathBuf) -> Self {
        let settings = Settings::load(&settings_path).unwrap_or_default();
        Self { tasks, orchestrator, memory, breaker, providers, settings: Arc::new(RwLock::new(settings)), settings_path }
    }
}

impl Settings {
    fn load(path: &PathBuf) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn persist(&self, path: &PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)
    }
}
