//! Taskswarm CLI/server entry point.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use taskswarm::cli::{commands, Cli, Commands};
use taskswarm::domain::ports::llm_provider::LlmProvider;
use taskswarm::infrastructure::config::ConfigLoader;
use taskswarm::infrastructure::database::{DatabaseConnection, MemoryRepositoryImpl, TaskRepositoryImpl};
use taskswarm::infrastructure::http::AppState;
use taskswarm::infrastructure::logging::LoggerImpl;
use taskswarm::infrastructure::memory::{InMemoryEphemeralStore, InMemoryVectorStore};
use taskswarm::infrastructure::providers::HttpLlmProvider;
use taskswarm::infrastructure::tools::{FetchUrlTool, GenericHttpSearchVendor, WebSearchTool};
use taskswarm::services::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerService};
use taskswarm::services::llm_router::LlmRouter;
use taskswarm::services::memory_manager::MemoryManager;
use taskswarm::services::orchestrator::Orchestrator;
use taskswarm::services::task_service::TaskService;
use taskswarm::services::tool_registry::ToolRegistry;

fn build_providers(config: &taskswarm::domain::models::config::ProvidersConfig) -> HashMap<String, Arc<dyn LlmProvider>> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();

    for (provider_id, endpoint) in &config.endpoint_table {
        let api_key = config.credential_env_vars.get(provider_id).and_then(|var| std::env::var(var).ok());
        providers.insert(provider_id.clone(), Arc::new(HttpLlmProvider::new(provider_id.clone(), endpoint.clone(), api_key, timeout)));
    }

    if let Some(endpoint) = &config.local_endpoint {
        providers.insert("local".to_string(), Arc::new(HttpLlmProvider::new("local", endpoint.clone(), None, timeout)));
    }

    providers
}

fn build_tool_registry(config: &taskswarm::domain::models::config::ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let client = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build().unwrap_or_default();

    if let Some(endpoint) = &config.web_search_endpoint {
        let api_key = config.web_search_api_key_env.as_ref().and_then(|var| std::env::var(var).ok());
        let vendor = GenericHttpSearchVendor::new(client.clone(), endpoint.clone(), api_key);
        registry.register(Arc::new(WebSearchTool::new(Box::new(vendor))));
    }

    registry.register(Arc::new(FetchUrlTool::new(client, config.fetch_url_clip_chars)));
    registry
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConfigLoader::load().context("failed to load configuration")?;
    let _logger = LoggerImpl::init(&config.logging).context("failed to initialize logging")?;

    let database_url = format!("sqlite:{}", config.database.path);
    let db = DatabaseConnection::new(&database_url).await.context("failed to connect to database")?;
    db.migrate().await.context("failed to run database migrations")?;

    let task_repo = Arc::new(TaskRepositoryImpl::new(db.pool().clone()));
    let memory_repo = Arc::new(MemoryRepositoryImpl::new(db.pool().clone()));

    let breaker = Arc::new(CircuitBreakerService::new(CircuitBreakerConfig {
        failure_threshold: config.circuit_breaker.failure_threshold,
        recovery_timeout: Duration::from_secs(config.circuit_breaker.recovery_timeout_secs),
        half_open_max_calls: config.circuit_breaker.half_open_max_calls,
    }));
    let providers = build_providers(&config.providers);
    let router = Arc::new(LlmRouter::new(config.providers.clone(), breaker.clone(), providers));

    let tools = Arc::new(build_tool_registry(&config.tools));
    let ephemeral = Arc::new(InMemoryEphemeralStore::new());
    let vector = Arc::new(InMemoryVectorStore::default());
    let memory = Arc::new(MemoryManager::new(ephemeral.clone(), vector, memory_repo));

    let orchestrator = Arc::new(Orchestrator::with_config(
        task_repo.clone(),
        router.clone(),
        tools.clone(),
        config.providers.cloud_priority.clone(),
        config.orchestrator.clone(),
    ));
    let tasks = Arc::new(TaskService::new(task_repo, ephemeral, router, tools, orchestrator.clone()));

    match cli.command {
        Commands::Submit { description, provider, no_execute } => {
            commands::handle_submit(&tasks, description, provider, !no_execute, cli.json).await?;
        }
        Commands::Get { task_id } => {
            commands::handle_get(&tasks, task_id, cli.json).await?;
        }
        Commands::List { status, limit } => {
            commands::handle_list(&tasks, status, limit, cli.json).await?;
        }
        Commands::Cancel { task_id } => {
            commands::handle_cancel(&tasks, task_id, cli.json).await?;
        }
        Commands::Serve { bind } => {
            let settings_path = std::path::PathBuf::from(".taskswarm/settings.json");
            let state = AppState::new(tasks, orchestrator, memory, breaker, config.providers, settings_path);
            commands::handle_serve(state, bind).await?;
        }
    }

    Ok(())
}
