use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("database path cannot be empty")]
    EmptyDatabasePath,

    #[error("invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("invalid circuit breaker failure_threshold: {0}. Must be at least 1")]
    InvalidFailureThreshold(u32),

    #[error("invalid orchestrator max_parallel_agents: {0}. Must be at least 1")]
    InvalidMaxParallelAgents(usize),

    #[error("delegation agent_count bounds are inverted or empty")]
    InvalidAgentBounds,
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (`Serialized`)
    /// 2. `.taskswarm/config.yaml` (project config)
    /// 3. `.taskswarm/local.yaml` (project local overrides, optional)
    /// 4. Environment variables (`TASKSWARM_*` prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.taskswarm/) so multiple
    /// orchestrator instances can run against different projects on one
    /// machine.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".taskswarm/config.yaml"))
            .merge(Yaml::file(".taskswarm/local.yaml"))
            .merge(Env::prefixed("TASKSWARM_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, bypassing project discovery.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::InvalidFailureThreshold(config.circuit_breaker.failure_threshold));
        }

        if config.orchestrator.max_parallel_agents == 0 {
            return Err(ConfigError::InvalidMaxParallelAgents(config.orchestrator.max_parallel_agents));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.database.path, ".taskswarm/taskswarm.db");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("default config should be valid");
    }

    #[test]
    fn yaml_overrides_defaults() {
        let yaml = r"
database:
  path: /custom/path.db
  max_connections: 5
logging:
  level: debug
  format: pretty
orchestrator:
  max_parallel_agents: 8
";
        let config: Config = serde_yaml::from_str(yaml).expect("yaml should parse");
        assert_eq!(config.database.path, "/custom/path.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.orchestrator.max_parallel_agents, 8);
        ConfigLoader::validate(&config).expect("parsed config should be valid");
    }

    #[test]
    fn rejects_empty_database_path() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::EmptyDatabasePath)));
    }

    #[test]
    fn rejects_zero_failure_threshold() {
        let mut config = Config::default();
        config.circuit_breaker.failure_threshold = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidFailureThreshold(0))
        ));
    }

    #[test]
    fn hierarchical_merging_prefers_later_sources() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(base_file, "logging:\n  level: info\n  format: json").unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "logging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        use crate::infrastructure::logging::config::LogFormat;
        assert_eq!(config.logging.level, "debug", "override should win");
        assert!(
            matches!(config.logging.format, LogFormat::Json),
            "base value persists when not overridden"
        );
    }
}
