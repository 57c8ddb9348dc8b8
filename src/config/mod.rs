use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agents::AgentConfig;
use crate::error::{AgentError, Result};
use crate::utils::RetryPolicy;

/// Main configuration struct for the application
///
/// Holds the agents to start, the retention bounds for strategy-owned state,
/// and the retry and parallelism limits used by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Default log level when `RUST_LOG` is unset
    pub log_level: String,
    /// Maximum retained optimisation records and observations per market
    pub history_limit: usize,
    /// How long cached market observations stay valid
    pub market_cache_ttl_secs: u64,
    /// Maximum number of markets held in the observation cache
    pub market_cache_capacity: usize,
    /// Retry policy for transient strategy-internal failures
    pub retry: RetryPolicy,
    /// Upper bound on tasks dispatched concurrently in one batch
    pub max_parallel_dispatch: usize,
    /// Agents to create at startup
    pub agents: Vec<AgentConfig>,
}

impl Config {
    /// Loads configuration from the default config file location
    ///
    /// If the config file doesn't exist, returns the default configuration.
    /// The config file is expected to be in TOML format.
    pub fn load() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AgentError::Config("Could not find config directory".into()))?;
        let config_path = config_dir.join("revenue-agents").join("config.toml");

        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::from_path(&config_path)
    }

    /// Loads and validates configuration from a TOML file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(AgentError::Config("history_limit must be at least 1".into()));
        }
        if self.market_cache_capacity == 0 {
            return Err(AgentError::Config("market_cache_capacity must be at least 1".into()));
        }
        if self.retry.attempts == 0 {
            return Err(AgentError::Config("retry.attempts must be at least 1".into()));
        }
        if self.max_parallel_dispatch == 0 {
            return Err(AgentError::Config("max_parallel_dispatch must be at least 1".into()));
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.id.as_str()) {
                return Err(AgentError::Config(format!("Duplicate agent id: {}", agent.id)));
            }
            agent.validate()?;
        }
        Ok(())
    }

    /// TTL of the market observation cache
    pub fn market_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.market_cache_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            history_limit: 100,
            market_cache_ttl_secs: 3600, // 1 hour
            market_cache_capacity: 256,
            retry: RetryPolicy::default(),
            max_parallel_dispatch: 8,
            agents: vec![
                AgentConfig::new("market-1", "market", "Market Intelligence Agent")
                    .with_capabilities([
                        "market_analysis",
                        "competitor_monitoring",
                        "dynamic_pricing",
                        "trend_detection",
                    ])
                    .with_max_concurrent_tasks(5)
                    .with_priority(2),
                AgentConfig::new("revenue-1", "revenue", "Revenue Optimization Agent")
                    .with_capabilities([
                        "revenue_optimization",
                        "conversion_analysis",
                        "budget_reallocation",
                    ])
                    .with_max_concurrent_tasks(3)
                    .with_priority(1),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agents.len(), 2);
    }

    #[test]
    fn test_partial_toml_uses_defaults() -> Result<()> {
        let config = Config::from_toml_str(
            r#"
            history_limit = 10

            [[agents]]
            id = "m"
            agent_type = "market"
            name = "Market"
            capabilities = ["dynamic_pricing"]
            max_concurrent_tasks = 2
            "#,
        )?;
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.agents[0].max_concurrent_tasks.get(), 2);
        assert_eq!(config.agents[0].risk_tolerance, 0.5);
        Ok(())
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let result = Config::from_toml_str(
            r#"
            [[agents]]
            id = "m"
            agent_type = "market"
            name = "Market"
            capabilities = ["dynamic_pricing"]
            max_concurrent_tasks = 0
            "#,
        );
        assert!(matches!(result, Err(AgentError::Toml(_))));
    }

    #[test]
    fn test_duplicate_agent_ids_are_rejected() {
        let mut config = Config::default();
        let first = config.agents[0].clone();
        config.agents.push(first);
        assert!(matches!(config.validate(), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_from_path() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "log_level = \"debug\"")?;
        let config = Config::from_path(file.path())?;
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.agents.len(), 2);
        Ok(())
    }
}
