use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::strategies::DEFAULT_RISK_TOLERANCE;

const DEFAULT_MAX_CONCURRENT_TASKS: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

fn default_max_concurrent_tasks() -> NonZeroUsize {
    DEFAULT_MAX_CONCURRENT_TASKS
}

fn default_performance_threshold() -> f64 {
    0.8
}

fn default_risk_tolerance() -> f64 {
    DEFAULT_RISK_TOLERANCE
}

/// Static configuration of one agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Unique agent identifier
    pub id: String,
    /// Strategy type tag (`market`, `revenue`)
    pub agent_type: String,
    /// Display name
    pub name: String,
    /// Higher wins when several agents could take a task
    #[serde(default)]
    pub priority: u32,
    /// Task type tags this agent claims to handle
    pub capabilities: Vec<String>,
    /// Upper bound on in-flight tasks
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: NonZeroUsize,
    /// Success rate below which the agent is flagged as underperforming
    #[serde(default = "default_performance_threshold")]
    pub performance_threshold: f64,
    /// Appetite for aggressive moves (0..1)
    #[serde(default = "default_risk_tolerance")]
    pub risk_tolerance: f64,
}

impl AgentConfig {
    /// Creates a configuration with default limits and no capabilities
    pub fn new(id: impl Into<String>, agent_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent_type: agent_type.into(),
            name: name.into(),
            priority: 0,
            capabilities: Vec::new(),
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            performance_threshold: default_performance_threshold(),
            risk_tolerance: default_risk_tolerance(),
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the capacity; 0 is raised to 1
    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = NonZeroUsize::new(max).unwrap_or(NonZeroUsize::MIN);
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_performance_threshold(mut self, threshold: f64) -> Self {
        self.performance_threshold = threshold;
        self
    }

    pub fn with_risk_tolerance(mut self, risk_tolerance: f64) -> Self {
        self.risk_tolerance = risk_tolerance;
        self
    }

    /// True if `task_type` is among the declared capabilities
    pub fn declares(&self, task_type: &str) -> bool {
        self.capabilities.iter().any(|c| c == task_type)
    }

    /// Checks ranges serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AgentError::Config("Agent id must not be empty".into()));
        }
        if self.capabilities.is_empty() {
            return Err(AgentError::Config(format!("Agent {} declares no capabilities", self.id)));
        }
        if !(0.0..=1.0).contains(&self.performance_threshold) {
            return Err(AgentError::Config(format!(
                "Agent {}: performance_threshold must be within [0, 1]",
                self.id
            )));
        }
        if !(0.0..=1.0).contains(&self.risk_tolerance) {
            return Err(AgentError::Config(format!(
                "Agent {}: risk_tolerance must be within [0, 1]",
                self.id
            )));
        }
        Ok(())
    }

    /// Merges every field present in `update`
    pub fn apply(&mut self, update: AgentConfigUpdate) {
        if let Some(agent_type) = update.agent_type {
            self.agent_type = agent_type;
        }
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(capabilities) = update.capabilities {
            self.capabilities = capabilities;
        }
        if let Some(max) = update.max_concurrent_tasks {
            self.max_concurrent_tasks = max;
        }
        if let Some(threshold) = update.performance_threshold {
            self.performance_threshold = threshold;
        }
        if let Some(risk) = update.risk_tolerance {
            self.risk_tolerance = risk;
        }
    }
}

/// Partial configuration; `None` fields are left untouched
///
/// The identifier is not updatable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfigUpdate {
    pub agent_type: Option<String>,
    pub name: Option<String>,
    pub priority: Option<u32>,
    pub capabilities: Option<Vec<String>>,
    pub max_concurrent_tasks: Option<NonZeroUsize>,
    pub performance_threshold: Option<f64>,
    pub risk_tolerance: Option<f64>,
}
