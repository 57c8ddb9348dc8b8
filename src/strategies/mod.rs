use std::sync::Arc;

use async_trait::async_trait;

use crate::actions::{ActionPort, LoggingActionPort};
use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::task::{TaskKind, TaskOutput, TaskRequest};

/// Category benchmark table and lookup port
pub mod benchmarks;
/// Market analysis, competitor monitoring, pricing and trend detection
pub mod market;
/// Revenue stream optimisation, funnel analysis and budget reallocation
pub mod revenue;

pub use benchmarks::{BenchmarkSource, StaticBenchmarks};
pub use market::MarketStrategy;
pub use revenue::RevenueStrategy;

/// Risk tolerance used when an agent's configured value is unusable
pub const DEFAULT_RISK_TOLERANCE: f64 = 0.5;

/// Per-call context handed to a strategy by the owning agent
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyContext {
    /// Agent running the task
    pub agent_id: String,
    /// The agent's risk tolerance (0..1)
    pub risk_tolerance: f64,
}

impl StrategyContext {
    /// Risk tolerance clamped to [0, 1]; non-finite values fall back to
    /// [`DEFAULT_RISK_TOLERANCE`]
    pub fn bounded_risk_tolerance(&self) -> f64 {
        if self.risk_tolerance.is_finite() {
            self.risk_tolerance.clamp(0.0, 1.0)
        } else {
            DEFAULT_RISK_TOLERANCE
        }
    }
}

/// Interface for the per-agent-type task handlers
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Returns the name of the strategy
    fn name(&self) -> &'static str;

    /// Task kinds [`Strategy::handle`] accepts; must match its dispatch exactly
    fn supported_task_types(&self) -> &'static [TaskKind];

    /// Human-readable capabilities beyond the task kinds
    fn specialized_capabilities(&self) -> Vec<String>;

    /// Runs the heuristic for one parsed request
    async fn handle(&self, request: TaskRequest, ctx: &StrategyContext) -> Result<TaskOutput>;

    /// Determines if this strategy supports the given task type tag
    fn supports(&self, task_type: &str) -> bool {
        self.supported_task_types()
            .iter()
            .any(|kind| kind.as_str() == task_type)
    }
}

/// Collaborators shared by every strategy the factory builds
#[derive(Clone)]
pub struct StrategyDeps {
    /// Side-effect port
    pub actions: Arc<dyn ActionPort>,
    /// Benchmark lookup port
    pub benchmarks: Arc<dyn BenchmarkSource>,
}

impl Default for StrategyDeps {
    fn default() -> Self {
        Self {
            actions: Arc::new(LoggingActionPort),
            benchmarks: Arc::new(StaticBenchmarks),
        }
    }
}

/// Factory for creating strategies from an agent type tag
pub struct StrategyFactory;

impl StrategyFactory {
    /// Agent type tags the factory knows
    pub const AGENT_TYPES: [&'static str; 2] = [MarketStrategy::AGENT_TYPE, RevenueStrategy::AGENT_TYPE];

    /// Creates the strategy registered for `agent_type`
    pub fn create_strategy(
        agent_type: &str,
        config: &Config,
        deps: &StrategyDeps,
    ) -> Result<Arc<dyn Strategy>> {
        match agent_type.trim().to_lowercase().as_str() {
            MarketStrategy::AGENT_TYPE => Ok(Arc::new(MarketStrategy::new(config, deps.actions.clone()))),
            RevenueStrategy::AGENT_TYPE => Ok(Arc::new(RevenueStrategy::new(
                config,
                deps.actions.clone(),
                deps.benchmarks.clone(),
            ))),
            other => Err(AgentError::Config(format!(
                "Unknown agent type: {}. Supported types: {}",
                other,
                Self::AGENT_TYPES.join(", ")
            ))),
        }
    }
}
