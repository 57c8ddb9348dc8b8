#![doc = include_str!("../README.md")]
#![warn(clippy::all)]

//! Revenue Agents - capacity-bounded workers running pricing and revenue heuristics
//!
//! This library provides named agents that accept typed tasks, run them through a
//! per-type strategy and keep online performance statistics for each agent.
//!
//! ## Features
//! - Atomic per-agent admission control bounded by `max_concurrent_tasks`
//! - Exactly-once completion bookkeeping, even when execution is abandoned
//! - Market strategy: price analysis, competitor monitoring, dynamic pricing, trends
//! - Revenue strategy: stream optimisation, funnel analysis, budget reallocation
//! - Pluggable action and benchmark ports
//! - Reference dispatcher with bounded batch parallelism and metrics
//!
//! ## Usage
//! ```rust,ignore
//! use revenue_agents::{Config, Dispatcher, StrategyDeps, Task};
//! use serde_json::json;
//!
//! async fn example() -> revenue_agents::Result<()> {
//!     let config = Config::default();
//!     let dispatcher = Dispatcher::from_config(&config, &StrategyDeps::default())?;
//!     dispatcher.start_all().await;
//!
//!     let mut task = Task::new("conversion_analysis", json!({
//!         "funnel_id": "signup",
//!         "stages": {"purchase": {"visitors": 100, "conversions": 40}}
//!     }));
//!     let done = dispatcher.dispatch(&mut task).await?;
//!     println!("{} -> {:?}", done.agent_id, done.output);
//!     Ok(())
//! }
//! ```

/// Side-effect port used by strategies
pub mod actions;
/// Agents with admission control and performance bookkeeping
pub mod agents;
/// Bounded TTL cache for strategy-owned state
pub mod cache;
/// Configuration module for the application
pub mod config;
/// Reference dispatcher: agent registry, selection, batch dispatch
pub mod dispatcher;
/// Error handling types and utilities
pub mod error;
/// Logging configuration and utilities
pub mod logging;
/// Metrics collection and reporting
pub mod metrics;
/// Numeric helpers shared by the strategies
pub mod numeric;
/// Per-agent-type task handlers
pub mod strategies;
/// Tasks, typed payloads and typed results
pub mod task;
/// Utilities (retry helpers)
pub mod utils;

// Re-export common types
pub use actions::{ActionPort, LoggingActionPort};
pub use agents::{Agent, AgentConfig, AgentConfigUpdate, AgentPerformance};
pub use config::Config;
pub use dispatcher::{DispatchReport, Dispatched, Dispatcher};
pub use error::{AgentError, Result};
pub use strategies::{Strategy, StrategyContext, StrategyDeps, StrategyFactory};
pub use task::{Task, TaskKind, TaskOutput, TaskPriority, TaskRequest, TaskStatus};
