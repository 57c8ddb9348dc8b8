//! Agents: admission control, task dispatch and completion bookkeeping.
//!
//! An [`Agent`] composes a shared bookkeeping core with one [`Strategy`].
//! Admission ([`Agent::assign_task`]) and release ([`Agent::complete_task`])
//! mutate the active-task set and the performance record under a single
//! per-agent lock, so concurrent assignments can never overshoot capacity and
//! concurrent completions never lose an update. No lock is held while a
//! strategy runs.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{AgentError, Result};
use crate::strategies::{Strategy, StrategyContext};
use crate::task::{Task, TaskOutput, TaskRequest, TaskStatus};

mod config;
pub mod performance;

pub use config::{AgentConfig, AgentConfigUpdate};
pub use performance::AgentPerformance;

#[derive(Debug)]
struct AgentState {
    config: AgentConfig,
    running: bool,
    active_tasks: HashSet<String>,
    performance: AgentPerformance,
}

impl AgentState {
    fn has_capacity(&self) -> bool {
        self.running && self.active_tasks.len() < self.config.max_concurrent_tasks.get()
    }
}

/// An admission-controlled worker running tasks through its strategy
pub struct Agent {
    id: String,
    strategy: Arc<dyn Strategy>,
    state: Mutex<AgentState>,
}

impl Agent {
    /// Creates a stopped agent
    ///
    /// Fails if the configuration is out of range or declares a task type the
    /// strategy cannot execute.
    pub fn new(config: AgentConfig, strategy: Arc<dyn Strategy>) -> Result<Self> {
        config.validate()?;
        if let Some(unsupported) = config.capabilities.iter().find(|c| !strategy.supports(c)) {
            return Err(AgentError::Config(format!(
                "Agent {} declares {} which the {} strategy cannot handle",
                config.id,
                unsupported,
                strategy.name()
            )));
        }

        Ok(Self {
            id: config.id.clone(),
            strategy,
            state: Mutex::new(AgentState {
                performance: AgentPerformance::new(config.id.clone()),
                config,
                running: false,
                active_tasks: HashSet::new(),
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the composed strategy
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Capabilities advertised by the strategy beyond task kinds
    pub fn specialized_capabilities(&self) -> Vec<String> {
        self.strategy.specialized_capabilities()
    }

    /// Makes the agent eligible for new admissions
    pub fn start(&self) {
        let mut state = self.state.lock();
        if !state.running {
            state.running = true;
            info!(agent_id = %self.id, name = %state.config.name, "Agent started");
        }
    }

    /// Stops new admissions; tasks already admitted keep running
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if state.running {
            state.running = false;
            info!(
                agent_id = %self.id,
                in_flight = state.active_tasks.len(),
                "Agent stopped"
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// True iff started and below capacity
    pub fn is_available(&self) -> bool {
        self.state.lock().has_capacity()
    }

    /// Number of tasks currently held
    pub fn active_task_count(&self) -> usize {
        self.state.lock().active_tasks.len()
    }

    /// Reserves a capacity slot for `task_id`.
    ///
    /// Returns `false` without touching any state when the agent is stopped or
    /// full. The check and the insert happen under one lock.
    pub fn assign_task(&self, task_id: &str) -> bool {
        let mut state = self.state.lock();
        if !state.has_capacity() {
            debug!(agent_id = %self.id, task_id, "Admission rejected");
            return false;
        }
        if !state.active_tasks.insert(task_id.to_string()) {
            // already held; a duplicate id must not take a second slot
            return false;
        }
        debug!(
            agent_id = %self.id,
            task_id,
            active = state.active_tasks.len(),
            "Task admitted"
        );
        true
    }

    /// Pure check of declared capability and strategy support
    pub fn can_handle_task(&self, task: &Task) -> bool {
        let declared = self.state.lock().config.declares(&task.task_type);
        declared && self.strategy.supports(&task.task_type)
    }

    /// Runs `task` through the strategy.
    ///
    /// Exactly one [`Agent::complete_task`] is recorded for every call, on
    /// success, on failure, and if the returned future is dropped before it
    /// finishes. Failures are logged and returned to the caller.
    pub async fn execute_task(&self, task: &mut Task) -> Result<TaskOutput> {
        let guard = CompletionGuard::new(self, task.id.clone());
        let ctx = self.context();

        let outcome: Result<(TaskOutput, Value)> = async {
            task.mark_processing()?;
            if !self.strategy.supports(&task.task_type) {
                return Err(AgentError::UnsupportedTaskType(task.task_type.clone()));
            }
            let request = TaskRequest::parse(&task.task_type, &task.payload)?;
            let output = self.strategy.handle(request, &ctx).await?;
            let value = serde_json::to_value(&output)?;
            Ok::<_, AgentError>((output, value))
        }
        .await;

        match outcome {
            Ok((output, value)) => {
                task.mark_completed(value)?;
                guard.finish(true, output.revenue_impact());
                Ok(output)
            }
            Err(err) => {
                warn!(
                    agent_id = %self.id,
                    task_id = %task.id,
                    task_type = %task.task_type,
                    error = %err,
                    "Task failed"
                );
                if task.status() == TaskStatus::Processing {
                    task.mark_failed(err.to_string())?;
                }
                guard.finish(false, None);
                Err(err)
            }
        }
    }

    /// Releases the slot held by `task_id` and folds the completion into the
    /// performance record.
    ///
    /// Calling this twice for one logical completion counts it twice;
    /// [`Agent::execute_task`] guarantees a single call.
    pub fn complete_task(&self, task_id: &str, success: bool, execution_time_ms: u64, revenue: Option<f64>) {
        let mut state = self.state.lock();
        if !state.active_tasks.remove(task_id) {
            debug!(agent_id = %self.id, task_id, "Completed task was not in the active set");
        }
        state.performance.record(success, execution_time_ms, revenue);
        debug!(
            agent_id = %self.id,
            task_id,
            success,
            execution_time_ms,
            success_rate = state.performance.success_rate,
            "Task completion recorded"
        );
    }

    /// Snapshot of the performance record
    pub fn get_performance(&self) -> AgentPerformance {
        self.state.lock().performance.clone()
    }

    /// Snapshot of the configuration
    pub fn get_config(&self) -> AgentConfig {
        self.state.lock().config.clone()
    }

    /// Merges the present fields of `update` into the configuration
    pub fn update_config(&self, update: AgentConfigUpdate) {
        let mut state = self.state.lock();
        state.config.apply(update);
        debug!(agent_id = %self.id, "Configuration updated");
    }

    /// True once at least one task finished and the success rate is below
    /// the configured threshold
    pub fn is_underperforming(&self) -> bool {
        let state = self.state.lock();
        state.performance.total_tasks() > 0
            && state.performance.success_rate < state.config.performance_threshold
    }

    fn context(&self) -> StrategyContext {
        let state = self.state.lock();
        StrategyContext {
            agent_id: self.id.clone(),
            risk_tolerance: state.config.risk_tolerance,
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("strategy", &self.strategy.name())
            .field("state", &*self.state.lock())
            .finish()
    }
}

/// Records exactly one completion for a task, even if execution is abandoned
struct CompletionGuard<'a> {
    agent: &'a Agent,
    task_id: String,
    started: Instant,
    finished: bool,
}

impl<'a> CompletionGuard<'a> {
    fn new(agent: &'a Agent, task_id: String) -> Self {
        Self {
            agent,
            task_id,
            started: Instant::now(),
            finished: false,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn finish(mut self, success: bool, revenue: Option<f64>) {
        self.finished = true;
        self.agent
            .complete_task(&self.task_id, success, self.elapsed_ms(), revenue);
    }
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                agent_id = %self.agent.id,
                task_id = %self.task_id,
                "Task abandoned before completion; recording failure"
            );
            self.agent
                .complete_task(&self.task_id, false, self.elapsed_ms(), None);
        }
    }
}
