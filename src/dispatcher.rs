//! Reference dispatcher: keeps a registry of agents, picks an available
//! capable one per task and runs batches with bounded parallelism.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::agents::{Agent, AgentPerformance};
use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::metrics::{
    Metrics, ADMISSION_RETRIES, AGENTS_RUNNING, TASKS_DISPATCHED, TASKS_FAILED, TASKS_REJECTED,
    TASKS_SUCCEEDED,
};
use crate::strategies::{StrategyDeps, StrategyFactory};
use crate::task::{Task, TaskOutput};

/// Successful execution of one task
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    /// Agent that ran the task
    pub agent_id: String,
    pub output: TaskOutput,
}

/// Final state of one task from a batch
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    /// The task in its terminal state (or still pending if never admitted)
    pub task: Task,
    /// Agent that ran the task, if one was found
    pub agent_id: Option<String>,
    pub output: Option<TaskOutput>,
    pub error: Option<String>,
}

/// Agent registry with filter-and-pick selection
#[derive(Clone)]
pub struct Dispatcher {
    agents: Arc<RwLock<Vec<Arc<Agent>>>>,
    metrics: Metrics,
    parallelism: Arc<Semaphore>,
}

impl Dispatcher {
    /// Creates an empty dispatcher
    pub fn new(config: &Config) -> Self {
        Self {
            agents: Arc::new(RwLock::new(Vec::new())),
            metrics: Metrics::new(),
            parallelism: Arc::new(Semaphore::new(config.max_parallel_dispatch.max(1))),
        }
    }

    /// Creates a dispatcher with one agent per configured entry, each with its
    /// own strategy instance
    pub fn from_config(config: &Config, deps: &StrategyDeps) -> Result<Self> {
        config.validate()?;
        let dispatcher = Self::new(config);
        for agent_config in &config.agents {
            let strategy = StrategyFactory::create_strategy(&agent_config.agent_type, config, deps)?;
            dispatcher.register(Arc::new(Agent::new(agent_config.clone(), strategy)?))?;
        }
        info!("Initialized {} agents", dispatcher.agents.read().len());
        Ok(dispatcher)
    }

    /// Adds an agent; ids must be unique
    pub fn register(&self, agent: Arc<Agent>) -> Result<()> {
        let mut agents = self.agents.write();
        if agents.iter().any(|a| a.id() == agent.id()) {
            return Err(AgentError::Config(format!("Duplicate agent id: {}", agent.id())));
        }
        debug!(agent_id = %agent.id(), strategy = agent.strategy_name(), "Agent registered");
        agents.push(agent);
        Ok(())
    }

    /// Registered agents in registration order
    pub fn agents(&self) -> Vec<Arc<Agent>> {
        self.agents.read().clone()
    }

    pub fn agent(&self, id: &str) -> Option<Arc<Agent>> {
        self.agents.read().iter().find(|a| a.id() == id).cloned()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn start_all(&self) {
        let agents = self.agents();
        for agent in &agents {
            agent.start();
        }
        self.metrics.set_gauge(AGENTS_RUNNING, agents.len() as f64).await;
    }

    /// Stops every agent; in-flight tasks finish normally
    pub async fn stop_all(&self) {
        for agent in self.agents() {
            agent.stop();
        }
        self.metrics.set_gauge(AGENTS_RUNNING, 0.0).await;
    }

    /// Available agents able to run `task`, best first: highest priority,
    /// then fewest active tasks, then registration order
    pub fn candidates(&self, task: &Task) -> Vec<Arc<Agent>> {
        let mut ranked: Vec<(u32, usize, usize, Arc<Agent>)> = self
            .agents
            .read()
            .iter()
            .enumerate()
            .filter(|(_, agent)| agent.is_available() && agent.can_handle_task(task))
            .map(|(order, agent)| {
                (agent.get_config().priority, agent.active_task_count(), order, agent.clone())
            })
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
        ranked.into_iter().map(|(_, _, _, agent)| agent).collect()
    }

    /// Picks an agent and reserves a slot on it for `task`.
    ///
    /// When a candidate fills up between selection and admission the next one
    /// is tried.
    pub async fn select_agent(&self, task: &Task) -> Result<Arc<Agent>> {
        for (attempt, agent) in self.candidates(task).into_iter().enumerate() {
            if attempt > 0 {
                self.metrics.increment(ADMISSION_RETRIES).await;
            }
            if agent.assign_task(&task.id) {
                return Ok(agent);
            }
        }
        self.metrics.increment(TASKS_REJECTED).await;
        Err(AgentError::NoAvailableAgent(task.task_type.clone()))
    }

    /// Selects an agent and runs `task` on it; execution failures are
    /// returned after being recorded by the agent
    pub async fn dispatch(&self, task: &mut Task) -> Result<Dispatched> {
        let agent = self.select_agent(task).await?;
        let output = self.run_on(&agent, task).await?;
        Ok(Dispatched {
            agent_id: agent.id().to_string(),
            output,
        })
    }

    /// Dispatches every task concurrently, at most `max_parallel_dispatch` at
    /// a time; reports come back in input order
    pub async fn dispatch_all(&self, tasks: Vec<Task>) -> Vec<DispatchReport> {
        join_all(tasks.into_iter().map(|task| self.dispatch_one(task))).await
    }

    /// Performance snapshots in registration order
    pub fn performance_report(&self) -> Vec<AgentPerformance> {
        self.agents.read().iter().map(|a| a.get_performance()).collect()
    }

    async fn dispatch_one(&self, mut task: Task) -> DispatchReport {
        let _permit = match self.parallelism.acquire().await {
            Ok(permit) => permit,
            Err(e) => return DispatchReport::failed(task, None, e.to_string()),
        };
        let agent = match self.select_agent(&task).await {
            Ok(agent) => agent,
            Err(e) => return DispatchReport::failed(task, None, e.to_string()),
        };
        let agent_id = Some(agent.id().to_string());
        match self.run_on(&agent, &mut task).await {
            Ok(output) => DispatchReport {
                task,
                agent_id,
                output: Some(output),
                error: None,
            },
            Err(e) => DispatchReport::failed(task, agent_id, e.to_string()),
        }
    }

    /// Runs an admitted task and records dispatch metrics
    async fn run_on(&self, agent: &Agent, task: &mut Task) -> Result<TaskOutput> {
        self.metrics.increment(TASKS_DISPATCHED).await;
        let was_underperforming = agent.is_underperforming();
        let started = Instant::now();
        let result = agent.execute_task(task).await;
        self.metrics
            .record_time(&format!("dispatch.{}", task.task_type), started.elapsed())
            .await;

        if !was_underperforming && agent.is_underperforming() {
            warn!(
                agent_id = %agent.id(),
                success_rate = agent.get_performance().success_rate,
                threshold = agent.get_config().performance_threshold,
                "Agent fell below its performance threshold"
            );
        }

        let outcome = if result.is_ok() { TASKS_SUCCEEDED } else { TASKS_FAILED };
        self.metrics.increment(outcome).await;
        result
    }
}

impl DispatchReport {
    fn failed(task: Task, agent_id: Option<String>, error: String) -> Self {
        Self {
            task,
            agent_id,
            output: None,
            error: Some(error),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("agents", &self.agents.read().len())
            .field("available_permits", &self.parallelism.available_permits())
            .finish()
    }
}
