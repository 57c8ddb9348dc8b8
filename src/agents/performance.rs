//! Online performance statistics for one agent.
//!
//! Every figure is updated incrementally from the previous snapshot; nothing
//! is recomputed from a replay of past completions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Running statistics for one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    /// Owning agent
    pub agent_id: String,
    /// Successful completions
    pub tasks_completed: u64,
    /// Failed completions
    pub tasks_failed: u64,
    /// Running mean over every recorded completion, in milliseconds
    pub average_execution_time: f64,
    /// `tasks_completed / (tasks_completed + tasks_failed)`, 0 before any completion
    pub success_rate: f64,
    /// Accumulated revenue; never decreases
    pub revenue_generated: f64,
    /// Time of the most recent completion (creation time before that)
    pub last_activity: DateTime<Utc>,
    /// Derived score, see [`AgentPerformance::record`]
    pub efficiency: f64,
}

impl AgentPerformance {
    /// Empty record for a freshly created agent
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            tasks_completed: 0,
            tasks_failed: 0,
            average_execution_time: 0.0,
            success_rate: 0.0,
            revenue_generated: 0.0,
            last_activity: Utc::now(),
            efficiency: 0.0,
        }
    }

    /// Number of recorded completions, successful or not
    pub fn total_tasks(&self) -> u64 {
        self.tasks_completed + self.tasks_failed
    }

    /// Folds one completion into the record.
    ///
    /// Efficiency is `tasks_completed / max(1, execution_time_ms / 60000) *
    /// success_rate`, using this completion's time only rather than any
    /// windowed aggregate, so it swings with whichever task finished last.
    /// Revenue is added only for successes with a positive, finite amount.
    pub fn record(&mut self, success: bool, execution_time_ms: u64, revenue: Option<f64>) {
        self.last_activity = Utc::now();
        if success {
            self.tasks_completed += 1;
        } else {
            self.tasks_failed += 1;
        }

        let n = self.total_tasks() as f64;
        let time = execution_time_ms as f64;
        self.average_execution_time = (self.average_execution_time * (n - 1.0) + time) / n;
        self.success_rate = self.tasks_completed as f64 / n;

        let minutes = (time / 60_000.0).max(1.0);
        self.efficiency = (self.tasks_completed as f64 / minutes) * self.success_rate;

        if success {
            if let Some(amount) = revenue.filter(|r| r.is_finite() && *r > 0.0) {
                self.revenue_generated += amount;
            }
        }
    }
}
