//! Tasks and their typed payloads and results.
//!
//! A [`Task`] arrives with a string type tag and an opaque JSON payload. Before
//! any handler runs, the pair is parsed into a [`TaskRequest`], so a missing or
//! malformed field is reported as [`AgentError::InvalidPayload`] at dispatch
//! time rather than somewhere inside a heuristic.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::strategies::market::{
    CompetitorMonitoringRequest, CompetitorReport, MarketAnalysisRequest, MarketReport,
    PricingDecision, PricingRequest, TrendDetectionRequest, TrendReport,
};
use crate::strategies::revenue::{
    BudgetPlan, BudgetReallocationRequest, ConversionAnalysisRequest, FunnelAnalysis,
    OptimizationOutcome, RevenueOptimizationRequest,
};

/// Closed set of task type tags understood by the built-in strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Summarise a price series for one market
    MarketAnalysis,
    /// Compare our price against competitors
    CompetitorMonitoring,
    /// Compute an optimal price inside the competitor band
    DynamicPricing,
    /// Detect a trend over cached market observations
    TrendDetection,
    /// Pick the best optimisation for a revenue stream
    RevenueOptimization,
    /// Per-stage funnel conversion and bottlenecks
    ConversionAnalysis,
    /// Redistribute budget across campaigns
    BudgetReallocation,
}

impl TaskKind {
    /// Every task kind, in declaration order
    pub const ALL: [TaskKind; 7] = [
        TaskKind::MarketAnalysis,
        TaskKind::CompetitorMonitoring,
        TaskKind::DynamicPricing,
        TaskKind::TrendDetection,
        TaskKind::RevenueOptimization,
        TaskKind::ConversionAnalysis,
        TaskKind::BudgetReallocation,
    ];

    /// The wire tag for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::MarketAnalysis => "market_analysis",
            TaskKind::CompetitorMonitoring => "competitor_monitoring",
            TaskKind::DynamicPricing => "dynamic_pricing",
            TaskKind::TrendDetection => "trend_detection",
            TaskKind::RevenueOptimization => "revenue_optimization",
            TaskKind::ConversionAnalysis => "conversion_analysis",
            TaskKind::BudgetReallocation => "budget_reallocation",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        TaskKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AgentError::UnsupportedTaskType(s.to_string()))
    }
}

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet picked up
    #[default]
    Pending,
    /// Held by an agent
    Processing,
    /// Finished with a result
    Completed,
    /// Finished with an error
    Failed,
}

impl TaskStatus {
    /// True for `Completed` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Scheduling hint for the dispatcher; agents ignore it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A unit of work handed from the dispatcher to an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Type tag, matched against agent capabilities
    #[serde(rename = "type")]
    pub task_type: String,
    /// Opaque payload, validated per type at dispatch
    #[serde(default)]
    pub payload: Value,
    /// Scheduling priority
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl Task {
    /// Creates a pending task with a fresh identifier
    pub fn new(task_type: impl Into<String>, payload: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_type: task_type.into(),
            payload,
            priority: TaskPriority::default(),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Sets the scheduling priority
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Overrides the generated identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Result map of a completed task
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Error message of a failed task
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `pending -> processing`
    pub fn mark_processing(&mut self) -> Result<()> {
        self.transition(TaskStatus::Pending, TaskStatus::Processing)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `processing -> completed`
    pub fn mark_completed(&mut self, result: Value) -> Result<()> {
        self.transition(TaskStatus::Processing, TaskStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        self.result = Some(result);
        Ok(())
    }

    /// `processing -> failed`
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<()> {
        self.transition(TaskStatus::Processing, TaskStatus::Failed)?;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
        Ok(())
    }

    fn transition(&mut self, expected: TaskStatus, next: TaskStatus) -> Result<()> {
        if self.status != expected {
            return Err(AgentError::InvalidTransition {
                task_id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// A task payload parsed against the schema of its type
#[derive(Debug, Clone, PartialEq)]
pub enum TaskRequest {
    MarketAnalysis(MarketAnalysisRequest),
    CompetitorMonitoring(CompetitorMonitoringRequest),
    DynamicPricing(PricingRequest),
    TrendDetection(TrendDetectionRequest),
    RevenueOptimization(RevenueOptimizationRequest),
    ConversionAnalysis(ConversionAnalysisRequest),
    BudgetReallocation(BudgetReallocationRequest),
}

impl TaskRequest {
    /// Parses a type tag and payload; unknown tags are unsupported task types
    pub fn parse(task_type: &str, payload: &Value) -> Result<Self> {
        let kind: TaskKind = task_type.parse()?;
        let request = match kind {
            TaskKind::MarketAnalysis => TaskRequest::MarketAnalysis(decode(kind, payload)?),
            TaskKind::CompetitorMonitoring => {
                TaskRequest::CompetitorMonitoring(decode(kind, payload)?)
            }
            TaskKind::DynamicPricing => TaskRequest::DynamicPricing(decode(kind, payload)?),
            TaskKind::TrendDetection => TaskRequest::TrendDetection(decode(kind, payload)?),
            TaskKind::RevenueOptimization => {
                TaskRequest::RevenueOptimization(decode(kind, payload)?)
            }
            TaskKind::ConversionAnalysis => TaskRequest::ConversionAnalysis(decode(kind, payload)?),
            TaskKind::BudgetReallocation => TaskRequest::BudgetReallocation(decode(kind, payload)?),
        };
        Ok(request)
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            TaskRequest::MarketAnalysis(_) => TaskKind::MarketAnalysis,
            TaskRequest::CompetitorMonitoring(_) => TaskKind::CompetitorMonitoring,
            TaskRequest::DynamicPricing(_) => TaskKind::DynamicPricing,
            TaskRequest::TrendDetection(_) => TaskKind::TrendDetection,
            TaskRequest::RevenueOptimization(_) => TaskKind::RevenueOptimization,
            TaskRequest::ConversionAnalysis(_) => TaskKind::ConversionAnalysis,
            TaskRequest::BudgetReallocation(_) => TaskKind::BudgetReallocation,
        }
    }
}

fn decode<T: DeserializeOwned>(kind: TaskKind, payload: &Value) -> Result<T> {
    serde_json::from_value(payload.clone())
        .map_err(|e| AgentError::invalid_payload(kind.as_str(), e.to_string()))
}

/// Result of a successfully executed task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum TaskOutput {
    MarketAnalysis(MarketReport),
    CompetitorMonitoring(CompetitorReport),
    DynamicPricing(PricingDecision),
    TrendDetection(TrendReport),
    RevenueOptimization(OptimizationOutcome),
    ConversionAnalysis(FunnelAnalysis),
    BudgetReallocation(BudgetPlan),
}

impl TaskOutput {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskOutput::MarketAnalysis(_) => TaskKind::MarketAnalysis,
            TaskOutput::CompetitorMonitoring(_) => TaskKind::CompetitorMonitoring,
            TaskOutput::DynamicPricing(_) => TaskKind::DynamicPricing,
            TaskOutput::TrendDetection(_) => TaskKind::TrendDetection,
            TaskOutput::RevenueOptimization(_) => TaskKind::RevenueOptimization,
            TaskOutput::ConversionAnalysis(_) => TaskKind::ConversionAnalysis,
            TaskOutput::BudgetReallocation(_) => TaskKind::BudgetReallocation,
        }
    }

    /// Revenue credited to the agent when this output is recorded
    pub fn revenue_impact(&self) -> Option<f64> {
        match self {
            TaskOutput::RevenueOptimization(OptimizationOutcome::Applied { optimization, .. }) => {
                Some(optimization.potential_value)
            }
            _ => None,
        }
    }
}
