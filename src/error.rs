use std::io;
use thiserror::Error;

/// Custom result type alias for the crate
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur while admitting, executing, or configuring agents
#[derive(Debug, Error)]
pub enum AgentError {
    /// No handler exists for the task type
    #[error("Unsupported task type: {0}")]
    UnsupportedTaskType(String),

    /// The payload does not match the schema of its task type
    #[error("Invalid payload for {task_type}: {reason}")]
    InvalidPayload {
        /// Task type tag the payload was parsed against
        task_type: String,
        /// What was missing or malformed
        reason: String,
    },

    /// Pricing was requested without any competitor prices
    #[error("Insufficient competitor data")]
    InsufficientCompetitorData,

    /// A computation had no observations to work from
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A campaign reported zero cost, so its ROI is undefined
    #[error("Campaign {campaign_id} has zero cost")]
    ZeroCost {
        /// Offending campaign
        campaign_id: String,
    },

    /// Budget weights cannot be normalised when every campaign has zero potential
    #[error("Total optimization potential is zero")]
    ZeroTotalPotential,

    /// A numeric input was out of range or not finite
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Benchmark lookup failed; usually worth retrying
    #[error("Benchmark source unavailable: {0}")]
    BenchmarkUnavailable(String),

    /// A task was moved against its lifecycle
    #[error("Task {task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Task identifier
        task_id: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// The dispatcher found no running agent able to take the task
    #[error("No available agent for task type {0}")]
    NoAvailableAgent(String),

    /// An external action (budget update, price test, ...) failed
    #[error("Action failed: {0}")]
    Action(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing/serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AgentError {
    /// Shorthand for building an [`AgentError::InvalidPayload`]
    pub fn invalid_payload(task_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            task_type: task_type.into(),
            reason: reason.into(),
        }
    }

    /// Checks if this error is transient and retryable
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BenchmarkUnavailable(_) | Self::Io(_))
    }

    /// True for handler precondition violations
    pub fn is_computation_failure(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCompetitorData
                | Self::InsufficientData(_)
                | Self::ZeroCost { .. }
                | Self::ZeroTotalPotential
                | Self::InvalidInput(_)
        )
    }
}
