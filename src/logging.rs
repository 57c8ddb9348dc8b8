use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::{AgentError, Result};

/// Initializes the tracing subscriber with the specified log level
///
/// `RUST_LOG`, when set, takes precedence over `log_level`.
/// Valid log levels are: error, warn, info, debug, trace
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(parse_log_level(log_level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| AgentError::Config(format!("Failed to initialize logging: {}", e)))
}

/// Parses a log level string into a LevelFilter
///
/// Returns the corresponding LevelFilter, defaulting to Info for invalid strings
pub fn parse_log_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::OFF,
        "error" => LevelFilter::ERROR,
        "warn" => LevelFilter::WARN,
        "info" => LevelFilter::INFO,
        "debug" => LevelFilter::DEBUG,
        "trace" => LevelFilter::TRACE,
        _ => LevelFilter::INFO,
    }
}
