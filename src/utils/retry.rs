use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tracing::debug;

use crate::error::Result;

/// How often and how patiently transient failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Base delay; attempt `n` waits `n * delay_ms`
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 50,
        }
    }
}

/// Runs `f` until it succeeds, fails with a non-transient error, or the
/// policy's attempts are used up
pub async fn with_retry<F, Fut, T>(f: F, policy: RetryPolicy) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempts = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempts += 1;
                if !e.is_transient() || attempts >= policy.attempts {
                    return Err(e);
                }
                debug!("Retrying after transient failure (attempt {}): {}", attempts, e);
                sleep(Duration::from_millis(policy.delay_ms) * attempts).await;
            }
        }
    }
}
