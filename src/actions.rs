//! Outbound side effects requested by strategies.
//!
//! Strategies decide; the collaborator behind [`ActionPort`] acts. The default
//! [`LoggingActionPort`] only records the request, which is what the hosting
//! dashboard does today.

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::strategies::revenue::Optimization;

/// External actions a strategy may trigger after a successful computation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionPort: Send + Sync {
    /// Roll out the selected optimisation for a revenue stream
    async fn implement_optimization(&self, stream_id: &str, optimization: &Optimization) -> Result<()>;

    /// Start an A/B price test between the current and the proposed price
    async fn setup_price_test(&self, product_id: &str, current_price: f64, test_price: f64) -> Result<()>;

    /// Push a new budget for a campaign
    async fn update_campaign_budget(&self, campaign_id: &str, budget: f64) -> Result<()>;
}

/// Action port that logs each request and reports success
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingActionPort;

#[async_trait]
impl ActionPort for LoggingActionPort {
    async fn implement_optimization(&self, stream_id: &str, optimization: &Optimization) -> Result<()> {
        info!(
            stream_id,
            kind = ?optimization.kind,
            potential = optimization.potential_value,
            "Implementing revenue optimization"
        );
        Ok(())
    }

    async fn setup_price_test(&self, product_id: &str, current_price: f64, test_price: f64) -> Result<()> {
        info!(product_id, current_price, test_price, "Setting up price test");
        Ok(())
    }

    async fn update_campaign_budget(&self, campaign_id: &str, budget: f64) -> Result<()> {
        info!(campaign_id, budget, "Updating campaign budget");
        Ok(())
    }
}
