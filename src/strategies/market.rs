//! Market strategy: price series analysis, competitor monitoring, dynamic
//! pricing and trend detection.
//!
//! Observed price series are kept per market in a bounded TTL [`Cache`], each
//! series trimmed to the configured history limit.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Strategy, StrategyContext};
use crate::actions::ActionPort;
use crate::cache::Cache;
use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::numeric::{all_finite, mean, min_max, round4, round_cents, safe_ratio, std_dev};
use crate::task::{TaskKind, TaskOutput, TaskRequest};

/// Relative move between halves/averages below which a trend is `Stable`
const TREND_BAND: f64 = 0.02;
/// Competitors this far below our price raise an undercut alert
const UNDERCUT_MARGIN: f64 = 0.10;
/// Weight of the competitor average in the final price
const COMPETITOR_ANCHOR: f64 = 0.3;
/// Price changes at least this large (percent) get an A/B price test
const PRICE_TEST_THRESHOLD_PCT: f64 = 1.0;

fn default_window() -> usize {
    5
}

/// Direction of a price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl Trend {
    fn between(earlier: f64, later: f64) -> Self {
        let change = safe_ratio(later - earlier, earlier);
        if change > TREND_BAND {
            Trend::Rising
        } else if change < -TREND_BAND {
            Trend::Falling
        } else {
            Trend::Stable
        }
    }
}

/// Payload of `market_analysis`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysisRequest {
    pub market: String,
    /// Observed prices, oldest first
    pub prices: Vec<f64>,
    /// Traded volume per observation, if known
    #[serde(default)]
    pub volumes: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketReport {
    pub market: String,
    pub average_price: f64,
    /// Coefficient of variation of the supplied prices
    pub volatility: f64,
    pub trend: Trend,
    pub sample_size: usize,
    pub total_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorPrice {
    pub competitor: String,
    pub price: f64,
}

/// Payload of `competitor_monitoring`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorMonitoringRequest {
    pub product_id: String,
    pub own_price: f64,
    pub competitors: Vec<CompetitorPrice>,
}

/// Where our price sits relative to the competitor range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPosition {
    Lowest,
    Competitive,
    Highest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorReport {
    pub product_id: String,
    pub own_price: f64,
    pub average_competitor_price: f64,
    /// `(own - average) / average`, in percent
    pub price_gap_pct: f64,
    pub position: MarketPosition,
    /// Competitors pricing more than 10% below us
    pub undercutting: Vec<String>,
}

/// Payload of `dynamic_pricing`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRequest {
    pub product_id: String,
    pub current_price: f64,
    /// Demand index; 1.0 is baseline demand
    pub demand: f64,
    /// Price elasticity of demand (magnitude is used)
    pub elasticity: f64,
    pub competitor_prices: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingDecision {
    pub product_id: String,
    pub current_price: f64,
    /// Always within `[lower_bound, upper_bound]`
    pub optimal_price: f64,
    /// `min(competitors) * 0.9`
    pub lower_bound: f64,
    /// `max(competitors) * 1.2`
    pub upper_bound: f64,
    pub change_pct: f64,
    pub price_test_scheduled: bool,
}

/// Payload of `trend_detection`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendDetectionRequest {
    pub market: String,
    /// Number of most recent observations in the short average
    #[serde(default = "default_window")]
    pub window: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub market: String,
    pub window: usize,
    pub short_average: f64,
    pub long_average: f64,
    pub trend: Trend,
    pub observations: usize,
}

/// Strategy for `market` agents
pub struct MarketStrategy {
    observations: Cache<Vec<f64>>,
    history_limit: usize,
    actions: Arc<dyn ActionPort>,
}

impl MarketStrategy {
    pub const AGENT_TYPE: &'static str = "market";

    const TASK_TYPES: &'static [TaskKind] = &[
        TaskKind::MarketAnalysis,
        TaskKind::CompetitorMonitoring,
        TaskKind::DynamicPricing,
        TaskKind::TrendDetection,
    ];

    pub fn new(config: &Config, actions: Arc<dyn ActionPort>) -> Self {
        Self {
            observations: Cache::new(config.market_cache_ttl(), config.market_cache_capacity),
            history_limit: config.history_limit,
            actions,
        }
    }

    /// Cached observations for `market`, oldest first
    pub async fn observations(&self, market: &str) -> Option<Vec<f64>> {
        self.observations.get(market).await
    }

    async fn analyze_market(&self, req: MarketAnalysisRequest) -> Result<MarketReport> {
        if req.prices.is_empty() {
            return Err(AgentError::InsufficientData(format!(
                "no prices supplied for market {}",
                req.market
            )));
        }
        if !all_finite(&req.prices) || req.prices.iter().any(|p| *p <= 0.0) {
            return Err(AgentError::InvalidInput("prices must be positive and finite".into()));
        }
        if !all_finite(&req.volumes) || req.volumes.iter().any(|v| *v < 0.0) {
            return Err(AgentError::InvalidInput("volumes must be non-negative and finite".into()));
        }

        let average = mean(&req.prices).unwrap_or_default();
        let volatility = safe_ratio(std_dev(&req.prices).unwrap_or_default(), average);
        let trend = if req.prices.len() < 2 {
            Trend::Stable
        } else {
            let (earlier, later) = req.prices.split_at(req.prices.len() / 2);
            Trend::between(
                mean(earlier).unwrap_or(average),
                mean(later).unwrap_or(average),
            )
        };

        let evicted = self.observations.cleanup_expired().await;
        if evicted > 0 {
            debug!(evicted, "Expired market series dropped");
        }

        let limit = self.history_limit;
        let prices = req.prices.clone();
        let series = self
            .observations
            .upsert(&req.market, Vec::new(), move |series| {
                series.extend(prices);
                if series.len() > limit {
                    let excess = series.len() - limit;
                    series.drain(..excess);
                }
            })
            .await;
        debug!(market = %req.market, cached = series.len(), "Market observations cached");

        Ok(MarketReport {
            average_price: round_cents(average),
            volatility: round4(volatility),
            trend,
            sample_size: req.prices.len(),
            total_volume: req.volumes.iter().sum(),
            market: req.market,
        })
    }

    fn monitor_competitors(&self, req: CompetitorMonitoringRequest) -> Result<CompetitorReport> {
        if req.competitors.is_empty() {
            return Err(AgentError::InsufficientCompetitorData);
        }
        let prices: Vec<f64> = req.competitors.iter().map(|c| c.price).collect();
        if !req.own_price.is_finite() || req.own_price <= 0.0 || !all_finite(&prices) || prices.iter().any(|p| *p <= 0.0) {
            return Err(AgentError::InvalidInput("prices must be positive and finite".into()));
        }

        let average = mean(&prices).ok_or(AgentError::InsufficientCompetitorData)?;
        let (lowest, highest) = min_max(&prices).ok_or(AgentError::InsufficientCompetitorData)?;
        let position = if req.own_price <= lowest {
            MarketPosition::Lowest
        } else if req.own_price >= highest {
            MarketPosition::Highest
        } else {
            MarketPosition::Competitive
        };
        let undercutting = req
            .competitors
            .iter()
            .filter(|c| c.price < req.own_price * (1.0 - UNDERCUT_MARGIN))
            .map(|c| c.competitor.clone())
            .collect();

        Ok(CompetitorReport {
            product_id: req.product_id,
            own_price: req.own_price,
            average_competitor_price: round_cents(average),
            price_gap_pct: round4(safe_ratio(req.own_price - average, average) * 100.0),
            position,
            undercutting,
        })
    }

    async fn optimize_price(&self, req: PricingRequest, ctx: &StrategyContext) -> Result<PricingDecision> {
        let (lowest, highest) =
            min_max(&req.competitor_prices).ok_or(AgentError::InsufficientCompetitorData)?;
        if !all_finite(&req.competitor_prices) || lowest <= 0.0 {
            return Err(AgentError::InvalidInput("competitor prices must be positive and finite".into()));
        }
        if !req.current_price.is_finite() || req.current_price <= 0.0 {
            return Err(AgentError::InvalidInput("current_price must be positive and finite".into()));
        }
        if !req.demand.is_finite() || req.demand < 0.0 || !req.elasticity.is_finite() {
            return Err(AgentError::InvalidInput("demand and elasticity must be finite, demand non-negative".into()));
        }

        let lower_bound = lowest * 0.9;
        let upper_bound = highest * 1.2;
        let competitor_average = mean(&req.competitor_prices).unwrap_or(req.current_price);

        // demand above baseline pushes the price up, damped by elasticity
        let demand_adjusted =
            req.current_price * (1.0 + (req.demand - 1.0) / (1.0 + req.elasticity.abs()));
        let max_move = 0.05 + 0.25 * ctx.bounded_risk_tolerance();
        let bounded_move = demand_adjusted.clamp(
            req.current_price * (1.0 - max_move),
            req.current_price * (1.0 + max_move),
        );
        let anchored = bounded_move * (1.0 - COMPETITOR_ANCHOR) + competitor_average * COMPETITOR_ANCHOR;
        let optimal_price = round_cents(anchored).clamp(lower_bound, upper_bound);

        let change_pct = round4(safe_ratio(optimal_price - req.current_price, req.current_price) * 100.0);
        let price_test_scheduled = change_pct.abs() >= PRICE_TEST_THRESHOLD_PCT;
        if price_test_scheduled {
            self.actions
                .setup_price_test(&req.product_id, req.current_price, optimal_price)
                .await?;
        }

        Ok(PricingDecision {
            product_id: req.product_id,
            current_price: req.current_price,
            optimal_price,
            lower_bound,
            upper_bound,
            change_pct,
            price_test_scheduled,
        })
    }

    async fn detect_trend(&self, req: TrendDetectionRequest) -> Result<TrendReport> {
        let series = self.observations.get(&req.market).await.unwrap_or_default();
        if series.len() < 2 {
            return Err(AgentError::InsufficientData(format!(
                "need at least 2 cached observations for market {}, have {}",
                req.market,
                series.len()
            )));
        }
        let window = req.window.clamp(1, series.len());
        let long_average = mean(&series).unwrap_or_default();
        let short_average = mean(&series[series.len() - window..]).unwrap_or(long_average);

        Ok(TrendReport {
            trend: Trend::between(long_average, short_average),
            market: req.market,
            window,
            short_average: round_cents(short_average),
            long_average: round_cents(long_average),
            observations: series.len(),
        })
    }
}

#[async_trait]
impl Strategy for MarketStrategy {
    fn name(&self) -> &'static str {
        Self::AGENT_TYPE
    }

    fn supported_task_types(&self) -> &'static [TaskKind] {
        Self::TASK_TYPES
    }

    fn specialized_capabilities(&self) -> Vec<String> {
        vec![
            "price_series_analysis".to_string(),
            "competitor_price_tracking".to_string(),
            "demand_based_pricing".to_string(),
            "moving_average_trends".to_string(),
        ]
    }

    async fn handle(&self, request: TaskRequest, ctx: &StrategyContext) -> Result<TaskOutput> {
        match request {
            TaskRequest::MarketAnalysis(req) => self.analyze_market(req).await.map(TaskOutput::MarketAnalysis),
            TaskRequest::CompetitorMonitoring(req) => {
                self.monitor_competitors(req).map(TaskOutput::CompetitorMonitoring)
            }
            TaskRequest::DynamicPricing(req) => {
                self.optimize_price(req, ctx).await.map(TaskOutput::DynamicPricing)
            }
            TaskRequest::TrendDetection(req) => self.detect_trend(req).await.map(TaskOutput::TrendDetection),
            other => Err(AgentError::UnsupportedTaskType(other.kind().to_string())),
        }
    }
}
