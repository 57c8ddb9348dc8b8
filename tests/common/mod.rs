use revenue_agents::config::Config;
use revenue_agents::utils::RetryPolicy;
use revenue_agents::{TaskKind, Task};
use serde_json::{json, Value};

#[allow(dead_code)]
pub mod test_helpers {
    use super::*;

    pub fn create_test_config() -> Config {
        Config {
            retry: RetryPolicy {
                attempts: 2,
                delay_ms: 1,
            },
            ..Config::default()
        }
    }

    pub fn setup_test_logger() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("revenue_agents=debug")
            .with_test_writer()
            .try_init();
    }

    /// A payload that parses for `kind` and succeeds on a fresh strategy,
    /// except `trend_detection`, which needs cached observations first
    pub fn valid_payload(kind: TaskKind) -> Value {
        match kind {
            TaskKind::MarketAnalysis => json!({
                "market": "eu",
                "prices": [100.0, 102.0, 104.0, 110.0],
                "volumes": [10.0, 12.0, 9.0, 14.0]
            }),
            TaskKind::CompetitorMonitoring => json!({
                "product_id": "sku-42",
                "own_price": 110.0,
                "competitors": [
                    {"competitor": "acme", "price": 95.0},
                    {"competitor": "globex", "price": 125.0}
                ]
            }),
            TaskKind::DynamicPricing => json!({
                "product_id": "sku-42",
                "current_price": 110.0,
                "demand": 1.2,
                "elasticity": 1.5,
                "competitor_prices": [100.0, 120.0, 140.0]
            }),
            TaskKind::TrendDetection => json!({"market": "eu", "window": 2}),
            TaskKind::RevenueOptimization => json!({
                "stream_id": "pro-plan",
                "category": "saas",
                "metrics": {
                    "monthly_revenue": 10000.0,
                    "conversion_rate": 0.02,
                    "average_order_value": 100.0,
                    "churn_rate": 0.08
                }
            }),
            TaskKind::ConversionAnalysis => json!({
                "funnel_id": "signup",
                "stages": {
                    "awareness": {"visitors": 1000, "conversions": 600},
                    "purchase": {"visitors": 100, "conversions": 40}
                }
            }),
            TaskKind::BudgetReallocation => json!({
                "total_budget": 1000.0,
                "campaigns": [
                    {"campaign_id": "search", "cost": 400.0, "revenue": 800.0, "optimization_potential": 10.0},
                    {"campaign_id": "social", "cost": 600.0, "revenue": 1800.0, "optimization_potential": 30.0}
                ]
            }),
        }
    }

    pub fn task(kind: TaskKind) -> Task {
        Task::new(kind.as_str(), valid_payload(kind))
    }
}
