//! Revenue strategy: stream optimisation against category benchmarks,
//! conversion funnel analysis and budget reallocation across campaigns.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::benchmarks::{BenchmarkSource, CategoryBenchmarks, DEFAULT_CATEGORY};
use super::{Strategy, StrategyContext};
use crate::actions::ActionPort;
use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::numeric::{all_finite, allocate, round4, round_cents, safe_ratio};
use crate::task::{TaskKind, TaskOutput, TaskRequest};
use crate::utils::{with_retry, RetryPolicy};

/// Drop-off above which a funnel stage is a bottleneck
const BOTTLENECK_DROP_OFF: f64 = 0.5;

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Current figures for one revenue stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueMetrics {
    pub monthly_revenue: f64,
    pub conversion_rate: f64,
    pub average_order_value: f64,
    pub churn_rate: f64,
}

/// Payload of `revenue_optimization`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueOptimizationRequest {
    pub stream_id: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub metrics: RevenueMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationKind {
    ConversionRate,
    AverageOrderValue,
    Retention,
}

/// A candidate improvement for a revenue stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimization {
    pub kind: OptimizationKind,
    /// Estimated monthly revenue gained, rounded to cents
    pub potential_value: f64,
    pub confidence: f64,
    pub description: String,
}

/// Result of `revenue_optimization`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OptimizationOutcome {
    Applied {
        stream_id: String,
        optimization: Optimization,
        candidates_considered: usize,
    },
    NoOpportunity {
        stream_id: String,
        category: String,
    },
}

/// Entry of the optimisation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRecord {
    pub stream_id: String,
    pub category: String,
    pub optimization: Optimization,
    pub recorded_at: DateTime<Utc>,
}

/// Funnel stages in funnel order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    Awareness,
    Interest,
    Consideration,
    Purchase,
    Retention,
}

impl FunnelStage {
    pub const ALL: [FunnelStage; 5] = [
        FunnelStage::Awareness,
        FunnelStage::Interest,
        FunnelStage::Consideration,
        FunnelStage::Purchase,
        FunnelStage::Retention,
    ];

    /// Canonical fix for a bottleneck at this stage
    pub fn recommendation(&self) -> &'static str {
        match self {
            FunnelStage::Awareness => "Increase brand visibility through targeted content and advertising",
            FunnelStage::Interest => "Improve landing page engagement and value proposition clarity",
            FunnelStage::Consideration => "Add social proof, comparisons and detailed product information",
            FunnelStage::Purchase => "Simplify checkout process and reduce friction",
            FunnelStage::Retention => "Strengthen onboarding and loyalty programs to reduce churn",
        }
    }
}

impl fmt::Display for FunnelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FunnelStage::Awareness => "awareness",
            FunnelStage::Interest => "interest",
            FunnelStage::Consideration => "consideration",
            FunnelStage::Purchase => "purchase",
            FunnelStage::Retention => "retention",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMetrics {
    pub visitors: u64,
    pub conversions: u64,
}

/// Payload of `conversion_analysis`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionAnalysisRequest {
    pub funnel_id: String,
    /// Stages present in the funnel; unknown stage names are rejected
    pub stages: BTreeMap<FunnelStage, StageMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: FunnelStage,
    pub visitors: u64,
    pub conversions: u64,
    /// `conversions / visitors`, 0 when there were no visitors
    pub conversion_rate: f64,
    pub drop_off_rate: f64,
    pub bottleneck: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelAnalysis {
    pub funnel_id: String,
    /// Reports in funnel order
    pub stages: Vec<StageReport>,
    pub bottlenecks: Vec<FunnelStage>,
    /// One recommendation per bottleneck, same order
    pub recommendations: Vec<String>,
    /// Last stage conversions over first stage visitors
    pub overall_conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignMetrics {
    pub campaign_id: String,
    pub cost: f64,
    pub revenue: f64,
    /// Expected upside; defaults to the campaign's non-negative ROI
    #[serde(default)]
    pub optimization_potential: Option<f64>,
}

/// Payload of `budget_reallocation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetReallocationRequest {
    pub total_budget: f64,
    pub campaigns: Vec<CampaignMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignAllocation {
    pub campaign_id: String,
    pub current_roi: f64,
    pub weight: f64,
    pub previous_budget: f64,
    pub allocated_budget: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetPlan {
    pub total_budget: f64,
    /// Allocations in request order; budgets sum to `total_budget`
    pub allocations: Vec<CampaignAllocation>,
    /// Budget-weighted ROI of the new plan
    pub expected_roi: f64,
}

/// Strategy for `revenue` agents
pub struct RevenueStrategy {
    actions: Arc<dyn ActionPort>,
    benchmarks: Arc<dyn BenchmarkSource>,
    retry: RetryPolicy,
    history_limit: usize,
    history: Mutex<VecDeque<OptimizationRecord>>,
}

impl RevenueStrategy {
    pub const AGENT_TYPE: &'static str = "revenue";

    const TASK_TYPES: &'static [TaskKind] = &[
        TaskKind::RevenueOptimization,
        TaskKind::ConversionAnalysis,
        TaskKind::BudgetReallocation,
    ];

    pub fn new(config: &Config, actions: Arc<dyn ActionPort>, benchmarks: Arc<dyn BenchmarkSource>) -> Self {
        Self {
            actions,
            benchmarks,
            retry: config.retry,
            history_limit: config.history_limit.max(1),
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Applied optimisations, oldest first
    pub fn optimization_history(&self) -> Vec<OptimizationRecord> {
        self.history.lock().iter().cloned().collect()
    }

    fn remember(&self, record: OptimizationRecord) {
        let mut history = self.history.lock();
        while history.len() >= self.history_limit {
            history.pop_front();
        }
        history.push_back(record);
    }

    async fn benchmarks_for(&self, category: &str) -> Result<CategoryBenchmarks> {
        with_retry(|| self.benchmarks.category_benchmarks(category), self.retry)
            .await
            .map_err(|e| match e {
                AgentError::BenchmarkUnavailable(reason) => AgentError::InsufficientData(format!(
                    "benchmarks for {} unavailable: {}",
                    category, reason
                )),
                other => other,
            })
    }

    async fn optimize_stream(&self, req: RevenueOptimizationRequest) -> Result<OptimizationOutcome> {
        let m = &req.metrics;
        let figures = [m.monthly_revenue, m.conversion_rate, m.average_order_value, m.churn_rate];
        if !all_finite(&figures) || figures.iter().any(|v| *v < 0.0) {
            return Err(AgentError::InvalidInput(
                "revenue metrics must be finite and non-negative".into(),
            ));
        }

        let benchmarks = self.benchmarks_for(&req.category).await?;
        let candidates = candidate_optimizations(m, &benchmarks);
        let considered = candidates.len();

        // strict comparison keeps the first-seen candidate on ties
        let best = candidates.into_iter().fold(None, |best: Option<Optimization>, c| match best {
            Some(b) if b.potential_value >= c.potential_value => Some(b),
            _ => Some(c),
        });

        let Some(optimization) = best else {
            debug!(stream_id = %req.stream_id, category = %req.category, "No optimization opportunity");
            return Ok(OptimizationOutcome::NoOpportunity {
                stream_id: req.stream_id,
                category: req.category,
            });
        };

        self.actions
            .implement_optimization(&req.stream_id, &optimization)
            .await?;
        self.remember(OptimizationRecord {
            stream_id: req.stream_id.clone(),
            category: req.category,
            optimization: optimization.clone(),
            recorded_at: Utc::now(),
        });
        info!(
            stream_id = %req.stream_id,
            kind = ?optimization.kind,
            potential = optimization.potential_value,
            "Optimization applied"
        );

        Ok(OptimizationOutcome::Applied {
            stream_id: req.stream_id,
            optimization,
            candidates_considered: considered,
        })
    }

    fn analyze_funnel(&self, req: ConversionAnalysisRequest) -> Result<FunnelAnalysis> {
        if req.stages.is_empty() {
            return Err(AgentError::InsufficientData(format!(
                "funnel {} has no stages",
                req.funnel_id
            )));
        }

        let mut stages = Vec::with_capacity(req.stages.len());
        let mut bottlenecks = Vec::new();
        for (&stage, metrics) in &req.stages {
            if metrics.conversions > metrics.visitors {
                return Err(AgentError::InvalidInput(format!(
                    "stage {} has more conversions ({}) than visitors ({})",
                    stage, metrics.conversions, metrics.visitors
                )));
            }
            let conversion_rate = safe_ratio(metrics.conversions as f64, metrics.visitors as f64);
            let drop_off_rate = if metrics.visitors == 0 {
                0.0
            } else {
                1.0 - conversion_rate
            };
            let bottleneck = drop_off_rate > BOTTLENECK_DROP_OFF;
            if bottleneck {
                bottlenecks.push(stage);
            }
            stages.push(StageReport {
                stage,
                visitors: metrics.visitors,
                conversions: metrics.conversions,
                conversion_rate: round4(conversion_rate),
                drop_off_rate: round4(drop_off_rate),
                bottleneck,
            });
        }

        let overall_conversion_rate = match (stages.first(), stages.last()) {
            (Some(first), Some(last)) => round4(safe_ratio(last.conversions as f64, first.visitors as f64)),
            _ => 0.0,
        };

        Ok(FunnelAnalysis {
            funnel_id: req.funnel_id,
            recommendations: bottlenecks.iter().map(|s| s.recommendation().to_string()).collect(),
            bottlenecks,
            stages,
            overall_conversion_rate,
        })
    }

    async fn reallocate_budget(&self, req: BudgetReallocationRequest) -> Result<BudgetPlan> {
        if req.campaigns.is_empty() {
            return Err(AgentError::InsufficientData("no campaigns to reallocate".into()));
        }
        if !req.total_budget.is_finite() || req.total_budget < 0.0 {
            return Err(AgentError::InvalidInput("total_budget must be finite and non-negative".into()));
        }

        let mut rois = Vec::with_capacity(req.campaigns.len());
        let mut potentials = Vec::with_capacity(req.campaigns.len());
        for campaign in &req.campaigns {
            if !campaign.cost.is_finite() || !campaign.revenue.is_finite() || campaign.cost < 0.0 {
                return Err(AgentError::InvalidInput(format!(
                    "campaign {} has invalid cost or revenue",
                    campaign.campaign_id
                )));
            }
            if campaign.cost == 0.0 {
                return Err(AgentError::ZeroCost {
                    campaign_id: campaign.campaign_id.clone(),
                });
            }
            let roi = campaign.revenue / campaign.cost;
            let potential = campaign.optimization_potential.unwrap_or(roi.max(0.0));
            if !potential.is_finite() || potential < 0.0 {
                return Err(AgentError::InvalidInput(format!(
                    "campaign {} has negative or non-finite optimization potential",
                    campaign.campaign_id
                )));
            }
            rois.push(roi);
            potentials.push(potential);
        }

        let total_potential: f64 = potentials.iter().sum();
        if total_potential <= 0.0 {
            return Err(AgentError::ZeroTotalPotential);
        }
        let weights: Vec<f64> = potentials.iter().map(|p| p / total_potential).collect();
        let budgets = allocate(req.total_budget, &weights);

        let allocations: Vec<CampaignAllocation> = req
            .campaigns
            .iter()
            .enumerate()
            .map(|(i, campaign)| CampaignAllocation {
                campaign_id: campaign.campaign_id.clone(),
                current_roi: round4(rois[i]),
                weight: round4(weights[i]),
                previous_budget: campaign.cost,
                allocated_budget: budgets[i],
            })
            .collect();
        let weighted_return: f64 = budgets.iter().zip(&rois).map(|(b, r)| b * r).sum();
        let plan = BudgetPlan {
            total_budget: req.total_budget,
            allocations,
            expected_roi: round4(safe_ratio(weighted_return, req.total_budget)),
        };

        // Updates are pushed in plan order and not rolled back: a failure on
        // one campaign leaves the earlier campaigns already updated.
        for allocation in &plan.allocations {
            if let Err(err) = self
                .actions
                .update_campaign_budget(&allocation.campaign_id, allocation.allocated_budget)
                .await
            {
                warn!(
                    campaign_id = %allocation.campaign_id,
                    error = %err,
                    "Budget update failed; earlier campaigns keep their new budgets"
                );
                return Err(err);
            }
        }
        Ok(plan)
    }
}

/// Candidates for every metric lagging its benchmark, in a fixed order
fn candidate_optimizations(m: &RevenueMetrics, b: &CategoryBenchmarks) -> Vec<Optimization> {
    let mut candidates = Vec::new();
    if m.conversion_rate < b.conversion_rate {
        candidates.push(Optimization {
            kind: OptimizationKind::ConversionRate,
            potential_value: round_cents(
                m.monthly_revenue * safe_ratio(b.conversion_rate - m.conversion_rate, b.conversion_rate),
            ),
            confidence: 0.8,
            description: format!(
                "Raise conversion rate from {:.2}% towards the {:.2}% benchmark",
                m.conversion_rate * 100.0,
                b.conversion_rate * 100.0
            ),
        });
    }
    if m.average_order_value < b.average_order_value {
        candidates.push(Optimization {
            kind: OptimizationKind::AverageOrderValue,
            potential_value: round_cents(
                m.monthly_revenue
                    * safe_ratio(b.average_order_value - m.average_order_value, b.average_order_value),
            ),
            confidence: 0.7,
            description: format!(
                "Lift average order value from {:.2} towards {:.2} with bundles and upsells",
                m.average_order_value, b.average_order_value
            ),
        });
    }
    if m.churn_rate > b.churn_rate {
        candidates.push(Optimization {
            kind: OptimizationKind::Retention,
            potential_value: round_cents(m.monthly_revenue * (m.churn_rate - b.churn_rate)),
            confidence: 0.75,
            description: format!(
                "Reduce churn from {:.2}% towards the {:.2}% benchmark",
                m.churn_rate * 100.0,
                b.churn_rate * 100.0
            ),
        });
    }
    candidates.retain(|c| c.potential_value > 0.0);
    candidates
}

#[async_trait]
impl Strategy for RevenueStrategy {
    fn name(&self) -> &'static str {
        Self::AGENT_TYPE
    }

    fn supported_task_types(&self) -> &'static [TaskKind] {
        Self::TASK_TYPES
    }

    fn specialized_capabilities(&self) -> Vec<String> {
        vec![
            "benchmark_gap_analysis".to_string(),
            "funnel_bottleneck_detection".to_string(),
            "roi_weighted_budgeting".to_string(),
        ]
    }

    async fn handle(&self, request: TaskRequest, _ctx: &StrategyContext) -> Result<TaskOutput> {
        match request {
            TaskRequest::RevenueOptimization(req) => {
                self.optimize_stream(req).await.map(TaskOutput::RevenueOptimization)
            }
            TaskRequest::ConversionAnalysis(req) => self.analyze_funnel(req).map(TaskOutput::ConversionAnalysis),
            TaskRequest::BudgetReallocation(req) => {
                self.reallocate_budget(req).await.map(TaskOutput::BudgetReallocation)
            }
            other => Err(AgentError::UnsupportedTaskType(other.kind().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{LoggingActionPort, MockActionPort};
    use crate::strategies::benchmarks::{lookup, MockBenchmarkSource, StaticBenchmarks};
    use mockall::Sequence;
    use serde_json::json;
    use test_case::test_case;

    fn config() -> Config {
        Config {
            retry: RetryPolicy {
                attempts: 3,
                delay_ms: 1,
            },
            ..Config::default()
        }
    }

    fn strategy() -> RevenueStrategy {
        RevenueStrategy::new(&config(), Arc::new(LoggingActionPort), Arc::new(StaticBenchmarks))
    }

    fn stream(conversion_rate: f64, average_order_value: f64, churn_rate: f64) -> RevenueOptimizationRequest {
        RevenueOptimizationRequest {
            stream_id: "stream-1".into(),
            category: "saas".into(),
            metrics: RevenueMetrics {
                monthly_revenue: 10_000.0,
                conversion_rate,
                average_order_value,
                churn_rate,
            },
        }
    }

    fn funnel(stages: &[(FunnelStage, u64, u64)]) -> ConversionAnalysisRequest {
        ConversionAnalysisRequest {
            funnel_id: "f-1".into(),
            stages: stages
                .iter()
                .map(|&(stage, visitors, conversions)| (stage, StageMetrics { visitors, conversions }))
                .collect(),
        }
    }

    fn campaign(id: &str, cost: f64, revenue: f64, potential: Option<f64>) -> CampaignMetrics {
        CampaignMetrics {
            campaign_id: id.into(),
            cost,
            revenue,
            optimization_potential: potential,
        }
    }

    #[tokio::test]
    async fn test_highest_potential_candidate_is_applied() {
        let mut actions = MockActionPort::new();
        actions
            .expect_implement_optimization()
            .withf(|stream, opt| stream == "stream-1" && opt.kind == OptimizationKind::ConversionRate)
            .times(1)
            .returning(|_, _| Ok(()));
        let strategy = RevenueStrategy::new(&config(), Arc::new(actions), Arc::new(StaticBenchmarks));

        let outcome = strategy.optimize_stream(stream(0.02, 100.0, 0.08)).await.unwrap();
        match outcome {
            OptimizationOutcome::Applied {
                optimization,
                candidates_considered,
                ..
            } => {
                assert_eq!(candidates_considered, 3);
                assert_eq!(optimization.potential_value, 3333.33);
                assert_eq!(optimization.confidence, 0.8);
            }
            other => panic!("expected an applied optimization, got {other:?}"),
        }
        assert_eq!(strategy.optimization_history().len(), 1);
    }

    #[tokio::test]
    async fn test_equal_potentials_keep_first_candidate() {
        let outcome = strategy().optimize_stream(stream(0.015, 60.0, 0.05)).await.unwrap();
        match outcome {
            OptimizationOutcome::Applied { optimization, .. } => {
                assert_eq!(optimization.kind, OptimizationKind::ConversionRate);
                assert_eq!(optimization.potential_value, 5000.0);
            }
            other => panic!("expected an applied optimization, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_opportunity_is_explicit() {
        let mut actions = MockActionPort::new();
        actions.expect_implement_optimization().times(0);
        let strategy = RevenueStrategy::new(&config(), Arc::new(actions), Arc::new(StaticBenchmarks));

        let outcome = strategy.optimize_stream(stream(0.05, 150.0, 0.01)).await.unwrap();
        assert_eq!(
            outcome,
            OptimizationOutcome::NoOpportunity {
                stream_id: "stream-1".into(),
                category: "saas".into(),
            }
        );
        assert!(strategy.optimization_history().is_empty());
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let config = Config {
            history_limit: 2,
            ..config()
        };
        let strategy = RevenueStrategy::new(&config, Arc::new(LoggingActionPort), Arc::new(StaticBenchmarks));
        for id in ["a", "b", "c"] {
            let mut req = stream(0.02, 120.0, 0.05);
            req.stream_id = id.into();
            strategy.optimize_stream(req).await.unwrap();
        }
        let ids: Vec<String> = strategy
            .optimization_history()
            .into_iter()
            .map(|r| r.stream_id)
            .collect();
        assert_eq!(ids, vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn test_benchmark_lookup_is_retried() {
        let mut benchmarks = MockBenchmarkSource::new();
        let mut failures = 2;
        benchmarks
            .expect_category_benchmarks()
            .times(3)
            .returning(move |category| {
                if failures > 0 {
                    failures -= 1;
                    Err(AgentError::BenchmarkUnavailable("warming up".into()))
                } else {
                    Ok(lookup(category))
                }
            });
        let strategy = RevenueStrategy::new(&config(), Arc::new(LoggingActionPort), Arc::new(benchmarks));

        let outcome = strategy.optimize_stream(stream(0.02, 120.0, 0.05)).await.unwrap();
        assert!(matches!(outcome, OptimizationOutcome::Applied { .. }));
    }

    #[tokio::test]
    async fn test_unavailable_benchmarks_become_computation_failure() {
        let mut benchmarks = MockBenchmarkSource::new();
        benchmarks
            .expect_category_benchmarks()
            .times(3)
            .returning(|_| Err(AgentError::BenchmarkUnavailable("down".into())));
        let strategy = RevenueStrategy::new(&config(), Arc::new(LoggingActionPort), Arc::new(benchmarks));

        let err = strategy.optimize_stream(stream(0.02, 120.0, 0.05)).await.unwrap_err();
        assert!(err.is_computation_failure());
    }

    #[test]
    fn test_funnel_zero_visitors_and_bottleneck() {
        let analysis = strategy()
            .analyze_funnel(funnel(&[
                (FunnelStage::Awareness, 0, 0),
                (FunnelStage::Purchase, 100, 40),
            ]))
            .unwrap();

        assert_eq!(analysis.stages[0].conversion_rate, 0.0);
        assert!(!analysis.stages[0].bottleneck);
        assert_eq!(analysis.stages[1].drop_off_rate, 0.6);
        assert_eq!(analysis.bottlenecks, vec![FunnelStage::Purchase]);
        assert_eq!(
            analysis.recommendations,
            vec!["Simplify checkout process and reduce friction".to_string()]
        );
    }

    #[test]
    fn test_funnel_stages_come_out_in_funnel_order() {
        let request: ConversionAnalysisRequest = serde_json::from_value(json!({
            "funnel_id": "f-2",
            "stages": {
                "purchase": {"visitors": 50, "conversions": 30},
                "awareness": {"visitors": 1000, "conversions": 600},
                "interest": {"visitors": 600, "conversions": 50}
            }
        }))
        .unwrap();
        let analysis = strategy().analyze_funnel(request).unwrap();

        let order: Vec<FunnelStage> = analysis.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            order,
            vec![FunnelStage::Awareness, FunnelStage::Interest, FunnelStage::Purchase]
        );
        assert_eq!(analysis.bottlenecks, vec![FunnelStage::Interest]);
        assert_eq!(analysis.overall_conversion_rate, 0.03);
    }

    #[test]
    fn test_funnel_rejects_more_conversions_than_visitors() {
        let err = strategy()
            .analyze_funnel(funnel(&[(FunnelStage::Interest, 10, 11)]))
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
    }

    #[test_case(FunnelStage::Awareness, "Increase brand visibility through targeted content and advertising")]
    #[test_case(FunnelStage::Purchase, "Simplify checkout process and reduce friction")]
    #[test_case(FunnelStage::Retention, "Strengthen onboarding and loyalty programs to reduce churn")]
    fn test_stage_recommendation(stage: FunnelStage, expected: &str) {
        assert_eq!(stage.recommendation(), expected);
    }

    #[tokio::test]
    async fn test_budget_split_follows_potential() {
        let mut actions = MockActionPort::new();
        actions
            .expect_update_campaign_budget()
            .times(2)
            .returning(|_, _| Ok(()));
        let strategy = RevenueStrategy::new(&config(), Arc::new(actions), Arc::new(StaticBenchmarks));

        let plan = strategy
            .reallocate_budget(BudgetReallocationRequest {
                total_budget: 1000.0,
                campaigns: vec![
                    campaign("search", 400.0, 800.0, Some(10.0)),
                    campaign("social", 600.0, 1800.0, Some(30.0)),
                ],
            })
            .await
            .unwrap();

        let weights: Vec<f64> = plan.allocations.iter().map(|a| a.weight).collect();
        let budgets: Vec<f64> = plan.allocations.iter().map(|a| a.allocated_budget).collect();
        assert_eq!(weights, vec![0.25, 0.75]);
        assert_eq!(budgets, vec![250.0, 750.0]);
        assert_eq!(budgets.iter().sum::<f64>(), 1000.0);
        assert_eq!(plan.allocations[0].current_roi, 2.0);
        assert_eq!(plan.expected_roi, 2.75);
    }

    #[tokio::test]
    async fn test_budget_update_failure_stops_after_planning() {
        let mut seq = Sequence::new();
        let mut actions = MockActionPort::new();
        actions
            .expect_update_campaign_budget()
            .withf(|id, budget| id == "search" && *budget == 250.0)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        actions
            .expect_update_campaign_budget()
            .withf(|id, budget| id == "social" && *budget == 750.0)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(AgentError::Action("ads api down".into())));
        let strategy = RevenueStrategy::new(&config(), Arc::new(actions), Arc::new(StaticBenchmarks));

        let err = strategy
            .reallocate_budget(BudgetReallocationRequest {
                total_budget: 1000.0,
                campaigns: vec![
                    campaign("search", 400.0, 800.0, Some(10.0)),
                    campaign("social", 600.0, 1800.0, Some(30.0)),
                ],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Action(ref msg) if msg == "ads api down"));
    }

    #[tokio::test]
    async fn test_invalid_campaign_pushes_no_updates() {
        let mut actions = MockActionPort::new();
        actions.expect_update_campaign_budget().times(0);
        let strategy = RevenueStrategy::new(&config(), Arc::new(actions), Arc::new(StaticBenchmarks));

        let err = strategy
            .reallocate_budget(BudgetReallocationRequest {
                total_budget: 1000.0,
                campaigns: vec![
                    campaign("search", 400.0, 800.0, Some(10.0)),
                    campaign("free", 0.0, 50.0, Some(5.0)),
                ],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ZeroCost { .. }));
    }

    #[tokio::test]
    async fn test_budget_guards() {
        let strategy = strategy();
        let zero_cost = strategy
            .reallocate_budget(BudgetReallocationRequest {
                total_budget: 100.0,
                campaigns: vec![campaign("free", 0.0, 10.0, Some(1.0))],
            })
            .await
            .unwrap_err();
        assert!(matches!(zero_cost, AgentError::ZeroCost { campaign_id } if campaign_id == "free"));

        let zero_potential = strategy
            .reallocate_budget(BudgetReallocationRequest {
                total_budget: 100.0,
                campaigns: vec![campaign("a", 10.0, 5.0, Some(0.0)), campaign("b", 10.0, 0.0, None)],
            })
            .await
            .unwrap_err();
        assert!(matches!(zero_potential, AgentError::ZeroTotalPotential));
    }
}
