//! Category benchmarks used by revenue stream optimisation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Category used when a stream's category has no row of its own
pub const DEFAULT_CATEGORY: &str = "general";

/// Reference metrics for one business category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryBenchmarks {
    /// Expected visitor-to-customer conversion rate (0..1)
    pub conversion_rate: f64,
    /// Expected average order value
    pub average_order_value: f64,
    /// Expected monthly churn (0..1)
    pub churn_rate: f64,
}

const GENERAL: CategoryBenchmarks = CategoryBenchmarks {
    conversion_rate: 0.025,
    average_order_value: 75.0,
    churn_rate: 0.07,
};

const TABLE: &[(&str, CategoryBenchmarks)] = &[
    (
        "saas",
        CategoryBenchmarks {
            conversion_rate: 0.03,
            average_order_value: 120.0,
            churn_rate: 0.05,
        },
    ),
    (
        "ecommerce",
        CategoryBenchmarks {
            conversion_rate: 0.025,
            average_order_value: 85.0,
            churn_rate: 0.10,
        },
    ),
    (
        "marketplace",
        CategoryBenchmarks {
            conversion_rate: 0.02,
            average_order_value: 60.0,
            churn_rate: 0.08,
        },
    ),
    (
        "subscription",
        CategoryBenchmarks {
            conversion_rate: 0.04,
            average_order_value: 45.0,
            churn_rate: 0.06,
        },
    ),
    (DEFAULT_CATEGORY, GENERAL),
];

/// Looks up the fixed row for `category`, falling back to [`DEFAULT_CATEGORY`]
pub fn lookup(category: &str) -> CategoryBenchmarks {
    let wanted = category.trim().to_lowercase();
    TABLE
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, row)| *row)
        .unwrap_or(GENERAL)
}

/// Where benchmark rows come from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BenchmarkSource: Send + Sync {
    /// Benchmarks for `category`; implementations fall back to a default row
    async fn category_benchmarks(&self, category: &str) -> Result<CategoryBenchmarks>;
}

/// The built-in fixed table
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticBenchmarks;

#[async_trait]
impl BenchmarkSource for StaticBenchmarks {
    async fn category_benchmarks(&self, category: &str) -> Result<CategoryBenchmarks> {
        Ok(lookup(category))
    }
}
