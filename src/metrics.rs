use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Counter: tasks handed to an agent
pub const TASKS_DISPATCHED: &str = "tasks_dispatched";
/// Counter: tasks whose execution succeeded
pub const TASKS_SUCCEEDED: &str = "tasks_succeeded";
/// Counter: tasks whose execution failed
pub const TASKS_FAILED: &str = "tasks_failed";
/// Counter: tasks no agent could take
pub const TASKS_REJECTED: &str = "tasks_rejected";
/// Counter: selections repeated because admission lost a race
pub const ADMISSION_RETRIES: &str = "admission_retries";
/// Gauge: agents currently running
pub const AGENTS_RUNNING: &str = "agents_running";

/// Accumulated timings for one key
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimerStats {
    /// Number of recorded samples
    pub count: u64,
    /// Sum of all samples
    pub total: Duration,
    /// Most recent sample
    pub last: Duration,
}

impl TimerStats {
    /// Mean sample, zero before the first one
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.total.as_secs_f64() / self.count as f64)
    }
}

/// Point-in-time copy of every metric, sorted by key
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub timers: BTreeMap<String, TimerStats>,
    pub gauges: BTreeMap<String, f64>,
}

/// Collects and tracks dispatcher metrics
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    counters: Arc<RwLock<HashMap<String, u64>>>,
    timers: Arc<RwLock<HashMap<String, TimerStats>>>,
    gauges: Arc<RwLock<HashMap<String, f64>>>,
}

impl Metrics {
    /// Creates a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments a counter metric by 1
    pub async fn increment(&self, key: &str) {
        let mut counters = self.counters.write().await;
        let value = counters.entry(key.to_string()).or_insert(0);
        *value += 1;
        debug!("Incremented counter {}: {}", key, value);
    }

    /// Adds one timing sample
    pub async fn record_time(&self, key: &str, duration: Duration) {
        let mut timers = self.timers.write().await;
        let stats = timers.entry(key.to_string()).or_default();
        stats.count += 1;
        stats.total += duration;
        stats.last = duration;
        debug!("Recorded timer {}: {:?}", key, duration);
    }

    /// Sets a gauge metric to the specified value
    pub async fn set_gauge(&self, key: &str, value: f64) {
        let mut gauges = self.gauges.write().await;
        gauges.insert(key.to_string(), value);
        debug!("Set gauge {}: {}", key, value);
    }

    /// Gets the current value of a counter metric
    pub async fn get_counter(&self, key: &str) -> Option<u64> {
        self.counters.read().await.get(key).copied()
    }

    /// Gets the accumulated timings for a key
    pub async fn get_timer(&self, key: &str) -> Option<TimerStats> {
        self.timers.read().await.get(key).copied()
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.read().await.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            timers: self.timers.read().await.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            gauges: self.gauges.read().await.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }

    /// Logs every collected metric
    pub async fn report(&self) {
        let snapshot = self.snapshot().await;
        info!("=== Metrics Report ===");
        for (k, v) in &snapshot.counters {
            info!("  {}: {}", k, v);
        }
        for (k, v) in &snapshot.timers {
            info!("  {}: {} samples, mean {:?}", k, v.count, v.mean());
        }
        for (k, v) in &snapshot.gauges {
            info!("  {}: {}", k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counters() {
        let metrics = Metrics::new();

        metrics.increment(TASKS_DISPATCHED).await;
        metrics.increment(TASKS_DISPATCHED).await;

        assert_eq!(metrics.get_counter(TASKS_DISPATCHED).await, Some(2));
        assert_eq!(metrics.get_counter(TASKS_FAILED).await, None);
    }

    #[tokio::test]
    async fn test_timers_accumulate() {
        let metrics = Metrics::new();

        metrics.record_time("dispatch.dynamic_pricing", Duration::from_millis(10)).await;
        metrics.record_time("dispatch.dynamic_pricing", Duration::from_millis(30)).await;

        let stats = metrics.get_timer("dispatch.dynamic_pricing").await.unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.last, Duration::from_millis(30));
        assert_eq!(stats.mean(), Duration::from_millis(20));
    }

    #[test]
    fn test_mean_past_u32_samples() {
        let samples = u64::from(u32::MAX) + 1;
        let stats = TimerStats {
            count: samples,
            total: Duration::from_secs(samples),
            last: Duration::from_secs(1),
        };
        assert_eq!(stats.mean(), Duration::from_secs(1));
        assert_eq!(TimerStats::default().mean(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_snapshot_is_sorted_copy() {
        let metrics = Metrics::new();
        metrics.set_gauge(AGENTS_RUNNING, 2.0).await;
        metrics.increment(TASKS_REJECTED).await;
        metrics.increment(ADMISSION_RETRIES).await;

        let snapshot = metrics.snapshot().await;
        let keys: Vec<&String> = snapshot.counters.keys().collect();
        assert_eq!(keys, vec![ADMISSION_RETRIES, TASKS_REJECTED]);
        assert_eq!(snapshot.gauges[AGENTS_RUNNING], 2.0);
    }
}
