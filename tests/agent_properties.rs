use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use revenue_agents::Strategy as _;
use revenue_agents::{
    Agent, AgentConfig, AgentConfigUpdate, AgentError, StrategyDeps, StrategyFactory, Task, TaskKind,
    TaskOutput,
};

mod common;
use common::test_helpers::*;

fn agent_for(agent_type: &str, capacity: usize) -> Agent {
    let config = create_test_config();
    let strategy = StrategyFactory::create_strategy(agent_type, &config, &StrategyDeps::default()).unwrap();
    let capabilities: Vec<&str> = strategy
        .supported_task_types()
        .iter()
        .map(|k| k.as_str())
        .collect();
    let agent_config = AgentConfig::new(format!("{agent_type}-p"), agent_type, "Property Agent")
        .with_capabilities(capabilities)
        .with_max_concurrent_tasks(capacity);
    Agent::new(agent_config, strategy).unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Assign(u8),
    Complete(u8, bool, u64),
    Start,
    Stop,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => any::<u8>().prop_map(|id| Op::Assign(id % 16)),
        3 => (any::<u8>(), any::<bool>(), 0u64..10_000).prop_map(|(id, ok, ms)| Op::Complete(id % 16, ok, ms)),
        1 => Just(Op::Start),
        1 => Just(Op::Stop),
    ]
}

proptest! {
    #[test]
    fn prop_active_tasks_never_exceed_capacity(
        capacity in 1usize..6,
        ops in prop::collection::vec(op(), 1..120)
    ) {
        let agent = agent_for("market", capacity);
        agent.start();
        let mut completions = 0u64;

        for op in ops {
            match op {
                Op::Assign(id) => {
                    let before = agent.active_task_count();
                    let available = agent.is_available();
                    let admitted = agent.assign_task(&format!("t-{id}"));
                    if !available {
                        prop_assert!(!admitted);
                        prop_assert_eq!(agent.active_task_count(), before);
                    }
                    if admitted {
                        prop_assert_eq!(agent.active_task_count(), before + 1);
                    }
                }
                Op::Complete(id, ok, ms) => {
                    agent.complete_task(&format!("t-{id}"), ok, ms, None);
                    completions += 1;
                }
                Op::Start => agent.start(),
                Op::Stop => agent.stop(),
            }
            prop_assert!(agent.active_task_count() <= capacity);
        }

        let perf = agent.get_performance();
        prop_assert_eq!(perf.total_tasks(), completions);
        if completions > 0 {
            let rate = perf.tasks_completed as f64 / completions as f64;
            prop_assert!((perf.success_rate - rate).abs() < 1e-12);
        }
    }
}

#[test]
fn test_concurrent_assignments_respect_capacity() {
    let agent = Arc::new(agent_for("revenue", 3));
    agent.start();

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let agent = Arc::clone(&agent);
            thread::spawn(move || agent.assign_task(&format!("task-{i}")))
        })
        .collect();
    let admitted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|admitted| *admitted)
        .count();

    assert_eq!(admitted, 3);
    assert_eq!(agent.active_task_count(), 3);
    assert!(!agent.is_available());
}

#[test]
fn test_concurrent_completions_do_not_lose_revenue() {
    let agent = Arc::new(agent_for("revenue", 1));
    agent.start();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let agent = Arc::clone(&agent);
            thread::spawn(move || {
                for i in 0..250 {
                    agent.complete_task(&format!("{t}-{i}"), true, 10, Some(2.0));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let perf = agent.get_performance();
    assert_eq!(perf.tasks_completed, 2000);
    assert_eq!(perf.revenue_generated, 4000.0);
    assert_eq!(perf.average_execution_time, 10.0);
}

#[tokio::test]
async fn test_declared_capabilities_match_execution_dispatch() {
    for agent_type in StrategyFactory::AGENT_TYPES {
        let agent = agent_for(agent_type, 8);
        for kind in TaskKind::ALL {
            let mut task = task(kind);
            let handled = agent.can_handle_task(&task);
            let result = agent.execute_task(&mut task).await;
            let unsupported = matches!(result, Err(AgentError::UnsupportedTaskType(_)));
            assert_eq!(
                handled, !unsupported,
                "{agent_type} disagrees with itself about {kind}"
            );
        }
    }
}

#[test]
fn test_average_matches_recomputed_history() {
    let agent = agent_for("market", 1);
    for ms in [100, 200, 300] {
        agent.complete_task("t", true, ms, None);
    }
    assert_eq!(agent.get_performance().average_execution_time, 200.0);
}

#[tokio::test]
async fn test_unknown_task_type_still_records_failure() {
    let agent = agent_for("market", 2);
    agent.start();
    let mut task = Task::new("send_newsletter", serde_json::json!({}));
    assert!(!agent.can_handle_task(&task));
    assert!(agent.assign_task(&task.id));

    let err = agent.execute_task(&mut task).await.unwrap_err();
    assert!(matches!(err, AgentError::UnsupportedTaskType(ref t) if t == "send_newsletter"));
    assert_eq!(agent.active_task_count(), 0);
    assert_eq!(agent.get_performance().tasks_failed, 1);
}

#[tokio::test]
async fn test_nan_risk_tolerance_still_prices() {
    let agent = agent_for("market", 1);
    agent.start();
    agent.update_config(AgentConfigUpdate {
        risk_tolerance: Some(f64::NAN),
        ..Default::default()
    });

    let mut pricing = task(TaskKind::DynamicPricing);
    assert!(agent.assign_task(&pricing.id));
    let output = agent.execute_task(&mut pricing).await.unwrap();
    match output {
        TaskOutput::DynamicPricing(decision) => assert_eq!(decision.optimal_price, 119.16),
        other => panic!("unexpected output {other:?}"),
    }
    assert_eq!(agent.get_performance().tasks_completed, 1);
}
