use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::json;
use tracing::info;

use revenue_agents::{logging, Config, Dispatcher, StrategyDeps, Task, TaskStatus};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to <config dir>/revenue-agents/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Dispatch a JSON array of tasks and print results and performance
    Run {
        /// Path to the task file
        #[arg(short, long)]
        tasks: PathBuf,
    },
    /// List the configured agents
    Agents,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };
    logging::init(cli.log_level.as_deref().unwrap_or(&config.log_level))?;

    let dispatcher = Dispatcher::from_config(&config, &StrategyDeps::default())
        .context("Failed to create agents")?;

    match cli.command {
        Command::Run { tasks } => run(&dispatcher, &tasks).await,
        Command::Agents => {
            list_agents(&dispatcher);
            Ok(())
        }
    }
}

async fn run(dispatcher: &Dispatcher, tasks_path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(tasks_path)
        .await
        .with_context(|| format!("Failed to read {}", tasks_path.display()))?;
    let tasks: Vec<Task> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse tasks in {}", tasks_path.display()))?;

    info!("Dispatching {} tasks", tasks.len());
    dispatcher.start_all().await;
    let reports = dispatcher.dispatch_all(tasks).await;
    dispatcher.stop_all().await;

    for report in &reports {
        let agent = report.agent_id.as_deref().unwrap_or("-");
        if report.task.status() == TaskStatus::Completed {
            eprintln!(
                "{} {} ({}) on {}",
                "✓".bright_green(),
                report.task.id,
                report.task.task_type,
                agent
            );
        } else {
            eprintln!(
                "{} {} ({}) on {}: {}",
                "✗".bright_red(),
                report.task.id,
                report.task.task_type,
                agent,
                report.error.as_deref().unwrap_or("not executed").red()
            );
        }
    }

    dispatcher.metrics().report().await;
    let summary = json!({
        "results": reports,
        "performance": dispatcher.performance_report(),
        "metrics": dispatcher.metrics().snapshot().await,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn list_agents(dispatcher: &Dispatcher) {
    println!("{}", "Configured agents".bright_green().bold());
    for agent in dispatcher.agents() {
        let config = agent.get_config();
        println!(
            "  {} {} [{}] priority {}, up to {} concurrent tasks",
            config.id.bright_white().bold(),
            config.name,
            agent.strategy_name().bright_blue(),
            config.priority,
            config.max_concurrent_tasks
        );
        println!("    tasks: {}", config.capabilities.join(", "));
        println!("    traits: {}", agent.specialized_capabilities().join(", "));
    }
}
