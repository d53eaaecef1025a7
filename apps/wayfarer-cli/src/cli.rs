use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use wayfarer_config::{load_config, WayfarerConfig};
use wayfarer_core::planner::WorkflowPlanner;
use wayfarer_core::{TaoEngine, TaskRunner};
use wayfarer_tools::build_registry;

const DEFAULT_CONFIG_PATH: &str = "wayfarer.yaml";

#[derive(Debug, Parser)]
#[command(name = "wayfarer", about = "Wayfarer travel assistant CLI")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single travel request to completion
    Run(RunArgs),
    /// List the registered tools without running a task
    Tools(ToolsArgs),
}

#[derive(Debug, Args, Clone)]
struct RunArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[arg(long)]
    verbose: bool,
    /// The travel request, e.g. "What's the weather in Beijing and what should I visit?"
    #[arg(value_name = "REQUEST", required = true)]
    request: Vec<String>,
}

#[derive(Debug, Args, Clone)]
struct ToolsArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Run(args) => run_task(args).await,
            Command::Tools(args) => list_tools(args),
        }
    }
}

async fn run_task(args: RunArgs) -> anyhow::Result<()> {
    let config = load_or_default(&args.config)?;
    init_tracing(&config, args.verbose);

    let invoke_timeout = Duration::from_millis(config.engine.invoke_timeout_ms);
    let registry = Arc::new(build_registry(&config.tools, invoke_timeout)?);
    let engine = TaoEngine::new(registry.clone())
        .with_retry_policy(
            config.engine.max_attempts,
            Duration::from_millis(config.engine.retry_base_delay_ms),
            Duration::from_millis(config.engine.retry_max_delay_ms),
        )
        .with_invoke_timeout(invoke_timeout)
        .with_max_steps(config.engine.max_steps);
    let runner = TaskRunner::new(registry, Arc::new(WorkflowPlanner::new())).with_engine(engine);

    let cancellation = CancellationToken::new();
    let signal_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling at the next step boundary");
            signal_token.cancel();
        }
    });

    let request = args.request.join(" ");
    let outcome = runner.run_with_cancellation(&request, cancellation).await;
    match outcome.result {
        Ok(answer) => {
            println!("{}", answer.text);
            Ok(())
        }
        Err(error) => {
            eprintln!("task failed ({}): {}", error.kind(), error);
            std::process::exit(1);
        }
    }
}

fn list_tools(args: ToolsArgs) -> anyhow::Result<()> {
    let config = load_or_default(&args.config)?;
    init_tracing(&config, false);

    let invoke_timeout = Duration::from_millis(config.engine.invoke_timeout_ms);
    let registry = build_registry(&config.tools, invoke_timeout)?;
    for descriptor in registry.descriptors() {
        println!("{} - {}", descriptor.name, descriptor.description);
        for field in &descriptor.inputs {
            let required = if field.required { "required" } else { "optional" };
            println!("    {} ({}, {})", field.name, field.field_type, required);
        }
    }
    Ok(())
}

fn load_or_default(path: &Path) -> anyhow::Result<WayfarerConfig> {
    if path.exists() {
        load_config(path).with_context(|| format!("failed to load config from {}", path.display()))
    } else if path == Path::new(DEFAULT_CONFIG_PATH) {
        // No config written yet. Every field has a default.
        Ok(WayfarerConfig::default())
    } else {
        anyhow::bail!("config file not found: {}", path.display())
    }
}

fn init_tracing(config: &WayfarerConfig, verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.app.log_filter))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
