//! Command surface
//!
//! - `run`: execute one task
//! - `chain`: execute a JSON array of requests as one chain
//! - `tasks`: list registered tasks and their routing

use crate::config::AppConfig;
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ghrelay_adapters::{builtin_handlers, GraphqlHttpTransport, ProcessRunner};
use ghrelay_core::{CliHandlerRegistry, Engine, ExecutionDeps, TaskRequest};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// ghrelay GitHub capability router
#[derive(Parser, Debug)]
#[command(name = "ghrelay")]
#[command(about = "Route GitHub capability requests over the gh CLI or the GraphQL API")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub flags: RouteFlags,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct RouteFlags {
    /// Assume the CLI is installed and authenticated without probing
    #[arg(long, global = true)]
    pub skip_preflight: bool,

    /// Never use the CLI route
    #[arg(long, global = true)]
    pub no_cli: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a single task
    Run {
        /// Task name, e.g. repo.view
        task: String,
        /// Task input as a JSON object
        #[arg(long, short, default_value = "{}")]
        input: String,
    },
    /// Execute a chain of requests (JSON array of {"task", "input"})
    Chain {
        /// Read requests from a file instead of stdin
        #[arg(long, short)]
        file: Option<PathBuf>,
    },
    /// List registered tasks
    Tasks,
}

/// Run the CLI command. Returns whether every executed step succeeded.
pub async fn run(cli: Cli, config: AppConfig) -> Result<bool> {
    match cli.command {
        Some(Commands::Run { task, input }) => {
            let input = parse_input(&input)?;
            let (engine, deps) = build_engine(&config, cli.flags)?;
            let envelope = engine.execute_task(TaskRequest::new(task, input), &deps).await;
            print_json(&envelope)?;
            Ok(envelope.ok)
        }
        Some(Commands::Chain { file }) => {
            let text = match file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut buf)
                        .await
                        .context("Failed to read requests from stdin")?;
                    buf
                }
            };
            let requests = parse_requests(&text)?;
            let (engine, deps) = build_engine(&config, cli.flags)?;
            let result = engine.execute_tasks(requests, &deps).await;
            print_json(&result)?;
            Ok(result.meta.failed == 0)
        }
        Some(Commands::Tasks) => {
            let (engine, _) = build_engine(&config, cli.flags)?;
            for line in task_lines(&engine) {
                println!("{}", line);
            }
            Ok(true)
        }
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(true)
        }
    }
}

/// Wire the engine and its collaborators from configuration
pub fn build_engine(config: &AppConfig, flags: RouteFlags) -> Result<(Engine, ExecutionDeps)> {
    let token = config.resolve_token();
    let transport = GraphqlHttpTransport::new(config.http_config(token))
        .context("Failed to build GraphQL transport")?;

    let mut deps = ExecutionDeps::new()
        .with_token(transport.has_token())
        .with_transport(Arc::new(transport))
        .with_skip_preflight(flags.skip_preflight || config.engine.skip_preflight);

    let cli_enabled = config.cli.enabled && !flags.no_cli;
    let handlers = if cli_enabled {
        deps = deps.with_cli_runner(Arc::new(ProcessRunner::new()));
        builtin_handlers(&config.cli.binary, config.engine_config().cli_step_timeout)
    } else {
        deps = deps.with_cli_flags(Some(false), None);
        CliHandlerRegistry::new()
    };

    info!(
        api_url = %config.github.api_url,
        token_present = deps.token_present,
        cli_enabled,
        handlers = handlers.len(),
        "Engine ready"
    );
    Ok((Engine::builtin(handlers, config.engine_config()), deps))
}

fn parse_input(text: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(text).context("--input is not valid JSON")?;
    if !value.is_object() {
        bail!("--input must be a JSON object");
    }
    Ok(value)
}

/// Accepts a JSON array of requests or a single request object
fn parse_requests(text: &str) -> Result<Vec<TaskRequest>> {
    let value: Value = serde_json::from_str(text).context("Requests are not valid JSON")?;
    let requests: Vec<TaskRequest> = match value {
        Value::Array(_) => serde_json::from_value(value),
        Value::Object(_) => serde_json::from_value(value).map(|r| vec![r]),
        _ => bail!("Requests must be a JSON array of {{\"task\", \"input\"}} objects"),
    }
    .context("Malformed request")?;
    debug!(count = requests.len(), "Parsed requests");
    Ok(requests)
}

fn task_lines(engine: &Engine) -> Vec<String> {
    engine
        .registry()
        .list()
        .iter()
        .map(|card| {
            let routes: Vec<&str> = card.routing.order().map(|r| r.as_str()).collect();
            let cli = if engine.handlers().has(card.task) { "" } else { " (no cli handler)" };
            format!(
                "{:<22} {:<18} {}{}",
                card.task.as_str(),
                routes.join(" > "),
                card.description,
                cli
            )
        })
        .collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", text);
    Ok(())
}
