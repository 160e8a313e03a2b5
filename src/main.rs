use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod cli;

use cli::{Cli, Commands, RunArgs};
use triloop::config::Config;
use triloop::coordination::{TerminationReason, WorkspaceLock};
use triloop::llm::{AgentInvoker, AnthropicClient, AnthropicConfig, LlmClient};
use triloop::prompt::RolePrompts;
use triloop::runner::{Coordinator, RunOutcome, RunStatus};
use triloop::state::load_snapshot;

/// Exit code for a run that ended without meeting the completion condition
const EXIT_INCOMPLETE: i32 = 2;

fn setup_logging(config: &Config, verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("triloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("triloop.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let default_level = if verbose {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("info")
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn handle_run_command(args: &RunArgs, mut config: Config) -> Result<RunOutcome> {
    args.apply_to(&mut config);

    let goal = fs::read_to_string(&args.goal).context(format!("Failed to read goal from {}", args.goal.display()))?;
    let workspace = args
        .workspace
        .canonicalize()
        .context(format!("Workspace {} does not exist", args.workspace.display()))?;

    let prompts = RolePrompts::with_overrides(goal, config.prompts_dir.as_deref())?;
    let client = Arc::new(AnthropicClient::new(AnthropicConfig::from(&config.llm))?);
    if !client.is_ready() {
        eyre::bail!("No API key available for {}", client.model());
    }
    let invoker = AgentInvoker::new(client, &workspace, WorkspaceLock::new()).with_config(&config);

    println!(
        "{} {} (max {} iterations, verify every {}s)",
        "Running on".cyan(),
        workspace.display(),
        config.coordination.max_iterations,
        config.coordination.verify_interval().as_secs()
    );

    let coordinator = Coordinator::new(config, Arc::new(invoker), prompts);
    let termination = coordinator.termination().clone();
    tokio::spawn(async move {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() && termination.raise(TerminationReason::Failed) {
                    warn!("Interrupted, stopping all loops");
                    eprintln!("{}", "Interrupted, waiting for loops to stop...".yellow());
                }
            }
            _ = termination.cancelled() => {}
        }
    });

    let outcome = coordinator.run(&workspace).await.context("Coordination failed")?;
    print_outcome(&outcome);
    Ok(outcome)
}

fn handle_status_command(workspace: &Path, config: &Config) -> Result<()> {
    let path = config.state.resolve(workspace);
    let state = load_snapshot(&path).context(format!("No state found at {}", path.display()))?;
    info!("Read state from {}", path.display());

    println!("{} {}", "Started:".green(), state.started_at.to_rfc3339());
    print_outcome(&RunOutcome::from_state(&state, None, path));

    if !state.verifier.blockers.is_empty() {
        println!("{}", "Blockers:".yellow());
        for blocker in &state.verifier.blockers {
            println!("  - {}", blocker.summary);
        }
    }
    if let Some(at) = state.refactorer.last_ran_at {
        println!("{} {}", "Last refactor:".green(), at.to_rfc3339());
    }
    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    let status = match outcome.status {
        RunStatus::Complete => outcome.status.to_string().green().bold(),
        RunStatus::Incomplete => outcome.status.to_string().red().bold(),
    };
    println!("{} {}", "Status:".green(), status);
    if let Some(reason) = outcome.reason {
        println!("{} {}", "Reason:".green(), reason);
    }
    println!("{} {}", "Verdict:".green(), outcome.verdict);
    println!("{} {}", "Exit criteria met:".green(), outcome.exit_criteria_met);
    println!("{} {}", "Iterations:".green(), outcome.iterations);
    println!("{} {}", "Refactor passes:".green(), outcome.refactor_runs);
    println!("{} {}", "State file:".green(), outcome.state_path.display());
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging once the level is known
    setup_logging(&config, cli.is_verbose()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    match &cli.command {
        Commands::Run(args) => {
            let outcome = handle_run_command(args, config).await.context("Application failed")?;
            if !outcome.is_complete() {
                std::process::exit(EXIT_INCOMPLETE);
            }
        }
        Commands::Status { workspace } => handle_status_command(workspace, &config)?,
    }

    Ok(())
}
