//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: coordinate Builder, Verifier and Refactorer on a workspace
//! - status: summarise a workspace's durable state file

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use triloop::config::Config;

/// Triloop - Builder, Verifier and Refactorer agents on one workspace
#[derive(Parser, Debug)]
#[command(name = "triloop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the three role loops until the goal is proven complete
    Run(RunArgs),

    /// Show the durable state of a workspace
    Status {
        /// Workspace root
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
    },
}

/// Arguments for `triloop run`; flags override the config file
#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Workspace root the agents act on
    #[arg(short, long, default_value = ".")]
    pub workspace: PathBuf,

    /// File containing the goal text
    #[arg(short, long)]
    pub goal: PathBuf,

    /// Milliseconds between Verifier passes
    #[arg(long)]
    pub verify_interval_ms: Option<u64>,

    /// Builder iteration limit
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Model turns allowed per role invocation
    #[arg(long)]
    pub max_turns: Option<u32>,

    /// Let run_command execute any program, including shell syntax
    #[arg(long)]
    pub allow_unsafe_commands: bool,

    /// Model name
    #[arg(long)]
    pub model: Option<String>,
}

impl RunArgs {
    /// Overlay the flags that were given onto `config`
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ms) = self.verify_interval_ms {
            config.coordination.verify_interval_ms = ms;
        }
        if let Some(n) = self.max_iterations {
            config.coordination.max_iterations = n;
        }
        if let Some(n) = self.max_turns {
            config.coordination.max_turns = n;
        }
        if self.allow_unsafe_commands {
            config.tools.allow_unsafe_commands = true;
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
    }
}
