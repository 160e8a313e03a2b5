//! CLI module for triloop - command-line interface and subcommands.

pub mod commands;

pub use commands::{Cli, Commands, RunArgs};
