//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{HistoryCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;

/// Event-triggered CI workflow runner
#[derive(Debug, Parser, Clone)]
#[command(name = "workflow-runner")]
#[command(author = "Workflow Runner Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Runs a single CI job when an event matches its triggers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print each step's output as soon as the step finishes
    #[arg(short, long, global = true)]
    pub stream: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a workflow for an event
    Run(RunCommand),

    /// Validate a workflow file
    Validate(ValidateCommand),

    /// Show run history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
