//! CLI command definitions

use crate::core::{Event, EventKind};
use clap::Args;

/// Run a workflow
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to workflow YAML file
    #[arg(short, long)]
    pub file: String,

    /// Kind of the incoming event
    #[arg(short, long, value_enum)]
    pub event: EventArg,

    /// Branch the event targets
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,
}

impl RunCommand {
    /// Build the event this invocation describes
    pub fn to_event(&self) -> Event {
        Event {
            kind: self.event.into(),
            target_branch: self.branch.clone(),
        }
    }
}

/// Validate a workflow file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to workflow YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Workflow name to filter by
    #[arg(short, long)]
    pub workflow: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a single run
    #[arg(long)]
    pub run_id: Option<String>,
}

/// Event kind argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EventArg {
    Push,
    #[clap(name = "pull-request")]
    PullRequest,
    Manual,
}

impl From<EventArg> for EventKind {
    fn from(arg: EventArg) -> Self {
        match arg {
            EventArg::Push => EventKind::Push,
            EventArg::PullRequest => EventKind::PullRequest,
            EventArg::Manual => EventKind::Manual,
        }
    }
}
