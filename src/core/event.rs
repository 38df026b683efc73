//! Incoming source-control events

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of event that can start a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Commits pushed to a branch
    Push,
    /// Pull request targeting a branch
    PullRequest,
    /// Operator-initiated dispatch
    Manual,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Push => "push",
            EventKind::PullRequest => "pull_request",
            EventKind::Manual => "manual",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event delivered by the source-control system
///
/// Events are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,

    /// Branch pushed to, or targeted by the pull request
    pub target_branch: Option<String>,
}

impl Event {
    pub fn push(branch: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Push,
            target_branch: Some(branch.into()),
        }
    }

    pub fn pull_request(branch: impl Into<String>) -> Self {
        Self {
            kind: EventKind::PullRequest,
            target_branch: Some(branch.into()),
        }
    }

    pub fn manual() -> Self {
        Self {
            kind: EventKind::Manual,
            target_branch: None,
        }
    }

    /// Branch name, or an empty string when the event carries none
    pub fn branch(&self) -> &str {
        self.target_branch.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target_branch {
            Some(branch) => write!(f, "{} ({})", self.kind, branch),
            None => write!(f, "{}", self.kind),
        }
    }
}
