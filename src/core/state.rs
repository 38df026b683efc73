//! Run state machine and result models

use crate::core::event::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Exit code reported when a run was skipped by its triggers
pub const SKIPPED_EXIT_CODE: i32 = 3;

/// Phase of a single workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Waiting for an event
    Idle,
    /// Checking the event against the triggers
    Evaluating,
    /// Triggers did not match (terminal)
    Skipped,
    /// Preparing the execution environment
    Provisioning,
    /// Steps are executing
    Running,
    /// Every step succeeded (terminal)
    Succeeded,
    /// Provisioning or a step failed (terminal)
    Failed,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Skipped | RunPhase::Succeeded | RunPhase::Failed)
    }

    /// Whether `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Idle, Evaluating)
                | (Evaluating, Skipped)
                | (Evaluating, Provisioning)
                | (Provisioning, Running)
                | (Provisioning, Failed)
                | (Running, Succeeded)
                | (Running, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Evaluating => "evaluating",
            RunPhase::Skipped => "skipped",
            RunPhase::Provisioning => "provisioning",
            RunPhase::Running => "running",
            RunPhase::Succeeded => "succeeded",
            RunPhase::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(RunPhase::Idle),
            "evaluating" => Some(RunPhase::Evaluating),
            "skipped" => Some(RunPhase::Skipped),
            "provisioning" => Some(RunPhase::Provisioning),
            "running" => Some(RunPhase::Running),
            "succeeded" => Some(RunPhase::Succeeded),
            "failed" => Some(RunPhase::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal run transition from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: RunPhase,
    pub to: RunPhase,
}

/// Outcome of one executed step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Zero-based index of the step
    pub step_index: usize,

    pub step_name: String,

    /// Process exit code, -1 when the command could not run to completion
    pub exit_code: i32,

    pub succeeded: bool,

    pub stdout: String,

    pub stderr: String,

    /// Spawn or timeout error, if any
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn duration_ms(&self) -> i64 {
        self.finished_at
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }
}

/// Why a run ended in the Failed phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunFailure {
    /// The environment could not be provisioned; no steps ran
    Provisioning { message: String },
    /// A step exited non-zero
    Step {
        step_index: usize,
        step_name: String,
        exit_code: i32,
    },
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunFailure::Provisioning { message } => write!(f, "provisioning failed: {}", message),
            RunFailure::Step {
                step_index,
                step_name,
                exit_code,
            } => write!(
                f,
                "step {} '{}' failed with exit code {}",
                step_index + 1,
                step_name,
                exit_code
            ),
        }
    }
}

/// Mutable state of one run; never shared between runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run ID
    pub run_id: Uuid,

    pub phase: RunPhase,

    pub started_at: Option<DateTime<Utc>>,

    pub completed_at: Option<DateTime<Utc>>,

    /// Number of declared steps
    pub total_steps: usize,

    pub results: Vec<RunResult>,

    pub failure: Option<RunFailure>,
}

impl RunState {
    pub fn new(total_steps: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            phase: RunPhase::Idle,
            started_at: None,
            completed_at: None,
            total_steps,
            results: Vec::new(),
            failure: None,
        }
    }

    /// Move to `next`, rejecting transitions the state machine does not allow
    pub fn transition(&mut self, next: RunPhase) -> Result<(), TransitionError> {
        if !self.phase.can_transition_to(next) {
            return Err(TransitionError {
                from: self.phase,
                to: next,
            });
        }

        if self.phase == RunPhase::Idle {
            self.started_at = Some(Utc::now());
        }
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        self.phase = next;
        Ok(())
    }

    /// Fail the run with a reason
    pub fn fail(&mut self, failure: RunFailure) -> Result<(), TransitionError> {
        self.transition(RunPhase::Failed)?;
        self.failure = Some(failure);
        Ok(())
    }

    /// Calculate progress percentage (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        self.results.len() as f64 / self.total_steps as f64
    }
}

/// Final verdict of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineVerdict {
    pub run_id: Uuid,

    pub workflow_name: String,

    pub event: Event,

    /// Terminal phase the run reached
    pub phase: RunPhase,

    /// Whether the triggers admitted the event
    pub ran: bool,

    pub success: bool,

    /// One entry per executed step, in order
    pub results: Vec<RunResult>,

    pub total_steps: usize,

    pub failure: Option<RunFailure>,

    pub started_at: Option<DateTime<Utc>>,

    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineVerdict {
    pub fn from_state(workflow_name: &str, event: &Event, state: RunState) -> Self {
        let ran = !matches!(state.phase, RunPhase::Skipped | RunPhase::Idle | RunPhase::Evaluating);
        Self {
            run_id: state.run_id,
            workflow_name: workflow_name.to_string(),
            event: event.clone(),
            phase: state.phase,
            ran,
            success: state.phase == RunPhase::Succeeded,
            results: state.results,
            total_steps: state.total_steps,
            failure: state.failure,
            started_at: state.started_at,
            completed_at: state.completed_at,
        }
    }

    /// The step result that failed the run, if any
    pub fn failed_step(&self) -> Option<&RunResult> {
        self.results.iter().find(|r| !r.succeeded)
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self.phase {
            RunPhase::Succeeded => 0,
            RunPhase::Skipped => SKIPPED_EXIT_CODE,
            _ => 1,
        }
    }
}
