//! workflow-runner - an event-triggered, fail-fast CI workflow runner

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;

// Re-export commonly used types
pub use crate::core::{should_run, Event, EventKind, PipelineVerdict, RunPhase, RunResult, Step, WorkflowDefinition};
pub use crate::execution::{CommandExecutor, ExecutionEngine, ExecutionEvent, LocalProvisioner, Provisioner, ShellExecutor};
