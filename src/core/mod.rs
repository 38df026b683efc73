//! Core domain models

pub mod config;
pub mod event;
pub mod state;
pub mod step;
pub mod trigger;
pub mod workflow;

pub use event::{Event, EventKind};
pub use state::{PipelineVerdict, RunFailure, RunPhase, RunResult, RunState, TransitionError, SKIPPED_EXIT_CODE};
pub use step::Step;
pub use trigger::should_run;
pub use workflow::{BranchTrigger, JobSpec, Triggers, WorkflowDefinition};
