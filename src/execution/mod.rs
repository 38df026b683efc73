//! Workflow execution: provisioning, step running, orchestration

pub mod engine;
pub mod executor;
pub mod provisioner;
pub mod runner;

pub use engine::{ExecutionEngine, ExecutionEvent, EventHandler};
pub use executor::{CommandExecutor, CommandOutput, CommandRequest, ExecutorError, ShellExecutor};
pub use provisioner::{LocalProvisioner, ProvisionError, ProvisionedEnvironment, Provisioner};
pub use runner::StepRunner;
