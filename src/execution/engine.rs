//! Main execution engine - orchestrates a single workflow run

use crate::{
    core::{
        should_run, Event, PipelineVerdict, RunFailure, RunPhase, RunResult, RunState,
        TransitionError, WorkflowDefinition,
    },
    execution::{
        executor::CommandExecutor,
        provisioner::Provisioner,
        runner::StepRunner,
    },
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        run_id: Uuid,
        workflow_name: String,
        event: Event,
    },
    RunSkipped {
        run_id: Uuid,
        event: Event,
    },
    ProvisioningStarted {
        runtime_version: String,
    },
    ProvisioningFailed {
        error: String,
    },
    EnvironmentReady {
        runtime_version: String,
        working_directory: String,
    },
    StepStarted {
        step_index: usize,
        step_name: String,
        total_steps: usize,
    },
    StepFinished {
        result: RunResult,
    },
    RunCompleted {
        run_id: Uuid,
        phase: RunPhase,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Pipeline controller: trigger evaluation, provisioning, then the step runner
///
/// The engine holds no per-run state; every call to [`ExecutionEngine::execute`]
/// builds a fresh [`RunState`].
pub struct ExecutionEngine<E, P> {
    runner: StepRunner<E>,
    provisioner: P,
    event_handlers: Vec<EventHandler>,
}

impl<E: CommandExecutor, P: Provisioner> ExecutionEngine<E, P> {
    pub fn new(executor: E, provisioner: P) -> Self {
        Self {
            runner: StepRunner::new(executor),
            provisioner,
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Run the workflow for `event` and produce its verdict
    pub async fn execute(
        &self,
        event: &Event,
        definition: &WorkflowDefinition,
    ) -> Result<PipelineVerdict, TransitionError> {
        let mut state = RunState::new(definition.step_count());
        let run_id = state.run_id;

        state.transition(RunPhase::Evaluating)?;
        self.emit_event(ExecutionEvent::RunStarted {
            run_id,
            workflow_name: definition.name.clone(),
            event: event.clone(),
        });

        if !should_run(event, definition) {
            info!("Event {} does not match triggers of {}, skipping", event, definition.name);
            state.transition(RunPhase::Skipped)?;
            self.emit_event(ExecutionEvent::RunSkipped {
                run_id,
                event: event.clone(),
            });
            return Ok(self.finish(definition, event, state));
        }

        info!("Starting workflow run: {} ({})", definition.name, run_id);
        state.transition(RunPhase::Provisioning)?;
        self.emit_event(ExecutionEvent::ProvisioningStarted {
            runtime_version: definition.job.runtime_version.clone(),
        });

        let env = match self.provisioner.provision(definition, event, run_id).await {
            Ok(env) => env,
            Err(e) => {
                error!("Provisioning failed for {}: {}", definition.name, e);
                self.emit_event(ExecutionEvent::ProvisioningFailed {
                    error: e.to_string(),
                });
                state.fail(RunFailure::Provisioning {
                    message: e.to_string(),
                })?;
                return Ok(self.finish(definition, event, state));
            }
        };

        state.transition(RunPhase::Running)?;
        self.emit_event(ExecutionEvent::EnvironmentReady {
            runtime_version: env.runtime_version.clone(),
            working_directory: env.working_directory.display().to_string(),
        });

        let emit = |e: ExecutionEvent| self.emit_event(e);
        state.results = self
            .runner
            .run_observed(&definition.job.steps, &env, &emit)
            .await;

        match state.results.iter().find(|r| !r.succeeded) {
            Some(failed) => {
                warn!(
                    "Workflow {} failed at step {} '{}'",
                    definition.name,
                    failed.step_index + 1,
                    failed.step_name
                );
                let failure = RunFailure::Step {
                    step_index: failed.step_index,
                    step_name: failed.step_name.clone(),
                    exit_code: failed.exit_code,
                };
                state.fail(failure)?;
            }
            None => state.transition(RunPhase::Succeeded)?,
        }

        Ok(self.finish(definition, event, state))
    }

    fn finish(&self, definition: &WorkflowDefinition, event: &Event, state: RunState) -> PipelineVerdict {
        info!(
            "Workflow run finished: {} - {:?}",
            definition.name, state.phase
        );
        self.emit_event(ExecutionEvent::RunCompleted {
            run_id: state.run_id,
            phase: state.phase,
        });
        PipelineVerdict::from_state(&definition.name, event, state)
    }
}
