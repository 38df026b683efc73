//! Step runner - executes the job's steps in order, stopping at the first failure

use crate::{
    core::{RunResult, Step},
    execution::{
        engine::ExecutionEvent,
        executor::{CommandExecutor, CommandRequest},
        provisioner::ProvisionedEnvironment,
    },
};
use chrono::Utc;
use tracing::{error, info, warn};

/// Runs steps sequentially with fail-fast semantics
pub struct StepRunner<E> {
    executor: E,
}

impl<E: CommandExecutor> StepRunner<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run `steps` in order and return one result per executed step
    pub async fn run(&self, steps: &[Step], env: &ProvisionedEnvironment) -> Vec<RunResult> {
        self.run_observed(steps, env, &|_| {}).await
    }

    /// Like [`StepRunner::run`], reporting progress to `emit`
    ///
    /// Steps after the first failure are never started and do not appear in
    /// the returned results.
    pub async fn run_observed(
        &self,
        steps: &[Step],
        env: &ProvisionedEnvironment,
        emit: &(dyn Fn(ExecutionEvent) + Send + Sync),
    ) -> Vec<RunResult> {
        let mut results = Vec::with_capacity(steps.len());

        for step in steps {
            emit(ExecutionEvent::StepStarted {
                step_index: step.index,
                step_name: step.name.clone(),
                total_steps: steps.len(),
            });

            let result = self.run_step(step, env).await;
            let succeeded = result.succeeded;

            emit(ExecutionEvent::StepFinished {
                result: result.clone(),
            });
            results.push(result);

            if !succeeded {
                warn!(
                    "Step {} '{}' failed, skipping {} remaining step(s)",
                    step.number(),
                    step.name,
                    steps.len() - results.len()
                );
                break;
            }
        }

        results
    }

    async fn run_step(&self, step: &Step, env: &ProvisionedEnvironment) -> RunResult {
        info!("Executing step {}: {}", step.number(), step.name);

        let mut step_env = env.env.clone();
        step_env.extend(step.env.clone());

        let request = CommandRequest {
            command: step.render_command(&env.variables),
            env: step_env,
            working_directory: env.working_directory.clone(),
            timeout_secs: step.timeout_secs,
        };

        let started_at = Utc::now();
        let outcome = self.executor.run(&request).await;
        let finished_at = Utc::now();

        match outcome {
            Ok(output) => {
                let succeeded = output.success();
                if succeeded {
                    info!("Step {} completed successfully", step.name);
                } else {
                    error!("Step {} failed with exit code {}", step.name, output.exit_code);
                }
                RunResult {
                    step_index: step.index,
                    step_name: step.name.clone(),
                    exit_code: output.exit_code,
                    succeeded,
                    stdout: output.stdout,
                    stderr: output.stderr,
                    error: None,
                    started_at,
                    finished_at,
                }
            }
            Err(e) => {
                error!("Step {} could not run: {}", step.name, e);
                RunResult {
                    step_index: step.index,
                    step_name: step.name.clone(),
                    exit_code: -1,
                    succeeded: false,
                    stdout: String::new(),
                    stderr: String::new(),
                    error: Some(e.to_string()),
                    started_at,
                    finished_at,
                }
            }
        }
    }
}
