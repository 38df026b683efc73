//! Environment provisioning
//!
//! Provisioning prepares the execution context a run's steps share: the
//! working directory, the environment variables and the pinned runtime.
//! The sandbox itself is external; [`LocalProvisioner`] only checks that
//! the local host can serve as one.

use crate::core::{step::render_template, Event, WorkflowDefinition};
use crate::execution::executor::{CommandExecutor, CommandRequest, ExecutorError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Error types for provisioning
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Working directory {path} is not usable: {reason}")]
    WorkingDirectory { path: String, reason: String },

    #[error("Runtime {runtime_version} is not available: `{command}` exited with code {exit_code}: {stderr}")]
    RuntimeUnavailable {
        runtime_version: String,
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Runtime check failed: {0}")]
    Executor(#[from] ExecutorError),
}

/// The execution context of one run
///
/// Created fresh per run and dropped with it.
#[derive(Debug, Clone)]
pub struct ProvisionedEnvironment {
    pub run_id: Uuid,

    pub runtime_version: String,

    pub working_directory: PathBuf,

    /// Environment variables every step receives
    pub env: HashMap<String, String>,

    /// Values substituted into `{{ name }}` placeholders
    pub variables: HashMap<String, String>,
}

impl ProvisionedEnvironment {
    /// Build the environment a run would get, without any checks
    pub fn for_run(definition: &WorkflowDefinition, event: &Event, run_id: Uuid) -> Self {
        let mut variables = definition.template_variables(event);

        // Job env values as resolved for templates
        let mut env: HashMap<String, String> = definition
            .job
            .env
            .keys()
            .filter_map(|key| variables.get(key).map(|value| (key.clone(), value.clone())))
            .collect();
        env.insert(
            "WORKFLOW_RUNTIME_VERSION".to_string(),
            definition.job.runtime_version.clone(),
        );
        env.insert("WORKFLOW_EVENT".to_string(), event.kind.to_string());
        env.insert("WORKFLOW_BRANCH".to_string(), event.branch().to_string());
        env.insert("WORKFLOW_RUN_ID".to_string(), run_id.to_string());

        variables.insert("run_id".to_string(), run_id.to_string());

        Self {
            run_id,
            runtime_version: definition.job.runtime_version.clone(),
            working_directory: definition.job.working_directory.clone(),
            env,
            variables,
        }
    }
}

/// Trait for environment provisioning
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn provision(
        &self,
        definition: &WorkflowDefinition,
        event: &Event,
        run_id: Uuid,
    ) -> Result<ProvisionedEnvironment, ProvisionError>;
}

/// Provisions the local host: checks the working directory and probes the
/// runtime with the job's `runtime_check` command
#[derive(Debug, Clone)]
pub struct LocalProvisioner<E> {
    executor: E,
}

impl<E: CommandExecutor> LocalProvisioner<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl<E: CommandExecutor> Provisioner for LocalProvisioner<E> {
    async fn provision(
        &self,
        definition: &WorkflowDefinition,
        event: &Event,
        run_id: Uuid,
    ) -> Result<ProvisionedEnvironment, ProvisionError> {
        let env = ProvisionedEnvironment::for_run(definition, event, run_id);
        let path = env.working_directory.display().to_string();

        let metadata = tokio::fs::metadata(&env.working_directory)
            .await
            .map_err(|e| ProvisionError::WorkingDirectory {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        if !metadata.is_dir() {
            return Err(ProvisionError::WorkingDirectory {
                path,
                reason: "not a directory".to_string(),
            });
        }

        if let Some(check) = &definition.job.runtime_check {
            let command = render_template(check, &env.variables);
            debug!("Probing runtime {} with: {}", env.runtime_version, command);

            let mut request = CommandRequest::new(command.clone(), &env.working_directory);
            request.env = env.env.clone();

            let output = self.executor.run(&request).await?;
            if !output.success() {
                return Err(ProvisionError::RuntimeUnavailable {
                    runtime_version: env.runtime_version.clone(),
                    command,
                    exit_code: output.exit_code,
                    stderr: output.stderr.trim().to_string(),
                });
            }
        }

        info!(
            "Provisioned runtime {} in {}",
            env.runtime_version,
            env.working_directory.display()
        );
        Ok(env)
    }
}
