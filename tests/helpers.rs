//! Test utility functions for workflow-runner

#![allow(dead_code)]

use workflow_runner::core::config::WorkflowConfig;
use workflow_runner::core::{Event, PipelineVerdict, RunFailure, RunPhase, RunResult, WorkflowDefinition};
use workflow_runner::execution::{
    CommandExecutor, CommandOutput, CommandRequest, ExecutionEngine, ExecutionEvent, ExecutorError,
    ProvisionError, ProvisionedEnvironment, Provisioner,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// A request the mock executor received
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub command: String,
    pub env: HashMap<String, String>,
}

/// Mock executor with scripted exit codes
///
/// Commands not in the script exit with 0. Commands in `spawn_errors` fail to
/// start at all.
#[derive(Clone, Default)]
pub struct MockExecutor {
    exit_codes: Arc<HashMap<String, i32>>,
    spawn_errors: Arc<Vec<String>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit_codes(exit_codes: &[(&str, i32)]) -> Self {
        Self {
            exit_codes: Arc::new(
                exit_codes
                    .iter()
                    .map(|(command, code)| (command.to_string(), *code))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn with_spawn_error(mut self, command: &str) -> Self {
        let mut errors = (*self.spawn_errors).clone();
        errors.push(command.to_string());
        self.spawn_errors = Arc::new(errors);
        self
    }

    /// Commands executed so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|call| call.command.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn run(&self, request: &CommandRequest) -> Result<CommandOutput, ExecutorError> {
        self.calls.lock().unwrap().push(RecordedCall {
            command: request.command.clone(),
            env: request.env.clone(),
        });

        if self.spawn_errors.contains(&request.command) {
            return Err(ExecutorError::Spawn(format!(
                "MockExecutor: cannot start `{}`",
                request.command
            )));
        }

        let exit_code = self.exit_codes.get(&request.command).copied().unwrap_or(0);
        Ok(CommandOutput {
            exit_code,
            stdout: format!("ran {}\n", request.command),
            stderr: if exit_code == 0 {
                String::new()
            } else {
                format!("{} failed\n", request.command)
            },
        })
    }
}

/// Provisioner that skips host checks, or always fails
#[derive(Clone, Default)]
pub struct MockProvisioner {
    pub fail_with: Option<String>,
}

impl MockProvisioner {
    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
        }
    }
}

#[async_trait]
impl Provisioner for MockProvisioner {
    async fn provision(
        &self,
        definition: &WorkflowDefinition,
        event: &Event,
        run_id: Uuid,
    ) -> Result<ProvisionedEnvironment, ProvisionError> {
        if let Some(reason) = &self.fail_with {
            return Err(ProvisionError::RuntimeUnavailable {
                runtime_version: definition.job.runtime_version.clone(),
                command: "runtime check".to_string(),
                exit_code: 127,
                stderr: reason.clone(),
            });
        }
        Ok(ProvisionedEnvironment::for_run(definition, event, run_id))
    }
}

/// Test result from running a workflow
#[derive(Debug, Clone)]
pub struct WorkflowTestResult {
    pub verdict: PipelineVerdict,
    pub commands: Vec<String>,
    pub events: Vec<ExecutionEvent>,
}

impl WorkflowTestResult {
    pub fn is_success(&self) -> bool {
        self.verdict.phase == RunPhase::Succeeded
    }

    pub fn is_failed(&self) -> bool {
        self.verdict.phase == RunPhase::Failed
    }

    pub fn is_skipped(&self) -> bool {
        self.verdict.phase == RunPhase::Skipped
    }

    /// Result of a step by name, if it ran
    pub fn step_result(&self, step_name: &str) -> Option<&RunResult> {
        self.verdict.results.iter().find(|r| r.step_name == step_name)
    }

    /// Names of executed steps, in order
    pub fn executed_steps(&self) -> Vec<String> {
        self.verdict
            .results
            .iter()
            .map(|r| r.step_name.clone())
            .collect()
    }

    pub fn summary(&self) -> String {
        let phase = match self.verdict.phase {
            RunPhase::Succeeded => "✅ Succeeded",
            RunPhase::Failed => "❌ Failed",
            RunPhase::Skipped => "⏭️ Skipped",
            _ => "❓ Unfinished",
        };
        format!(
            "{} - {}/{} steps executed, failure: {:?}",
            phase,
            self.verdict.results.len(),
            self.verdict.total_steps,
            self.verdict.failure
        )
    }
}

/// Run a workflow with a mock executor and a mock provisioner
pub async fn run_workflow_with_mock(
    definition: &WorkflowDefinition,
    event: &Event,
    executor: MockExecutor,
) -> WorkflowTestResult {
    run_workflow_with(definition, event, executor, MockProvisioner::default()).await
}

/// Run a workflow with any provisioner, collecting emitted events
pub async fn run_workflow_with<P: Provisioner + 'static>(
    definition: &WorkflowDefinition,
    event: &Event,
    executor: MockExecutor,
    provisioner: P,
) -> WorkflowTestResult {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let mut engine = ExecutionEngine::new(executor.clone(), provisioner);
    engine.add_event_handler(move |event| sink.lock().unwrap().push(event));

    let verdict = engine
        .execute(event, definition)
        .await
        .unwrap_or_else(|e| panic!("Run hit an illegal transition: {}", e));

    let events = events.lock().unwrap().clone();
    WorkflowTestResult {
        verdict,
        commands: executor.commands(),
        events,
    }
}

/// Assert a step ran and succeeded
pub fn assert_step_succeeded(result: &WorkflowTestResult, step_name: &str) {
    let step = result
        .step_result(step_name)
        .unwrap_or_else(|| panic!("Step '{}' did not run: {}", step_name, result.summary()));

    assert!(
        step.succeeded,
        "Step '{}' should have succeeded, exit code {}",
        step_name, step.exit_code
    );
}

/// Assert a step ran and failed with the given exit code
pub fn assert_step_failed(result: &WorkflowTestResult, step_name: &str, exit_code: i32) {
    let step = result
        .step_result(step_name)
        .unwrap_or_else(|| panic!("Step '{}' did not run: {}", step_name, result.summary()));

    assert!(!step.succeeded, "Step '{}' should have failed", step_name);
    assert_eq!(
        step.exit_code, exit_code,
        "Step '{}' exit code mismatch",
        step_name
    );
}

/// Assert a step never ran
pub fn assert_step_not_run(result: &WorkflowTestResult, step_name: &str) {
    assert!(
        result.step_result(step_name).is_none(),
        "Step '{}' should not have run: {}",
        step_name,
        result.summary()
    );
}

pub fn assert_workflow_succeeded(result: &WorkflowTestResult) {
    assert!(
        result.is_success(),
        "Workflow should have succeeded, but was: {}",
        result.summary()
    );
    assert!(result.verdict.ran);
    assert!(result.verdict.success);
}

pub fn assert_workflow_failed(result: &WorkflowTestResult) {
    assert!(
        result.is_failed(),
        "Workflow should have failed, but was: {}",
        result.summary()
    );
    assert!(result.verdict.ran);
    assert!(!result.verdict.success);
}

pub fn assert_workflow_skipped(result: &WorkflowTestResult) {
    assert!(
        result.is_skipped(),
        "Workflow should have been skipped, but was: {}",
        result.summary()
    );
    assert!(!result.verdict.ran);
    assert!(result.verdict.results.is_empty());
    assert!(result.commands.is_empty(), "No command may run for a skipped workflow");
}

/// Assert steps ran in exactly this order
pub fn assert_execution_order(result: &WorkflowTestResult, expected_order: &[&str]) {
    let actual = result.executed_steps();
    assert_eq!(
        actual, expected_order,
        "Expected execution order: {:?}\nActual: {:?}",
        expected_order, actual
    );
}

/// Assert the run failed at a specific step
pub fn assert_failed_at(result: &WorkflowTestResult, step_index: usize, exit_code: i32) {
    match &result.verdict.failure {
        Some(RunFailure::Step {
            step_index: index,
            exit_code: code,
            ..
        }) => {
            assert_eq!(*index, step_index, "Failing step index mismatch");
            assert_eq!(*code, exit_code, "Failing exit code mismatch");
        }
        other => panic!("Expected a step failure, got {:?}", other),
    }
}

/// Parse a workflow from a YAML string
pub fn workflow_from_yaml(yaml: &str) -> WorkflowDefinition {
    let config = WorkflowConfig::from_yaml(yaml)
        .unwrap_or_else(|e| panic!("Failed to parse workflow YAML: {:#}", e));
    config.to_workflow()
}

/// The canonical test job: push and PR on develop, install then test
pub fn python_tests_workflow() -> WorkflowDefinition {
    workflow_from_yaml(
        r#"
name: "Tests"
triggers:
  push:
    branches: ["develop"]
  pull_request:
    branches: ["develop"]
job:
  runtime_version: "3.10"
  steps:
    - name: "install"
      command: "pip install -e .[dev]"
    - name: "test"
      command: "python -m unittest discover -v tests"
"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_workflow_with_mock_simple() {
        let result = run_workflow_with_mock(
            &python_tests_workflow(),
            &Event::push("develop"),
            MockExecutor::new(),
        )
        .await;

        assert_workflow_succeeded(&result);
        assert_step_succeeded(&result, "install");
        assert_execution_order(&result, &["install", "test"]);
    }

    #[tokio::test]
    async fn test_mock_executor_scripts_exit_codes() {
        let executor = MockExecutor::with_exit_codes(&[("b", 7)]);
        let request = CommandRequest::new("b", ".");

        let output = executor.run(&request).await.unwrap();
        assert_eq!(output.exit_code, 7);
        assert_eq!(executor.commands(), vec!["b".to_string()]);
    }
}
