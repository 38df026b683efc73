//! Test: Provisioning Failure - no step runs when the environment can't be prepared

use crate::helpers::*;
use workflow_runner::core::{Event, RunFailure};
use workflow_runner::execution::{ExecutionEvent, LocalProvisioner};

/// A provisioning error fails the run before any step
#[tokio::test]
async fn test_provisioning_error_runs_no_steps() {
    let result = run_workflow_with(
        &python_tests_workflow(),
        &Event::push("develop"),
        MockExecutor::new(),
        MockProvisioner::failing("python3.10: command not found"),
    )
    .await;

    assert_workflow_failed(&result);
    assert!(result.verdict.results.is_empty());
    assert!(result.commands.is_empty());

    match &result.verdict.failure {
        Some(RunFailure::Provisioning { message }) => {
            assert!(message.contains("command not found"), "unexpected message: {}", message)
        }
        other => panic!("Expected a provisioning failure, got {:?}", other),
    }

    assert!(result
        .events
        .iter()
        .any(|e| matches!(e, ExecutionEvent::ProvisioningFailed { .. })));
    assert!(!result
        .events
        .iter()
        .any(|e| matches!(e, ExecutionEvent::StepStarted { .. })));
}

/// A failing runtime check is a provisioning error, not a step failure
#[tokio::test]
async fn test_runtime_check_failure() {
    let workflow = workflow_from_yaml(
        r#"
triggers:
  manual: true
job:
  runtime_version: "3.10"
  runtime_check: "python{{ runtime_version }} --version"
  steps:
    - name: "test"
      command: "make test"
"#,
    );
    let executor = MockExecutor::with_exit_codes(&[("python3.10 --version", 127)]);

    let result = run_workflow_with(
        &workflow,
        &Event::manual(),
        executor.clone(),
        LocalProvisioner::new(executor),
    )
    .await;

    assert_workflow_failed(&result);
    assert!(result.verdict.results.is_empty());
    assert!(matches!(result.verdict.failure, Some(RunFailure::Provisioning { .. })));

    // Only the runtime probe ran
    assert_eq!(result.commands, vec!["python3.10 --version"]);
}

/// A missing working directory fails provisioning
#[tokio::test]
async fn test_missing_working_directory() {
    let workflow = workflow_from_yaml(
        r#"
triggers:
  manual: true
job:
  runtime_version: "3.10"
  working_directory: "/nonexistent/workflow-runner/checkout"
  steps:
    - name: "test"
      command: "make test"
"#,
    );
    let executor = MockExecutor::new();

    let result = run_workflow_with(
        &workflow,
        &Event::manual(),
        executor.clone(),
        LocalProvisioner::new(executor),
    )
    .await;

    assert_workflow_failed(&result);
    assert!(result.commands.is_empty());
}

/// A skipped run never reaches the provisioner
#[tokio::test]
async fn test_skip_happens_before_provisioning() {
    let result = run_workflow_with(
        &python_tests_workflow(),
        &Event::push("main"),
        MockExecutor::new(),
        MockProvisioner::failing("should not be called"),
    )
    .await;

    assert_workflow_skipped(&result);
    assert!(result.verdict.failure.is_none());
}
