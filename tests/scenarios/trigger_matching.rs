//! Test: Trigger Matching - which events start a run

use crate::helpers::*;
use workflow_runner::core::{should_run, Event};

/// Push to a listed branch runs the job
#[tokio::test]
async fn test_push_to_listed_branch_runs() {
    let workflow = python_tests_workflow();

    let result = run_workflow_with_mock(&workflow, &Event::push("develop"), MockExecutor::new()).await;

    assert!(result.verdict.ran);
    assert_workflow_succeeded(&result);
}

/// Push to any other branch is skipped without running anything
#[tokio::test]
async fn test_push_to_other_branch_is_skipped() {
    let workflow = python_tests_workflow();

    let result = run_workflow_with_mock(&workflow, &Event::push("main"), MockExecutor::new()).await;

    assert_workflow_skipped(&result);
    assert_eq!(result.verdict.exit_code(), 3);
}

/// Pull requests are matched against their own branch filter
#[tokio::test]
async fn test_pull_request_branch_filter() {
    let workflow = workflow_from_yaml(
        r#"
name: "PR only"
triggers:
  pull_request:
    branches: ["develop", "release"]
job:
  runtime_version: "3.10"
  steps:
    - name: "test"
      command: "make test"
"#,
    );

    let matched = run_workflow_with_mock(&workflow, &Event::pull_request("release"), MockExecutor::new()).await;
    assert_workflow_succeeded(&matched);

    let pushed = run_workflow_with_mock(&workflow, &Event::push("release"), MockExecutor::new()).await;
    assert_workflow_skipped(&pushed);
}

/// Manual dispatch runs regardless of branch when allowed
#[tokio::test]
async fn test_manual_dispatch_ignores_branch() {
    let workflow = workflow_from_yaml(
        r#"
name: "Manual"
triggers:
  push:
    branches: ["develop"]
  manual: true
job:
  runtime_version: "3.10"
  steps:
    - name: "test"
      command: "make test"
"#,
    );

    let without_branch = run_workflow_with_mock(&workflow, &Event::manual(), MockExecutor::new()).await;
    assert_workflow_succeeded(&without_branch);

    let mut on_branch = Event::manual();
    on_branch.target_branch = Some("feature/x".to_string());
    let with_branch = run_workflow_with_mock(&workflow, &on_branch, MockExecutor::new()).await;
    assert_workflow_succeeded(&with_branch);
}

/// Manual dispatch is skipped when the workflow doesn't allow it
#[tokio::test]
async fn test_manual_dispatch_not_declared() {
    let result = run_workflow_with_mock(&python_tests_workflow(), &Event::manual(), MockExecutor::new()).await;
    assert_workflow_skipped(&result);
}

/// A branch-filtered trigger with an empty list matches nothing
#[test]
fn test_empty_branch_list_matches_nothing() {
    let workflow = workflow_from_yaml(
        r#"
triggers:
  push:
    branches: []
  manual: true
job:
  runtime_version: "3.10"
  steps:
    - name: "test"
      command: "make test"
"#,
    );

    assert!(!should_run(&Event::push("develop"), &workflow));
    assert!(!should_run(&Event::push(""), &workflow));
    assert!(should_run(&Event::manual(), &workflow));
}

/// Branch matching is exact: no prefixes, no case folding
#[test]
fn test_branch_match_is_exact() {
    let workflow = python_tests_workflow();

    assert!(should_run(&Event::push("develop"), &workflow));
    assert!(!should_run(&Event::push("Develop"), &workflow));
    assert!(!should_run(&Event::push("develop/feature"), &workflow));
    assert!(!should_run(&Event::push("dev"), &workflow));
}
