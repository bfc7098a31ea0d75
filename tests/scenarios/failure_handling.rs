//! Test: Failure Handling - failed commands, verdicts and load errors

use crate::helpers::*;
use cicd_runner::core::ExecutionStatus;
use cicd_runner::execution::{RunError, Runner};
use cicd_runner::LocalExecutor;
use std::sync::Arc;

/// A failing command fails its step and the run, other steps still report
#[tokio::test]
async fn test_failed_step_fails_run() {
    let yaml = r#"
name: "Test: Failed Step"
concurrency: 2
steps:
  - name: build
    commands: ["echo built"]
  - name: test
    commands: ["echo running tests", "false", "echo unreachable"]
"#;

    let result = run_local(yaml).await;

    assert_pipeline_failed_at(&result, "test");
    assert_step_succeeded(&result, "build", "built");
    assert_step_failed(&result, "test", "exit status 1");

    let test = result.step("test");
    assert!(test.output.contains("running tests"));
    assert!(!test.output.contains("unreachable"));
    assert_eq!(result.report().status, ExecutionStatus::Failed);
}

/// The exit code of the failing command is reported
#[tokio::test]
async fn test_exit_code_is_preserved() {
    let yaml = r#"
name: "Test: Exit Code"
steps:
  - name: exits
    commands: ["exit 42; true"]
"#;

    let result = run_local(yaml).await;

    assert_step_failed(&result, "exits", "exit status 42");
    assert_eq!(result.step("exits").exit_code, 42);
}

/// A program that does not exist is a failed step, not a crashed run
#[tokio::test]
async fn test_missing_program() {
    let yaml = r#"
name: "Test: Missing Program"
steps:
  - name: missing
    commands: ["no-such-program-for-cicd-runner --flag"]
"#;

    let result = run_local(yaml).await;

    assert_pipeline_failed_at(&result, "missing");
    assert_step_failed(&result, "missing", "failed to start");
    assert_eq!(result.step("missing").exit_code, 1);
}

/// Every failing step is recorded, the verdict names one of them
#[tokio::test]
async fn test_multiple_failures() {
    let yaml = r#"
name: "Test: Multiple Failures"
concurrency: 3
steps:
  - name: first-bad
    commands: ["false"]
  - name: good
    commands: ["true"]
  - name: second-bad
    commands: ["false"]
"#;

    let result = run_local(yaml).await;
    let report = result.report();

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.failed_steps().len(), 2);

    let named = report.first_failure().unwrap().step_name().to_string();
    assert!(named == "first-bad" || named == "second-bad");
    assert_pipeline_failed_at(&result, &named);
}

/// Invalid pipelines are rejected before anything runs
#[tokio::test]
async fn test_invalid_pipeline_rejected() {
    let yaml = r#"
name: "Test: Invalid"
steps:
  - name: touches
    commands: ["touch should-not-exist"]
  - name: ""
    commands: ["true"]
"#;

    let result = run_local(yaml).await;

    let err = result.outcome.as_ref().unwrap_err();
    assert!(matches!(err, RunError::Load(_)));
    assert!(err.to_string().contains("step 1"));
    assert!(err.to_string().contains("step name is required"));
    assert!(!result.workspace().join("should-not-exist").exists());
}

/// Malformed YAML is a load error
#[tokio::test]
async fn test_malformed_yaml() {
    let result = run_local("name: [unterminated\nsteps: {").await;

    let err = result.outcome.as_ref().unwrap_err();
    assert!(err.to_string().starts_with("failed to load pipeline"));
    assert!(err.report().is_none());
}

/// A missing pipeline file is a load error
#[tokio::test]
async fn test_missing_pipeline_file() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Runner::with_executor(test_config(dir.path()), Arc::new(LocalExecutor::new()));

    let err = runner.run(dir.path().join("absent.yaml")).await.unwrap_err();
    assert!(matches!(err, RunError::Load(_)));
    assert!(!dir.path().join("workspace").exists(), "setup must not run");
}
