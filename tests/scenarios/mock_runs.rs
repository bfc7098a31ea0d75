//! Test: Mock runs - dry runs that never touch the OS

use crate::helpers::*;
use cicd_runner::core::StepResult;
use cicd_runner::MockExecutor;
use std::time::Duration;

/// Steps named like failures fail in mock runs
#[tokio::test]
async fn test_mock_failure_by_name() {
    let yaml = r#"
name: "Test: Mock"
steps:
  - name: success-step
    commands: ["echo ok"]
  - name: fail-step
    commands: ["echo no"]
"#;

    let result = run_mock(yaml, MockExecutor::new()).await;

    assert_pipeline_failed_at(&result, "fail-step");
    assert_step_succeeded(&result, "success-step", "[MOCK] Running: echo ok");
    assert_step_failed(&result, "fail-step", "Mock execution failed (simulated)");
    assert_eq!(result.report().results.len(), 2);
}

/// Mock runs never execute commands
#[tokio::test]
async fn test_mock_does_not_execute() {
    let yaml = r#"
name: "Test: Mock Side Effects"
steps:
  - name: touch
    commands: ["touch should-not-exist"]
"#;

    let result = run_mock(yaml, MockExecutor::new().with_delay(Duration::ZERO)).await;

    assert_pipeline_completed(&result);
    assert!(!result.dir.path().join("workspace").join("should-not-exist").exists());
}

/// Registered results drive the run verdict
#[tokio::test]
async fn test_registered_results() {
    let yaml = r#"
name: "Test: Registered"
steps:
  - name: flaky
    commands: ["./flaky.sh"]
  - name: error-report
    commands: ["./report.sh"]
"#;

    let mut executor = MockExecutor::new().with_delay(Duration::ZERO);
    executor.set_result(
        "flaky",
        StepResult {
            success: false,
            exit_code: 137,
            output: "OOM".to_string(),
            error: "killed".to_string(),
            ..Default::default()
        },
    );
    executor.set_result(
        "error-report",
        StepResult {
            success: true,
            output: "report ready".to_string(),
            ..Default::default()
        },
    );

    let result = run_mock(yaml, executor).await;

    assert_pipeline_failed_at(&result, "flaky");
    assert_eq!(result.step("flaky").exit_code, 137);
    assert_step_succeeded(&result, "error-report", "report ready");
}

/// The JSON report names steps and carries durations in milliseconds
#[tokio::test]
async fn test_report_serializes() {
    let yaml = r#"
name: "Test: JSON"
steps:
  - name: build
    commands: ["make"]
"#;

    let result = run_mock(yaml, MockExecutor::new().with_delay(Duration::ZERO)).await;
    let json = serde_json::to_value(result.report()).unwrap();

    assert_eq!(json["pipeline_name"], "Test: JSON");
    assert_eq!(json["status"], "completed");
    assert_eq!(json["results"][0]["step"], "build");
    assert!(json["results"][0]["duration_ms"].is_u64());
    assert!(json.get("declared_steps").is_none());
}
