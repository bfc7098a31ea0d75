//! Test: Hooks - on_success and on_failure commands

use crate::helpers::*;

/// on_success hooks run after all commands pass and share the workspace
#[tokio::test]
async fn test_on_success_hook() {
    let yaml = r#"
name: "Test: On Success"
steps:
  - name: deploy
    commands: ["echo deploying"]
    on_success:
      - echo "deployed $TARGET" > notified.txt
    on_failure:
      - touch rollback.txt
    env:
      TARGET: staging
"#;

    let result = run_local(yaml).await;

    assert_pipeline_completed(&result);
    let notified = std::fs::read_to_string(result.workspace().join("notified.txt")).unwrap();
    assert_eq!(notified.trim(), "deployed staging");
    assert!(!result.workspace().join("rollback.txt").exists());
}

/// on_failure hooks run once after the failing command; their own failures are ignored
#[tokio::test]
async fn test_on_failure_hooks() {
    let yaml = r#"
name: "Test: On Failure"
steps:
  - name: deploy
    commands: ["false"]
    on_success:
      - touch notified.txt
    on_failure:
      - "false"
      - touch rollback.txt
"#;

    let result = run_local(yaml).await;

    assert_pipeline_failed_at(&result, "deploy");
    assert_step_failed(&result, "deploy", "exit status 1");
    assert!(result.workspace().join("rollback.txt").exists());
    assert!(!result.workspace().join("notified.txt").exists());
}

/// A failing on_success hook does not turn the step into a failure
#[tokio::test]
async fn test_failing_success_hook_is_ignored() {
    let yaml = r#"
name: "Test: Failing Hook"
steps:
  - name: build
    commands: ["echo ok"]
    on_success: ["no-such-notifier-for-cicd-runner"]
"#;

    let result = run_local(yaml).await;

    assert_pipeline_completed(&result);
    assert_step_succeeded(&result, "build", "ok");
}
