//! Test: Environment - variable layering and workspace selection

use crate::helpers::*;

/// Step env beats pipeline env beats config env beats the inherited environment
#[tokio::test]
async fn test_environment_precedence() {
    let inherited_path = std::env::var("PATH").unwrap_or_default();

    let yaml = r#"
name: "Test: Environment"
env:
  PIPELINE_VAR: pipeline
  SHARED_VAR: pipeline
steps:
  - name: show
    env:
      SHARED_VAR: step
      HOME: /step-home
    commands:
      - echo "inherited=$PATH"
      - echo "shadowed=$HOME"
      - echo "pipeline=$PIPELINE_VAR"
      - echo "shared=$SHARED_VAR"
      - echo "config=$CONFIG_VAR"
"#;

    let result = run_local_with(yaml, |config| {
        config.set_env("CONFIG_VAR", "config");
        config.set_env("PIPELINE_VAR", "config");
    })
    .await;

    assert_pipeline_completed(&result);
    let output = &result.step("show").output;
    assert!(output.contains(&format!("inherited={}", inherited_path)), "{}", output);
    assert!(output.contains("shadowed=/step-home"), "{}", output);
    assert!(output.contains("pipeline=pipeline"), "{}", output);
    assert!(output.contains("shared=step"), "{}", output);
    assert!(output.contains("config=config"), "{}", output);
}

/// Steps run inside the configured workspace, which setup creates
#[tokio::test]
async fn test_steps_share_config_workspace() {
    let yaml = r#"
name: "Test: Workspace"
concurrency: 1
steps:
  - name: write
    commands: ["echo artifact > artifact.txt"]
  - name: read
    commands: ["cat artifact.txt"]
"#;

    let result = run_local(yaml).await;

    assert_pipeline_completed(&result);
    assert_step_succeeded(&result, "read", "artifact");
    assert!(result.workspace().join("artifact.txt").exists());
    assert_eq!(result.report().workspace, result.workspace());
}

/// A pipeline workspace overrides the configured one
#[tokio::test]
async fn test_pipeline_workspace_override() {
    let custom = tempfile::tempdir().unwrap();
    let target = custom.path().join("nested").join("ws");
    let yaml = format!(
        r#"
name: "Test: Workspace Override"
workspace: "{}"
steps:
  - name: mark
    commands: ["touch marker"]
"#,
        target.display()
    );

    let result = run_local(&yaml).await;

    assert_pipeline_completed(&result);
    assert!(target.join("marker").exists());
    assert!(!result.workspace().exists());
}

/// Arguments are split on whitespace without shell quoting
#[tokio::test]
async fn test_direct_invocation_does_not_interpret_quotes() {
    let yaml = r#"
name: "Test: Direct Invocation"
steps:
  - name: quoted
    commands: ["echo 'two words'"]
"#;

    let result = run_local(yaml).await;

    assert_step_succeeded(&result, "quoted", "'two words'");
}
