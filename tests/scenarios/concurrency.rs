//! Test: Concurrency - bounded parallel execution

use crate::helpers::*;
use std::time::Duration;

fn sleeping_pipeline(concurrency: usize, steps: usize) -> String {
    let steps: String = (0..steps)
        .map(|i| format!("  - name: sleeper-{}\n    commands: [\"sleep 1\"]\n", i))
        .collect();
    format!(
        "name: \"Test: Concurrency\"\nconcurrency: {}\nsteps:\n{}",
        concurrency, steps
    )
}

/// Independent steps overlap up to the requested concurrency
#[tokio::test]
async fn test_steps_run_in_parallel() {
    let result = run_local(&sleeping_pipeline(4, 4)).await;

    assert_pipeline_completed(&result);
    assert_eq!(result.report().concurrency, 4);
    assert!(
        result.duration < Duration::from_millis(3500),
        "4 one-second steps with concurrency 4 took {:?}",
        result.duration
    );
}

/// Concurrency 1 runs steps one after another
#[tokio::test]
async fn test_sequential_when_concurrency_is_one() {
    let result = run_local(&sleeping_pipeline(1, 3)).await;

    assert_pipeline_completed(&result);
    assert!(
        result.duration >= Duration::from_millis(2900),
        "3 one-second steps with concurrency 1 took {:?}",
        result.duration
    );
}

/// Zero requested concurrency still runs one step at a time
#[tokio::test]
async fn test_zero_concurrency_means_one() {
    let result = run_local(&sleeping_pipeline(0, 2)).await;

    assert_pipeline_completed(&result);
    assert_eq!(result.report().concurrency, 1);
    assert!(result.duration >= Duration::from_millis(1900));
}

/// Runner capacity caps a larger request
#[tokio::test]
async fn test_capacity_caps_concurrency() {
    let result = run_local_with(&sleeping_pipeline(8, 4), |config| {
        config.runner.capacity = 2;
    })
    .await;

    assert_pipeline_completed(&result);
    assert_eq!(result.report().concurrency, 2);
    assert!(result.duration >= Duration::from_millis(1900));
}

/// Steps with a non-running `when` tag produce no result
#[tokio::test]
async fn test_when_filter() {
    let yaml = r#"
name: "Test: When"
steps:
  - name: default
    commands: ["true"]
  - name: always
    when: always
    commands: ["true"]
  - name: on-success
    when: on_success
    commands: ["true"]
  - name: manual
    when: manual
    commands: ["false"]
"#;

    let result = run_local(yaml).await;

    assert_pipeline_completed(&result);
    let names: Vec<&str> = result
        .report()
        .sorted_results()
        .iter()
        .map(|r| r.step_name())
        .collect();
    assert_eq!(names, vec!["default", "always", "on-success"]);
}
