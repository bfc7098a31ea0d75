//! Scenario-based tests for cicd-runner

mod concurrency;
mod environment;
mod failure_handling;
mod hooks;
mod mock_runs;
