//! Mock executor - deterministic stand-in that never touches the OS

use crate::core::{Step, StepResult};
use crate::execution::executor::{ExecutionContext, Executor, ExecutorError, ExecutorKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

const SIMULATED_DELAY: Duration = Duration::from_millis(100);
const SIMULATED_FAILURE: &str = "Mock execution failed (simulated)";

/// Simulates step execution for tests and dry runs.
///
/// Step names containing "fail" or "error" (any case) simulate a failure.
/// Registered results must be set before the executor is shared with a runner.
#[derive(Debug, Clone)]
pub struct MockExecutor {
    results: HashMap<String, StepResult>,
    delay: Duration,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            delay: SIMULATED_DELAY,
        }
    }

    /// Override the simulated execution time
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Register the result returned for a step name
    pub fn set_result(&mut self, step_name: impl Into<String>, result: StepResult) {
        self.results.insert(step_name.into(), result);
    }

    fn transcript(step: &Step, env: &HashMap<String, String>, workspace: &Path) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "[MOCK] Executing step: {}", step.name);
        let _ = writeln!(output, "[MOCK] Commands: {:?}", step.commands);
        let _ = writeln!(output, "[MOCK] Workspace: {}", workspace.display());

        if !env.is_empty() {
            output.push_str("[MOCK] Environment variables:\n");
            let mut vars: Vec<_> = env.iter().collect();
            vars.sort();
            for (key, value) in vars {
                let _ = writeln!(output, "  {}={}", key, value);
            }
        }

        for command in &step.commands {
            let _ = writeln!(output, "[MOCK] Running: {}", command);
            output.push_str("[MOCK] ✓ Command completed successfully\n");
        }

        output
    }
}

fn simulates_failure(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("fail") || name.contains("error")
}

#[async_trait]
impl Executor for MockExecutor {
    async fn setup(&self, _ctx: &ExecutionContext, _workspace: &Path) -> Result<(), ExecutorError> {
        Ok(())
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        step: &Arc<Step>,
        env: &HashMap<String, String>,
        workspace: &Path,
    ) -> Result<StepResult, ExecutorError> {
        let started = Instant::now();

        if let Some(registered) = self.results.get(&step.name) {
            let mut result = registered.clone();
            result.step = Arc::clone(step);
            result.duration = started.elapsed();
            return Ok(result);
        }

        tokio::time::sleep(self.delay).await;
        info!("[MOCK] Executed step: {}", step.name);

        let mut result = StepResult {
            success: true,
            exit_code: 0,
            output: Self::transcript(step, env, workspace),
            error: String::new(),
            duration: started.elapsed(),
            step: Arc::clone(step),
        };

        if simulates_failure(&step.name) {
            result.success = false;
            result.exit_code = 1;
            result.error = SIMULATED_FAILURE.to_string();
        }

        Ok(result)
    }

    async fn teardown(&self, _ctx: &ExecutionContext, _workspace: &Path) -> Result<(), ExecutorError> {
        Ok(())
    }

    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Mock
    }
}
