//! Local executor - runs step commands as real processes on this machine

use crate::core::{Step, StepResult};
use crate::execution::dispatch::{run_command, CommandError};
use crate::execution::executor::{ExecutionContext, Executor, ExecutorError, ExecutorKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Executes steps as local subprocesses.
///
/// Holds no mutable state, so one instance is shared by all concurrently
/// running steps.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run hook commands, ignoring their failures
    async fn run_hooks(
        &self,
        step: &Step,
        hooks: &[String],
        env: &HashMap<String, String>,
        workspace: &Path,
        ctx: &ExecutionContext,
        output: &mut Vec<u8>,
    ) {
        for hook in hooks {
            if let Err(e) = run_command(hook, env, workspace, ctx.deadline(), output).await {
                debug!("Hook '{}' of step {} failed: {}", hook, step.name, e);
            }
        }
    }
}

/// Caller environment overlaid with the step's own variables
fn compose_env(base: &HashMap<String, String>, step_env: &HashMap<String, String>) -> HashMap<String, String> {
    let mut env = base.clone();
    env.extend(step_env.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn setup(&self, _ctx: &ExecutionContext, workspace: &Path) -> Result<(), ExecutorError> {
        tokio::fs::create_dir_all(workspace)
            .await
            .map_err(|source| ExecutorError::Workspace {
                path: workspace.to_path_buf(),
                source,
            })
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        step: &Arc<Step>,
        env: &HashMap<String, String>,
        workspace: &Path,
    ) -> Result<StepResult, ExecutorError> {
        step.validate().map_err(|e| ExecutorError::InvalidStep {
            step: step.name.clone(),
            reason: e.to_string(),
        })?;

        let started = Instant::now();
        info!("Executing step: {}", step.name);

        let ctx = if step.timeout > 0 {
            ctx.narrowed(Duration::from_secs(step.timeout))
        } else {
            *ctx
        };
        let env = compose_env(env, &step.env);

        let mut output = Vec::new();
        let mut failure: Option<CommandError> = None;

        for command in &step.commands {
            if let Err(err) = run_command(command, &env, workspace, ctx.deadline(), &mut output).await {
                warn!("Step {} failed on '{}': {}", step.name, command, err);
                output.extend_from_slice(format!("\nError: {}\n", err).as_bytes());
                self.run_hooks(step, &step.on_failure, &env, workspace, &ctx, &mut output)
                    .await;
                failure = Some(err);
                break;
            }
        }

        if failure.is_none() {
            self.run_hooks(step, &step.on_success, &env, workspace, &ctx, &mut output)
                .await;
        }

        Ok(StepResult {
            success: failure.is_none(),
            exit_code: failure.as_ref().map_or(0, CommandError::exit_code),
            output: String::from_utf8_lossy(&output).into_owned(),
            error: failure.map(|e| e.to_string()).unwrap_or_default(),
            duration: started.elapsed(),
            step: Arc::clone(step),
        })
    }

    async fn teardown(&self, _ctx: &ExecutionContext, _workspace: &Path) -> Result<(), ExecutorError> {
        // Workspace is left in place for inspection
        Ok(())
    }

    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Local
    }
}
