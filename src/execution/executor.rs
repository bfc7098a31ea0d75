//! Executor contract shared by the local and mock executors

use crate::core::{Step, StepResult};
use crate::execution::{LocalExecutor, MockExecutor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Used when a timeout is too large to be represented as an instant
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Plumbing failures of the execution mechanism itself.
///
/// A command that runs and fails is reported through
/// [`StepResult::success`], never through this error.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to prepare workspace {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot execute step '{step}': {reason}")]
    InvalidStep { step: String, reason: String },
}

/// Available executor implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorKind {
    Local,
    Mock,
}

impl ExecutorKind {
    /// Select a kind from its type string, falling back to local
    pub fn from_type(kind: &str) -> Self {
        match kind {
            "mock" => ExecutorKind::Mock,
            _ => ExecutorKind::Local,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorKind::Local => "local",
            ExecutorKind::Mock => "mock",
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cancellation scope shared by everything running under one deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    deadline: Instant,
}

impl ExecutionContext {
    /// Scope expiring `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: deadline_after(timeout),
        }
    }

    /// Nested scope expiring after `timeout` or with this one, whichever is first
    pub fn narrowed(&self, timeout: Duration) -> Self {
        Self {
            deadline: self.deadline.min(deadline_after(timeout)),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Time left before expiry
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

/// Trait for step execution - allows for different implementations
#[async_trait]
pub trait Executor: Send + Sync {
    /// Prepare the execution environment; called once per run before any step
    async fn setup(&self, ctx: &ExecutionContext, workspace: &Path) -> Result<(), ExecutorError>;

    /// Run every command of a step, stopping at the first failure
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        step: &Arc<Step>,
        env: &HashMap<String, String>,
        workspace: &Path,
    ) -> Result<StepResult, ExecutorError>;

    /// Release whatever `setup` acquired
    async fn teardown(&self, ctx: &ExecutionContext, workspace: &Path) -> Result<(), ExecutorError>;

    /// Which implementation this is
    fn kind(&self) -> ExecutorKind;

    /// Stable type identifier, "local" or "mock"
    fn type_name(&self) -> &'static str {
        self.kind().as_str()
    }
}

/// Create an executor from its type string; unknown types get the local executor
pub fn new_executor(kind: &str) -> Arc<dyn Executor> {
    match ExecutorKind::from_type(kind) {
        ExecutorKind::Mock => Arc::new(MockExecutor::new()),
        ExecutorKind::Local => Arc::new(LocalExecutor::new()),
    }
}
