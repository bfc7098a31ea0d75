//! Execution state models

use crate::core::step::Step;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Overall pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Pipeline is currently running
    Running,
    /// Every executed step succeeded
    Completed,
    /// At least one step failed
    Failed,
}

/// Outcome of executing a single step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepResult {
    /// Whether every command of the step succeeded
    pub success: bool,

    /// Exit code of the failing command, 0 on success
    pub exit_code: i32,

    /// Combined stdout and stderr in command order
    pub output: String,

    /// Message of the failure, empty on success
    pub error: String,

    /// Wall-clock time spent on the step
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,

    /// The step that produced this result
    #[serde(serialize_with = "serialize_step_name")]
    pub step: Arc<Step>,
}

impl StepResult {
    /// Build a failed result for a step that could not be attempted
    pub fn failure(step: &Arc<Step>, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: false,
            exit_code: 1,
            output: String::new(),
            error: error.into(),
            duration,
            step: Arc::clone(step),
        }
    }

    /// Name of the originating step
    pub fn step_name(&self) -> &str {
        &self.step.name
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

fn serialize_step_name<S: Serializer>(step: &Arc<Step>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&step.name)
}

/// Report of one pipeline run
///
/// `results` keeps arrival order, which depends on scheduling. Use
/// [`RunReport::sorted_results`] for a reproducible presentation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Pipeline name
    pub pipeline_name: String,

    /// Workspace the steps ran in
    pub workspace: PathBuf,

    /// Effective number of concurrently running steps
    pub concurrency: usize,

    /// Current execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: DateTime<Utc>,

    /// When execution completed/failed
    pub completed_at: Option<DateTime<Utc>>,

    /// Step results in arrival order
    pub results: Vec<StepResult>,

    /// Step names in declaration order
    #[serde(skip)]
    declared_steps: Vec<String>,
}

impl RunReport {
    /// Start a report for a run
    pub fn start(
        pipeline_name: impl Into<String>,
        declared_steps: Vec<String>,
        workspace: &Path,
        concurrency: usize,
    ) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            pipeline_name: pipeline_name.into(),
            workspace: workspace.to_path_buf(),
            concurrency,
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            results: Vec::new(),
            declared_steps,
        }
    }

    /// Record the collected results and derive the final status
    pub fn finish(&mut self, results: Vec<StepResult>) {
        self.results = results;
        self.status = if self.results.iter().all(|r| r.success) {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };
        self.completed_at = Some(Utc::now());
    }

    /// Whether the run passed
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    /// First failed result found scanning in arrival order
    pub fn first_failure(&self) -> Option<&StepResult> {
        self.results.iter().find(|r| !r.success)
    }

    /// All failed results in arrival order
    pub fn failed_steps(&self) -> Vec<&StepResult> {
        self.results.iter().filter(|r| !r.success).collect()
    }

    /// Result of a step by name
    pub fn result(&self, step_name: &str) -> Option<&StepResult> {
        self.results.iter().find(|r| r.step.name == step_name)
    }

    /// Results ordered by step declaration
    pub fn sorted_results(&self) -> Vec<&StepResult> {
        let mut sorted: Vec<&StepResult> = self.results.iter().collect();
        sorted.sort_by_key(|r| {
            self.declared_steps
                .iter()
                .position(|name| *name == r.step.name)
                .unwrap_or(usize::MAX)
        });
        sorted
    }

    /// Wall-clock duration of the run, if finished
    pub fn elapsed(&self) -> Option<Duration> {
        self.completed_at
            .and_then(|end| end.signed_duration_since(self.started_at).to_std().ok())
    }
}
