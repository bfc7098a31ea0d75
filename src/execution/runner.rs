//! Pipeline runner - loads a pipeline and runs its steps under bounded concurrency

use crate::{
    core::{Config, ExecutionStatus, Pipeline, PipelineError, RunReport, Step, StepResult},
    execution::{
        executor::{new_executor, ExecutionContext, Executor, ExecutorError},
        scheduler::{effective_concurrency, eligible_steps, ExecutionTokens},
    },
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        concurrency: usize,
    },
    StepStarted {
        step_name: String,
    },
    StepFinished {
        result: StepResult,
    },
    PipelineFinished {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Why a run did not pass
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to load pipeline: {0}")]
    Load(#[from] PipelineError),

    #[error("failed to setup executor: {0}")]
    Setup(#[source] ExecutorError),

    #[error("pipeline failed at step: {step}")]
    StepFailed { step: String, report: Box<RunReport> },
}

impl RunError {
    /// The collected results, when steps actually ran
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunError::StepFailed { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Whether the run happened and some step failed, as opposed to never starting
    pub fn is_verdict_failure(&self) -> bool {
        matches!(self, RunError::StepFailed { .. })
    }
}

/// Runs pipelines with one shared executor
pub struct Runner {
    config: Config,
    executor: Arc<dyn Executor>,
    event_handlers: Arc<Vec<EventHandler>>,
}

impl Runner {
    /// Runner using the executor selected by the configuration
    pub fn new(config: Config) -> Self {
        let executor = new_executor(&config.executor.kind);
        Self::with_executor(config, executor)
    }

    /// Runner using the given executor
    pub fn with_executor(config: Config, executor: Arc<dyn Executor>) -> Self {
        Self {
            config,
            executor,
            event_handlers: Arc::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    /// Add an event handler; handlers are called from step tasks
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        let mut handlers = self.event_handlers.as_ref().clone();
        handlers.push(Arc::new(handler));
        self.event_handlers = Arc::new(handlers);
    }

    /// Load the pipeline at `path` and run it
    pub async fn run<P: AsRef<Path>>(&self, path: P) -> Result<RunReport, RunError> {
        let pipeline = Pipeline::load(path)?;
        self.run_pipeline(pipeline).await
    }

    /// Run an already loaded pipeline
    pub async fn run_pipeline(&self, pipeline: Pipeline) -> Result<RunReport, RunError> {
        pipeline
            .validate()
            .map_err(|e| RunError::Load(PipelineError::Invalid(Box::new(e))))?;

        let workspace = if pipeline.workspace.is_empty() {
            self.config.runner.workspace.clone()
        } else {
            PathBuf::from(&pipeline.workspace)
        };
        let ctx = ExecutionContext::with_timeout(self.config.runner.timeout);

        self.executor
            .setup(&ctx, &workspace)
            .await
            .map_err(RunError::Setup)?;

        let mut base_env = self.config.executor.env.clone();
        base_env.extend(pipeline.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        let concurrency = effective_concurrency(pipeline.concurrency, self.config.runner.capacity);
        let declared = pipeline.steps.iter().map(|s| s.name.clone()).collect();
        let mut report = RunReport::start(&pipeline.name, declared, &workspace, concurrency);

        info!(
            "Starting pipeline {} ({}) with {} executor, concurrency {}",
            pipeline.name,
            report.execution_id,
            self.executor.type_name(),
            concurrency
        );
        self.emit(ExecutionEvent::PipelineStarted {
            execution_id: report.execution_id,
            pipeline_name: pipeline.name.clone(),
            concurrency,
        });

        let tokens = ExecutionTokens::new(concurrency);
        let results = Arc::new(Mutex::new(Vec::with_capacity(pipeline.steps.len())));
        let base_env = Arc::new(base_env);
        let shared_workspace = Arc::new(workspace.clone());

        let mut tasks: Vec<(Arc<Step>, JoinHandle<()>)> = Vec::new();
        for step in eligible_steps(&pipeline) {
            let task = StepTask {
                executor: Arc::clone(&self.executor),
                tokens: tokens.clone(),
                ctx,
                step: Arc::clone(&step),
                base_env: Arc::clone(&base_env),
                workspace: Arc::clone(&shared_workspace),
                handlers: Arc::clone(&self.event_handlers),
            };
            let results = Arc::clone(&results);

            let handle = tokio::spawn(async move {
                let result = task.run().await;
                emit_to(&task.handlers, ExecutionEvent::StepFinished { result: result.clone() });
                results.lock().await.push(result);
            });
            tasks.push((step, handle));
        }

        for (step, handle) in tasks {
            if let Err(e) = handle.await {
                error!("Task for step {} did not complete: {}", step.name, e);
                let result = StepResult::failure(&step, format!("step task aborted: {}", e), Duration::ZERO);
                results.lock().await.push(result);
            }
        }

        if let Err(e) = self.executor.teardown(&ctx, &workspace).await {
            warn!("Teardown failed for pipeline {}: {}", pipeline.name, e);
        }

        let collected = std::mem::take(&mut *results.lock().await);
        report.finish(collected);

        info!(
            "Pipeline {} finished: {:?} ({} steps)",
            pipeline.name,
            report.status,
            report.results.len()
        );
        self.emit(ExecutionEvent::PipelineFinished {
            execution_id: report.execution_id,
            status: report.status,
        });

        match report.first_failure().map(|r| r.step_name().to_string()) {
            Some(step) => Err(RunError::StepFailed {
                step,
                report: Box::new(report),
            }),
            None => Ok(report),
        }
    }

    fn emit(&self, event: ExecutionEvent) {
        emit_to(&self.event_handlers, event);
    }
}

fn emit_to(handlers: &[EventHandler], event: ExecutionEvent) {
    for handler in handlers {
        handler(event.clone());
    }
}

/// Everything one step task needs, owned so it can move into `tokio::spawn`
struct StepTask {
    executor: Arc<dyn Executor>,
    tokens: ExecutionTokens,
    ctx: ExecutionContext,
    step: Arc<Step>,
    base_env: Arc<HashMap<String, String>>,
    workspace: Arc<PathBuf>,
    handlers: Arc<Vec<EventHandler>>,
}

impl StepTask {
    /// Wait for a token, then execute; never fails, errors become failed results
    async fn run(&self) -> StepResult {
        let started = Instant::now();

        let _permit = match self.tokens.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                return StepResult::failure(&self.step, format!("no execution token: {}", e), started.elapsed())
            }
        };

        if self.ctx.is_expired() {
            debug!("Step {} admitted after the run deadline", self.step.name);
        }

        emit_to(
            &self.handlers,
            ExecutionEvent::StepStarted {
                step_name: self.step.name.clone(),
            },
        );

        let mut env = self.base_env.as_ref().clone();
        env.extend(self.step.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        match self
            .executor
            .execute(&self.ctx, &self.step, &env, &self.workspace)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!("Executor error on step {}: {}", self.step.name, e);
                StepResult::failure(&self.step, e.to_string(), started.elapsed())
            }
        }
    }
}
