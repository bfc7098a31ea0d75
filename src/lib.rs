//! cicd-runner - run YAML-defined pipeline steps as local processes

pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use crate::core::{Config, ConfigError, ExecutionStatus, Pipeline, PipelineError, RunReport, Step, StepResult};
pub use crate::execution::{new_executor, ExecutionEvent, Executor, LocalExecutor, MockExecutor, RunError, Runner};
