//! Pipeline execution: command dispatch, executors and the runner

pub mod dispatch;
pub mod executor;
pub mod local;
pub mod mock;
pub mod runner;
pub mod scheduler;

pub use dispatch::{needs_shell, run_command, CommandError, Invocation};
pub use executor::{new_executor, ExecutionContext, Executor, ExecutorError, ExecutorKind};
pub use local::LocalExecutor;
pub use mock::MockExecutor;
pub use runner::{EventHandler, ExecutionEvent, RunError, Runner};
pub use scheduler::{effective_concurrency, eligible_steps, ExecutionTokens};
