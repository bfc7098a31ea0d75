//! Execution scheduler - decides which steps run and how many at once

use crate::core::{Pipeline, Step};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Number of steps allowed to run at once for a pipeline.
///
/// A request of zero still runs one step at a time; the configured
/// capacity caps everything.
pub fn effective_concurrency(requested: usize, capacity: usize) -> usize {
    requested.max(1).min(capacity.max(1))
}

/// Steps selected to run, in declaration order
pub fn eligible_steps(pipeline: &Pipeline) -> Vec<Arc<Step>> {
    pipeline
        .steps
        .iter()
        .filter(|step| step.should_run())
        .map(|step| Arc::new(step.clone()))
        .collect()
}

/// Pool of execution tokens; one token per concurrently running step
#[derive(Debug, Clone)]
pub struct ExecutionTokens {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl ExecutionTokens {
    pub fn new(size: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Wait for a token; it is returned to the pool when the permit drops
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.semaphore).acquire_owned().await
    }

    /// Tokens not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Total number of tokens
    pub fn size(&self) -> usize {
        self.size
    }
}
