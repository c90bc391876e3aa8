//! Bounded pool for blocking work
//!
//! Submitting waits on a semaphore permit while the pool is full, so the
//! producer is parked instead of polling for a free slot.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};

use crate::pipeline::error::PipelineError;

pub struct WorkerPool<R> {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<R>,
}

impl<R: Send + 'static> WorkerPool<R> {
    pub fn new(workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            tasks: JoinSet::new(),
        }
    }

    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit, PipelineError> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::PoolClosed)
    }

    /// Run `func` on a blocking thread once a worker slot is free
    pub async fn submit<F>(&mut self, func: F) -> Result<(), PipelineError>
    where
        F: FnOnce() -> R + Send + 'static,
    {
        let permit = self.acquire_permit().await?;
        self.tasks.spawn_blocking(move || {
            let ret = func();
            drop(permit);
            ret
        });
        Ok(())
    }

    /// Results of tasks that have already finished
    pub fn drain_finished(&mut self) -> Vec<Result<R, JoinError>> {
        std::iter::from_fn(|| self.tasks.try_join_next()).collect()
    }

    /// Wait for every submitted task
    pub async fn join(mut self) -> Vec<Result<R, JoinError>> {
        let mut results = Vec::with_capacity(self.tasks.len());
        while let Some(result) = self.tasks.join_next().await {
            results.push(result);
        }
        results
    }
}
