//! # Bounded Worker Pool
//!
//! Runs one unit of work per item with at most `width` units in flight.
//!
//! Every item is spawned up front; each task waits for a semaphore permit
//! before running, so the number of concurrent network calls never exceeds
//! the pool width. Completions are yielded in the order they finish, tagged
//! with the index of the item that produced them.
//!
//! A panicking unit is reported as [`WorkerError::Panicked`] for its own item
//! and never takes sibling items down with it.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

use crate::error::WorkerError;

/// Result of one unit of work
pub type WorkResult<O> = std::result::Result<O, WorkerError>;

/// Default number of concurrent units
pub const DEFAULT_POOL_WIDTH: usize = 3;

/// Fixed-width worker pool
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    width: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_WIDTH)
    }
}

impl WorkerPool {
    /// Create a pool; a width of zero is treated as one
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Spawn `work` for every item and return the completion stream
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<T, O, F, Fut>(&self, items: Vec<T>, work: F) -> Completions<O>
    where
        T: Send + 'static,
        O: Send + 'static,
        F: Fn(T) -> Fut,
        Fut: Future<Output = O> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.width));
        let mut tasks = JoinSet::new();
        let total = items.len();

        for (index, item) in items.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let unit = work(item);

            tasks.spawn(async move {
                // The semaphore is never closed, so acquisition only waits
                let _permit = semaphore.acquire_owned().await.ok();
                let result = AssertUnwindSafe(unit)
                    .catch_unwind()
                    .await
                    .map_err(|panic| WorkerError::Panicked(panic_message(panic.as_ref())));
                (index, result)
            });
        }

        Completions { tasks, total }
    }

    /// Run every item to completion
    ///
    /// `on_complete` observes each result as it lands (completion order).
    /// The returned results are ordered by item index.
    pub async fn run<T, O, F, Fut, C>(
        &self,
        items: Vec<T>,
        work: F,
        mut on_complete: C,
    ) -> Vec<WorkResult<O>>
    where
        T: Send + 'static,
        O: Send + 'static,
        F: Fn(T) -> Fut,
        Fut: Future<Output = O> + Send + 'static,
        C: FnMut(usize, &WorkResult<O>),
    {
        let mut completions = self.spawn(items, work);
        let mut slots: Vec<Option<WorkResult<O>>> = Vec::with_capacity(completions.total());
        slots.resize_with(completions.total(), || None);

        while let Some((index, result)) = completions.next().await {
            on_complete(index, &result);
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(result);
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or(Err(WorkerError::Lost)))
            .collect()
    }
}

/// Unordered stream of `(index, result)` pairs
pub struct Completions<O> {
    tasks: JoinSet<(usize, WorkResult<O>)>,
    total: usize,
}

impl<O: Send + 'static> Completions<O> {
    /// Number of items submitted
    pub fn total(&self) -> usize {
        self.total
    }

    /// Next finished item, or `None` once every item has been observed
    pub async fn next(&mut self) -> Option<(usize, WorkResult<O>)> {
        loop {
            match self.tasks.join_next().await? {
                Ok(completion) => return Some(completion),
                // Only reachable when the runtime shuts down under us
                Err(join_error) => error!(error = %join_error, "Worker task lost"),
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
