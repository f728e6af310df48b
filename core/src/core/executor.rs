//! Bounded-concurrency task runner shared by the crawler and the port prober.
//!
//! At most `limit` tasks are in flight at any instant. A task's future is
//! only created once a slot frees, so queued work applies backpressure
//! instead of piling up. Results come back in completion order.

use std::future::Future;

use futures::{stream, StreamExt};
use log::debug;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy)]
pub struct BoundedExecutor {
    limit: usize,
}

impl BoundedExecutor {
    /// Creates an executor running at most `limit` tasks at once. A limit of
    /// zero is treated as one.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Runs every task exactly once and resolves when all have completed.
    ///
    /// Tasks that can fail should return a `Result`; the executor never
    /// inspects the output, so one failed task does not stop its siblings.
    pub async fn run<T, F, Fut>(&self, tasks: Vec<F>) -> Vec<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        debug!(
            "Executing {} task(s) with concurrency {}",
            tasks.len(),
            self.limit
        );

        stream::iter(tasks)
            .map(|task| task())
            .buffer_unordered(self.limit)
            .collect()
            .await
    }

    /// Like [`run`](Self::run), but sends each output on `tx` as soon as its
    /// task completes. Returns the number of completed tasks.
    ///
    /// A dropped receiver does not cancel outstanding work.
    pub async fn run_streaming<T, F, Fut>(&self, tasks: Vec<F>, tx: mpsc::Sender<T>) -> usize
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        debug!(
            "Streaming {} task(s) with concurrency {}",
            tasks.len(),
            self.limit
        );

        let mut completed = 0;
        let mut results = stream::iter(tasks)
            .map(|task| task())
            .buffer_unordered(self.limit);

        while let Some(output) = results.next().await {
            completed += 1;
            let _ = tx.send(output).await;
        }

        completed
    }
}
