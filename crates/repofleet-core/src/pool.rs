//! Bounded, cancellable, order-preserving fan-out.
//!
//! [`WorkerPool::run_ordered`] runs one task per input item with at most
//! `limit` tasks in flight. Results are tagged with the item's index and
//! handed to the caller's `emit` callback strictly in input order, as soon as
//! every earlier item has finished.
//!
//! Cancelling the pool stops tasks from starting; tasks already running are
//! awaited to completion.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Why a task produced no result of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAbort {
    /// The pool was cancelled before the task started.
    Cancelled,
    /// The task panicked.
    Panicked(String),
}

/// Semaphore-bounded task runner shared by rebuild, switch and pull.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    limit: usize,
    cancel: CancellationToken,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(4)
    }
}

impl WorkerPool {
    /// Pool running at most `limit` tasks at once (at least one).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop tasks from starting, in this batch and every later one.
    ///
    /// Cancellation is one-shot: the token never resets, so every later
    /// `run_ordered` on this pool (or a clone of it) aborts all items as
    /// [`TaskAbort::Cancelled`]. Use [`WorkerPool::with_cancellation`] with a
    /// fresh token to run again.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run `work` on every item and return one result per item, in input
    /// order.
    ///
    /// `abort(index, reason)` supplies the result for items that never
    /// started or whose task panicked. `emit(index, &result)` is called once
    /// per item, in input order.
    pub async fn run_ordered<I, T, W, Fut, A, E>(
        &self,
        items: Vec<I>,
        work: W,
        abort: A,
        mut emit: E,
    ) -> Vec<T>
    where
        I: Send + 'static,
        T: Send + 'static,
        W: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        A: Fn(usize, TaskAbort) -> T,
        E: FnMut(usize, &T),
    {
        let total = items.len();
        let work = Arc::new(work);
        let mut join_set = JoinSet::new();

        for (idx, item) in items.into_iter().enumerate() {
            let work = Arc::clone(&work);
            let permits = Arc::clone(&self.permits);
            let cancel = self.cancel.clone();
            join_set.spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return (idx, Err(TaskAbort::Cancelled)),
                    permit = permits.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return (idx, Err(TaskAbort::Cancelled)),
                    },
                };
                if cancel.is_cancelled() {
                    return (idx, Err(TaskAbort::Cancelled));
                }
                // Inner task isolates panics so the index is never lost.
                match tokio::spawn(work(item)).await {
                    Ok(value) => (idx, Ok(value)),
                    Err(err) => (idx, Err(TaskAbort::Panicked(err.to_string()))),
                }
            });
        }

        let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut next = 0;

        while let Some(joined) = join_set.join_next().await {
            let (idx, result) = match joined {
                Ok(tagged) => tagged,
                Err(err) => {
                    warn!(error = %err, "worker task join error");
                    continue;
                }
            };
            let value = match result {
                Ok(value) => value,
                Err(reason) => {
                    debug!(index = idx, reason = ?reason, "task aborted");
                    abort(idx, reason)
                }
            };
            slots[idx] = Some(value);

            while let Some(Some(value)) = slots.get(next) {
                emit(next, value);
                next += 1;
            }
        }

        // Only reachable when an outer task itself failed to join.
        let mut results = Vec::with_capacity(total);
        for (idx, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(value) => {
                    if idx >= next {
                        emit(idx, &value);
                    }
                    results.push(value);
                }
                None => {
                    let value = abort(idx, TaskAbort::Panicked("worker task lost".to_string()));
                    emit(idx, &value);
                    results.push(value);
                }
            }
        }
        results
    }
}
