//! Bounded-parallel dispatch of a superstep's runnable vertex computations.
//!
//! A counting semaphore bounds how many vertex computations run
//! concurrently within a superstep: a permit is acquired per computation,
//! spawned onto a `tokio::task::JoinSet`, and all are joined before the
//! superstep commits its merged state. The runtime never preempts a vertex
//! computation once it is running.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use miette::Diagnostic;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// A per-vertex dispatch failure: either the vertex's future panicked, or
/// the scheduler itself was torn down (semaphore closed) mid-dispatch.
#[derive(Debug, Error, Diagnostic)]
pub enum SchedulerError {
    #[error("vertex computation panicked: {0}")]
    #[diagnostic(code(loomgraph::scheduler::panicked))]
    Panicked(String),

    #[error("scheduler semaphore was closed before dispatch completed")]
    #[diagnostic(code(loomgraph::scheduler::closed))]
    Closed,
}

/// Tracks the admission-control width actually exercised by a run: at no
/// instant do more than `parallelism` vertex computations overlap.
#[derive(Debug, Default)]
pub struct SchedulerState {
    pub max_observed_concurrency: std::sync::atomic::AtomicUsize,
    pub in_flight: std::sync::atomic::AtomicUsize,
}

impl SchedulerState {
    fn note_start(&self) {
        use std::sync::atomic::Ordering::SeqCst;
        let now = self.in_flight.fetch_add(1, SeqCst) + 1;
        self.max_observed_concurrency.fetch_max(now, SeqCst);
    }

    fn note_end(&self) {
        self.in_flight
            .fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
    }

    #[must_use]
    pub fn max_observed_concurrency(&self) -> usize {
        self.max_observed_concurrency
            .load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Bounded-concurrency dispatcher for one superstep's runnable set.
///
/// A counting semaphore of width `parallelism` is the admission control:
/// a vertex computation acquires a permit before its future is polled and
/// releases it on completion, so at most `parallelism` are ever in flight
/// regardless of how many are submitted to [`Scheduler::dispatch`].
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    parallelism: usize,
    state: Arc<SchedulerState>,
}

impl Scheduler {
    #[must_use]
    pub fn new(parallelism: usize) -> Self {
        let parallelism = parallelism.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(parallelism)),
            parallelism,
            state: Arc::new(SchedulerState::default()),
        }
    }

    #[must_use]
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    #[must_use]
    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Run every task to completion with at most `parallelism` in flight at
    /// once. Results are returned in submission order regardless of
    /// completion order. A task that panics is captured as
    /// [`SchedulerError::Panicked`] rather than propagating the panic and
    /// aborting siblings still in flight — one vertex's failure must not
    /// abort other vertices in the same superstep.
    pub async fn dispatch<T, F>(&self, tasks: Vec<F>) -> Vec<Result<T, SchedulerError>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let total = tasks.len();
        let mut set: JoinSet<(usize, Result<T, SchedulerError>)> = JoinSet::new();

        for (idx, task) in tasks.into_iter().enumerate() {
            let semaphore = Arc::clone(&self.semaphore);
            let state = Arc::clone(&self.state);
            set.spawn(async move {
                let permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (idx, Err(SchedulerError::Closed)),
                };
                state.note_start();
                let outcome = std::panic::AssertUnwindSafe(task)
                    .catch_unwind()
                    .await
                    .map_err(|payload| SchedulerError::Panicked(panic_message(&payload)));
                state.note_end();
                drop(permit);
                (idx, outcome)
            });
        }

        let mut results: Vec<Option<Result<T, SchedulerError>>> =
            (0..total).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, outcome)) => results[idx] = Some(outcome),
                Err(join_err) => {
                    tracing::error!(error = %join_err, "scheduler task was aborted or lost");
                }
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or(Err(SchedulerError::Closed)))
            .collect()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
