//! Strategies for distributing the items `1..=N` over a fixed pool of worker threads.
//!
//! Every strategy evaluates a [`Kernel`] exactly once per item and reduces the per-item results
//! into an [`Aggregate`]. They only differ in how the items reach the workers:
//!
//! - [`Strategy::Static`]: each worker owns a contiguous chunk of the range.
//! - [`Strategy::Interleaved`]: worker `i` owns the items `i+1, i+1+W, i+1+2W, ...`.
//! - [`Strategy::Pipeline`]: a generator feeds the workers through a bounded job queue and a
//!   collector sums what the workers push into a bounded result queue.

use std::fmt::Display;
use std::io;
use std::thread::ScopedJoinHandle;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::Aggregate;
use crate::collatz::{ComputeError, Kernel};
use crate::worker::WorkerId;

mod interleaved;
mod pipeline;
mod static_chunks;

pub use interleaved::{run_interleaved, strided};
pub use pipeline::run_pipeline;
pub use static_chunks::{chunk_bounds, run_static};

/// Capacity of the pipeline queues when nothing else is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("the item range is empty")]
    EmptyRange,
    #[error("at least one worker is required")]
    NoWorkers,
    #[error("the queue capacity must be positive")]
    ZeroCapacity,
    #[error("failed to spawn a thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: WorkerId },
    #[error("the pipeline {stage} panicked")]
    StagePanicked { stage: &'static str },
    #[error(transparent)]
    Compute(#[from] ComputeError),
    #[error("processed {processed} items out of {expected}")]
    Incomplete { expected: u64, processed: u64 },
    #[error("strategies disagree on the average: {0}")]
    Mismatch(String),
}

/// The input of a single strategy invocation: items `1..=items` over `workers` threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub items: u64,
    pub workers: usize,
    /// Capacity of both pipeline queues, ignored by the other strategies.
    pub queue_capacity: usize,
}

impl Job {
    pub fn new(items: u64, workers: usize) -> Self {
        Self {
            items,
            workers,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn validate(&self) -> Result<(), RunError> {
        if self.items == 0 {
            return Err(RunError::EmptyRange);
        }
        if self.workers == 0 {
            return Err(RunError::NoWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(RunError::ZeroCapacity);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Static,
    Interleaved,
    Pipeline,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Static, Strategy::Interleaved, Strategy::Pipeline];

    /// Evaluate `kernel` on every item of `job` and reduce the results.
    ///
    /// An invalid job is rejected before any thread is spawned.
    pub fn run<K: Kernel>(&self, job: &Job, kernel: &K) -> Result<Aggregate, RunError> {
        debug!("running {} over {} items with {} workers", self, job.items, job.workers);
        match self {
            Strategy::Static => run_static(job, kernel),
            Strategy::Interleaved => run_interleaved(job, kernel),
            Strategy::Pipeline => run_pipeline(job, kernel),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Static => "static",
            Strategy::Interleaved => "interleaved",
            Strategy::Pipeline => "pipeline",
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// Evaluate `kernel` on every item yielded by `items`, accumulating into `partial`.
///
/// A failing item doesn't stop the loop; the failure on the lowest item is returned at the end.
#[inline]
pub(crate) fn accumulate<K: Kernel>(
    kernel: &K,
    items: impl Iterator<Item = u64>,
    partial: &mut crate::aggregate::PartialResult,
) -> Option<ComputeError> {
    let mut lowest_error = None;
    for n in items {
        match kernel.eval(n) {
            Ok(steps) => partial.add(steps),
            Err(e) => keep_lowest(&mut lowest_error, e),
        }
    }
    lowest_error
}

/// Remember `error` if it refers to a lower item than the one already stored.
#[inline]
pub(crate) fn keep_lowest(slot: &mut Option<ComputeError>, error: ComputeError) {
    if slot.map_or(true, |prev| error.item() < prev.item()) {
        *slot = Some(error);
    }
}

/// Join every worker, then report the most relevant failure among them.
///
/// All the handles are joined before returning, so no worker outlives the reduction.
pub(crate) fn join_workers(
    handles: Vec<ScopedJoinHandle<'_, Option<ComputeError>>>,
) -> Result<(), RunError> {
    let mut panicked = None;
    let mut compute_error = None;
    for (worker, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(None) => {}
            Ok(Some(e)) => keep_lowest(&mut compute_error, e),
            Err(_) => {
                panicked.get_or_insert(worker);
            }
        }
    }
    if let Some(worker) = panicked {
        return Err(RunError::WorkerPanicked { worker });
    }
    if let Some(e) = compute_error {
        return Err(e.into());
    }
    Ok(())
}

/// Check that the aggregate accounts for every item of the job exactly once.
pub(crate) fn check_complete(job: &Job, aggregate: Aggregate) -> Result<Aggregate, RunError> {
    if aggregate.total_count != job.items {
        return Err(RunError::Incomplete {
            expected: job.items,
            processed: aggregate.total_count,
        });
    }
    Ok(aggregate)
}
