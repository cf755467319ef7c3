use std::iter::StepBy;
use std::ops::RangeInclusive;

use crate::aggregate::{reduce, Aggregate, PartialResult};
use crate::collatz::Kernel;
use crate::partition::{accumulate, check_complete, join_workers, Job, RunError};
use crate::worker::{spawn_worker, WorkerId};

/// The items `worker + 1, worker + 1 + workers, ...` up to `items`.
///
/// Item `n` belongs to worker `(n - 1) mod workers`, so the strides of different workers never
/// overlap.
pub fn strided(items: u64, workers: usize, worker: WorkerId) -> StepBy<RangeInclusive<u64>> {
    (worker as u64 + 1..=items).step_by(workers)
}

/// Same slot-per-worker layout as the static strategy, but with round-robin assignment.
///
/// With a cost per item that grows irregularly along the range, striding spreads the expensive
/// items over all the workers instead of piling them on the last chunk.
pub fn run_interleaved<K: Kernel>(job: &Job, kernel: &K) -> Result<Aggregate, RunError> {
    job.validate()?;
    let mut slots: Vec<PartialResult> = (0..job.workers).map(PartialResult::new).collect();

    std::thread::scope(|s| {
        let mut handles = Vec::with_capacity(job.workers);
        let mut spawn_error = None;
        for (worker, slot) in slots.iter_mut().enumerate() {
            let stride = strided(job.items, job.workers, worker);
            match spawn_worker(s, format!("interleaved-{worker}"), move || {
                accumulate(kernel, stride, slot)
            }) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    spawn_error = Some(e);
                    break;
                }
            }
        }
        let joined = join_workers(handles);
        match spawn_error {
            Some(e) => Err(RunError::Spawn(e)),
            None => joined,
        }
    })?;

    check_complete(job, reduce(&slots))
}
