use std::ops::RangeInclusive;

use crate::aggregate::{reduce, Aggregate, PartialResult};
use crate::collatz::Kernel;
use crate::partition::{accumulate, check_complete, join_workers, Job, RunError};
use crate::worker::{spawn_worker, WorkerId};

/// The contiguous chunk of `1..=items` owned by `worker`.
///
/// Every chunk has `items / workers` elements, the last one also takes the remainder. When there
/// are more workers than items all but the last chunk are empty.
pub fn chunk_bounds(items: u64, workers: usize, worker: WorkerId) -> RangeInclusive<u64> {
    let chunk_size = items / workers as u64;
    let start = worker as u64 * chunk_size + 1;
    let end = if worker + 1 == workers {
        items
    } else {
        (worker as u64 + 1) * chunk_size
    };
    start..=end
}

/// Each worker sums its own chunk into its own slot; the slots are reduced after every worker
/// has been joined.
pub fn run_static<K: Kernel>(job: &Job, kernel: &K) -> Result<Aggregate, RunError> {
    job.validate()?;
    let mut slots: Vec<PartialResult> = (0..job.workers).map(PartialResult::new).collect();

    std::thread::scope(|s| {
        let mut handles = Vec::with_capacity(job.workers);
        let mut spawn_error = None;
        for (worker, slot) in slots.iter_mut().enumerate() {
            let chunk = chunk_bounds(job.items, job.workers, worker);
            match spawn_worker(s, format!("static-{worker}"), move || {
                accumulate(kernel, chunk, slot)
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
