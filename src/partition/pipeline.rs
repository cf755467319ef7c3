use std::io;

use crate::aggregate::{Aggregate, PartialResult};
use crate::channel::BoundedQueue;
use crate::collatz::{ComputeError, Kernel};
use crate::partition::{check_complete, join_workers, keep_lowest, Job, RunError};
use crate::worker::{spawn_worker, CatchPanic, OnDrop, WorkerId};

/// Producer/consumer pipeline over two bounded queues.
///
/// ```text
/// generator --jobs--> worker 0..W --results--> collector (calling thread)
///                          \__ done signals __> closer
/// ```
///
/// - the generator pushes `1..=N` into the job queue and closes it;
/// - each worker pops items until the job queue is closed and drained, pushing one
///   [`PartialResult`] per item, then signals that it's done exactly once;
/// - the closer waits for all the done signals and closes the result queue;
/// - the collector sums the results until the result queue is closed and drained.
///
/// Both queues have `job.queue_capacity` slots, so the memory in flight doesn't depend on `N`.
/// The collector starts consuming while the workers are still computing.
pub fn run_pipeline<K: Kernel>(job: &Job, kernel: &K) -> Result<Aggregate, RunError> {
    job.validate()?;
    let jobs = &BoundedQueue::<u64>::new(job.queue_capacity);
    let results = &BoundedQueue::<PartialResult>::new(job.queue_capacity);
    let (done_tx, done_rx) = flume::bounded::<WorkerId>(job.workers);
    let items = job.items;
    let expected_done = job.workers;

    let aggregate = std::thread::scope(|s| {
        let mut spawn_error: Option<io::Error> = None;

        let mut workers = Vec::with_capacity(job.workers);
        for worker in 0..job.workers {
            let done_tx = done_tx.clone();
            let spawned = spawn_worker(s, format!("pipeline-{worker}"), move || {
                let _done = OnDrop::new(move || {
                    let _ = done_tx.send(worker);
                });
                // a crashed worker must not leave the generator blocked on a queue nobody drains
                let mut on_panic = CatchPanic::new(|| discard(jobs));
                let lowest_error = compute(worker, kernel, jobs, results);
                on_panic.defuse();
                lowest_error
            });
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    spawn_error = Some(e);
                    break;
                }
            }
        }
        drop(done_tx);

        let closer = if spawn_error.is_none() {
            let spawned = spawn_worker(s, "pipeline-closer".to_string(), move || {
                let _close = OnDrop::new(|| results.close());
                let mut signals = 0;
                while signals < expected_done {
                    match done_rx.recv() {
                        Ok(worker) => {
                            trace!("pipeline worker {} done", worker);
                            signals += 1;
                        }
                        Err(_) => break,
                    }
                }
                debug!("{} / {} pipeline workers done, closing the results", signals, expected_done);
            });
            spawned.map_err(|e| spawn_error = Some(e)).ok()
        } else {
            None
        };

        let generator = if spawn_error.is_none() {
            let spawned = spawn_worker(s, "pipeline-generator".to_string(), move || {
                let _close = OnDrop::new(|| jobs.close());
                for n in 1..=items {
                    if jobs.push(n).is_err() {
                        debug!("job queue closed before item {}", n);
                        break;
                    }
                }
            });
            spawned.map_err(|e| spawn_error = Some(e)).ok()
        } else {
            None
        };

        if spawn_error.is_some() {
            // nothing has been generated: let the spawned stages wind down
            jobs.close();
            if closer.is_none() {
                results.close();
            }
        }

        let mut aggregate = Aggregate::default();
        for partial in results.drain() {
            aggregate.absorb(&partial);
        }

        let mut stage_panicked = None;
        if let Some(generator) = generator {
            if generator.join().is_err() {
                stage_panicked = Some("generator");
            }
        }
        if let Some(closer) = closer {
            if closer.join().is_err() {
                stage_panicked = Some("closer");
            }
        }
        let joined = join_workers(workers);

        if let Some(e) = spawn_error {
            return Err(RunError::Spawn(e));
        }
        if let Some(stage) = stage_panicked {
            return Err(RunError::StagePanicked { stage });
        }
        joined.map(|_| aggregate)
    })?;

    check_complete(job, aggregate)
}

/// The body of a pipeline worker.
fn compute<K: Kernel>(
    worker: WorkerId,
    kernel: &K,
    jobs: &BoundedQueue<u64>,
    results: &BoundedQueue<PartialResult>,
) -> Option<ComputeError> {
    let mut lowest_error = None;
    while let Some(n) = jobs.pop() {
        match kernel.eval(n) {
            Ok(steps) => {
                if results.push(PartialResult::single(worker, steps)).is_err() {
                    warn!("pipeline worker {} lost the result of item {}", worker, n);
                }
            }
            Err(e) => keep_lowest(&mut lowest_error, e),
        }
    }
    lowest_error
}

/// Close the queue and throw away whatever is left in it.
fn discard(jobs: &BoundedQueue<u64>) {
    jobs.close();
    let dropped = jobs.drain().count();
    warn!("discarded {} pending items", dropped);
}
