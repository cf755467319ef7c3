//! Monte Carlo estimation of pi, swept over several thread counts.
//!
//! Each thread samples its share of the points with its own generator and counts those that fall
//! inside the unit circle. The hit counts go through the same slot-per-worker layout as the
//! static partitioner.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use nanorand::{Rng, WyRand};
use serde::Serialize;

use crate::partition::RunError;
use crate::worker::spawn_worker;

/// A point in `[-1, 1)^2`.
#[inline]
fn sample(rng: &mut WyRand) -> (f64, f64) {
    // 53 random bits give a uniform value in [0, 1)
    let mut unit = || (rng.generate::<u64>() >> 11) as f64 / (1u64 << 53) as f64;
    (unit() * 2.0 - 1.0, unit() * 2.0 - 1.0)
}

fn count_hits(points: u64, seed: u64) -> u64 {
    let mut rng = WyRand::new_seed(seed);
    let mut hits = 0;
    for _ in 0..points {
        let (x, y) = sample(&mut rng);
        if x * x + y * y <= 1.0 {
            hits += 1;
        }
    }
    hits
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PiEstimate {
    pub threads: usize,
    /// The points actually sampled: `points / threads` per thread.
    pub points: u64,
    pub pi: f64,
    pub elapsed: Duration,
}

/// Estimate pi sampling `points` points over `threads` threads.
///
/// Thread `i` is seeded with `seed + i`, so the estimate only depends on the arguments.
pub fn estimate_pi(points: u64, threads: usize, seed: u64) -> Result<PiEstimate, RunError> {
    if threads == 0 {
        return Err(RunError::NoWorkers);
    }
    let per_thread = points / threads as u64;
    if per_thread == 0 {
        return Err(RunError::EmptyRange);
    }

    let start = Instant::now();
    let mut slots = vec![0u64; threads];
    std::thread::scope(|s| {
        let mut handles = Vec::with_capacity(threads);
        for (i, slot) in slots.iter_mut().enumerate() {
            let handle = spawn_worker(s, format!("pi-{i}"), move || {
                *slot = count_hits(per_thread, seed.wrapping_add(i as u64));
            })
            .map_err(RunError::Spawn)?;
            handles.push(handle);
        }
        for (worker, handle) in handles.into_iter().enumerate() {
            handle
                .join()
                .map_err(|_| RunError::WorkerPanicked { worker })?;
        }
        Ok::<_, RunError>(())
    })?;
    let elapsed = start.elapsed();

    let used = per_thread * threads as u64;
    let hits: u64 = slots.iter().sum();
    Ok(PiEstimate {
        threads,
        points: used,
        pi: 4.0 * hits as f64 / used as f64,
        elapsed,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepRow {
    pub estimate: PiEstimate,
    /// Relative to the first row.
    pub speedup: f64,
}

/// Run [`estimate_pi`] once per thread count.
pub fn sweep(points: u64, thread_counts: &[usize], seed: u64) -> Result<Vec<SweepRow>, RunError> {
    let mut rows: Vec<SweepRow> = Vec::with_capacity(thread_counts.len());
    for &threads in thread_counts {
        let estimate = estimate_pi(points, threads, seed)?;
        let speedup = match rows.first() {
            Some(base) => base.estimate.elapsed.as_secs_f64() / estimate.elapsed.as_secs_f64(),
            None => 1.0,
        };
        info!(
            "{} threads: pi = {:.6} in {:?} ({:.2}x)",
            threads, estimate.pi, estimate.elapsed, speedup
        );
        rows.push(SweepRow { estimate, speedup });
    }
    Ok(rows)
}

const RULE: &str = "-------------------------------------------";

/// Write the plain-text report of a sweep.
pub fn write_report<W: Write>(out: &mut W, points: u64, rows: &[SweepRow]) -> io::Result<()> {
    writeln!(out, "Monte Carlo Pi Calculation Performance Report")?;
    writeln!(out, "{RULE}")?;
    writeln!(out)?;
    writeln!(out, "Total points: {points}")?;
    writeln!(out)?;
    writeln!(
        out,
        "{:>10} {:>12} {:>10} {:>8}",
        "Threads", "Pi Value", "Time (ms)", "Speedup"
    )?;
    writeln!(out, "{RULE}")?;
    for row in rows {
        writeln!(
            out,
            "{:>10} {:>12.6} {:>10.4} {:>7.2}x",
            row.estimate.threads,
            row.estimate.pi,
            row.estimate.elapsed.as_secs_f64() * 1e3,
            row.speedup
        )?;
    }
    Ok(())
}
