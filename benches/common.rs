#![allow(dead_code)]

use std::time::Duration;

use collatz_bench::config::max_cpu_parallelism;

pub const SAMPLES: usize = 20;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const DURATION: Duration = Duration::from_secs(5);

/// Worker counts to bench: powers of two up to the available cores, plus the core count itself.
pub fn worker_counts() -> Vec<usize> {
    let max = max_cpu_parallelism();
    let mut counts: Vec<usize> = std::iter::successors(Some(1usize), |w| w.checked_mul(2))
        .take_while(|&w| w < max)
        .collect();
    counts.push(max);
    counts
}
