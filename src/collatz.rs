//! The per-item computation: number of Collatz transitions needed to reach `1`.

use thiserror::Error;

/// Default bound on the number of transitions before an item is considered divergent.
///
/// Every starting value below 2^60 reaches `1` in well under 2000 transitions.
pub const DEFAULT_MAX_STEPS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ComputeError {
    #[error("item {n} did not reach 1 within {limit} steps")]
    StepLimit { n: u64, limit: u64 },
    #[error("item {n} overflowed while computing 3n+1")]
    Overflow { n: u64 },
}

impl ComputeError {
    /// The item that caused the failure.
    pub fn item(&self) -> u64 {
        match self {
            ComputeError::StepLimit { n, .. } | ComputeError::Overflow { n } => *n,
        }
    }
}

/// Number of transitions to bring `n` down to `1`: halve even values, map odd values to `3n+1`.
///
/// `steps(1) == 0`. Termination is assumed, not proven; use [`bounded_steps`] when the input is
/// not trusted. `n` must be positive.
#[inline]
pub fn steps(mut n: u64) -> u64 {
    debug_assert!(n > 0, "steps is defined only for positive integers");
    let mut count = 0;
    while n > 1 {
        if n % 2 == 0 {
            n /= 2;
        } else {
            n = 3 * n + 1;
        }
        count += 1;
    }
    count
}

/// Same as [`steps`], but gives up after `limit` transitions and checks `3n+1` for overflow.
#[inline]
pub fn bounded_steps(n: u64, limit: u64) -> Result<u64, ComputeError> {
    let mut cur = n;
    let mut count = 0;
    while cur > 1 {
        if count == limit {
            return Err(ComputeError::StepLimit { n, limit });
        }
        if cur % 2 == 0 {
            cur /= 2;
        } else {
            cur = cur
                .checked_mul(3)
                .and_then(|c| c.checked_add(1))
                .ok_or(ComputeError::Overflow { n })?;
        }
        count += 1;
    }
    Ok(count)
}

/// A pure per-item function the partitioners fan out to.
///
/// Implementations must be deterministic: the partitioners rely on the reduction being
/// independent of which worker evaluates which item.
pub trait Kernel: Sync {
    fn eval(&self, n: u64) -> Result<u64, ComputeError>;
}

impl<F> Kernel for F
where
    F: Fn(u64) -> Result<u64, ComputeError> + Sync,
{
    #[inline]
    fn eval(&self, n: u64) -> Result<u64, ComputeError> {
        self(n)
    }
}

/// The Collatz step count with a safety bound on the number of transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collatz {
    pub max_steps: u64,
}

impl Collatz {
    pub fn new(max_steps: u64) -> Self {
        Self { max_steps }
    }
}

impl Default for Collatz {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEPS)
    }
}

impl Kernel for Collatz {
    #[inline]
    fn eval(&self, n: u64) -> Result<u64, ComputeError> {
        bounded_steps(n, self.max_steps)
    }
}

/// Reference single-threaded loop: `sum(kernel(1..=n)) / n`.
///
/// Returns `None` when `n == 0`.
pub fn sequential_average<K: Kernel + ?Sized>(n: u64, kernel: &K) -> Option<Result<f64, ComputeError>> {
    if n == 0 {
        return None;
    }
    let total = (1..=n).try_fold(0u64, |acc, i| kernel.eval(i).map(|s| acc + s));
    Some(total.map(|total| total as f64 / n as f64))
}
