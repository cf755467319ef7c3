//! Run every strategy over the same job, time them and compare the results.

use std::fmt::Display;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::aggregate::Aggregate;
use crate::collatz::{Collatz, Kernel};
use crate::config::BenchConfig;
use crate::partition::{Job, RunError, Strategy};

/// The outcome of a successful strategy invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyRun {
    pub strategy: Strategy,
    pub aggregate: Aggregate,
    pub average: f64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyFailure {
    pub strategy: Strategy,
    pub error: String,
}

/// Timings of all the strategies over the same job.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub job: Job,
    /// The successful runs, in execution order.
    pub runs: Vec<StrategyRun>,
    pub failures: Vec<StrategyFailure>,
}

impl Comparison {
    /// The run the speedups are relative to: the first one that succeeded.
    pub fn baseline(&self) -> Option<&StrategyRun> {
        self.runs.first()
    }

    /// `baseline_time / run_time`.
    pub fn speedup(&self, run: &StrategyRun) -> f64 {
        match self.baseline() {
            Some(baseline) => baseline.elapsed.as_secs_f64() / run.elapsed.as_secs_f64(),
            None => 1.0,
        }
    }

    /// The run with the lowest elapsed time, the earliest one on ties.
    pub fn fastest(&self) -> Option<&StrategyRun> {
        self.runs
            .iter()
            .reduce(|best, run| if run.elapsed < best.elapsed { run } else { best })
    }

    /// Check that every strategy produced the same aggregate.
    pub fn verify(&self) -> Result<(), RunError> {
        let Some(baseline) = self.baseline() else {
            return Ok(());
        };
        for run in &self.runs[1..] {
            if run.aggregate != baseline.aggregate {
                return Err(RunError::Mismatch(format!(
                    "{} averaged {} ({:?}), {} averaged {} ({:?})",
                    baseline.strategy,
                    baseline.average,
                    baseline.aggregate,
                    run.strategy,
                    run.average,
                    run.aggregate
                )));
            }
        }
        Ok(())
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} items, {} workers, queue capacity {}",
            self.job.items, self.job.workers, self.job.queue_capacity
        )?;
        writeln!(
            f,
            "{:<12} {:>10} {:>14} {:>12} {:>8}",
            "strategy", "average", "time (ms)", "of baseline", "speedup"
        )?;
        for run in &self.runs {
            let speedup = self.speedup(run);
            writeln!(
                f,
                "{:<12} {:>10.2} {:>14.4} {:>11.2}% {:>7.2}x",
                run.strategy,
                run.average,
                run.elapsed.as_secs_f64() * 1e3,
                100.0 / speedup,
                speedup
            )?;
        }
        for failure in &self.failures {
            writeln!(f, "{:<12} failed: {}", failure.strategy, failure.error)?;
        }
        if let Some(fastest) = self.fastest() {
            write!(f, "fastest: {} ({:?})", fastest.strategy, fastest.elapsed)?;
        }
        Ok(())
    }
}

/// Runs a list of strategies in sequence over the same job and kernel.
#[derive(Debug, Clone)]
pub struct BenchmarkHarness<K: Kernel> {
    job: Job,
    strategies: Vec<Strategy>,
    kernel: K,
}

impl<K: Kernel> BenchmarkHarness<K> {
    pub fn new(job: Job, kernel: K) -> Self {
        Self {
            job,
            strategies: Strategy::ALL.to_vec(),
            kernel,
        }
    }

    pub fn with_strategies(mut self, strategies: impl IntoIterator<Item = Strategy>) -> Self {
        self.strategies = strategies.into_iter().collect();
        self
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Run a single strategy and measure its wall-clock time.
    pub fn run_one(&self, strategy: Strategy) -> Result<StrategyRun, RunError> {
        let start = Instant::now();
        let aggregate = strategy.run(&self.job, &self.kernel)?;
        let elapsed = start.elapsed();
        let run = StrategyRun {
            strategy,
            aggregate,
            average: aggregate.average(),
            elapsed,
        };
        info!(
            "{} completed: average {:.2} in {:?}",
            strategy, run.average, run.elapsed
        );
        Ok(run)
    }

    /// Run every strategy. A failing strategy is recorded and doesn't prevent the others from
    /// running.
    pub fn run(&self) -> Comparison {
        let mut runs = Vec::with_capacity(self.strategies.len());
        let mut failures = Vec::new();
        for &strategy in &self.strategies {
            match self.run_one(strategy) {
                Ok(run) => runs.push(run),
                Err(e) => {
                    error!("{} failed: {}", strategy, e);
                    failures.push(StrategyFailure {
                        strategy,
                        error: e.to_string(),
                    });
                }
            }
        }
        Comparison {
            job: self.job,
            runs,
            failures,
        }
    }
}

impl BenchmarkHarness<Collatz> {
    pub fn from_config(config: &BenchConfig) -> Self {
        let job = Job::new(config.items, config.workers).with_queue_capacity(config.queue_capacity);
        Self::new(job, Collatz::new(config.max_steps)).with_strategies(config.strategies.clone())
    }
}
