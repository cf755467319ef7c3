//! Compare strategies for spreading a CPU-bound per-item computation over a fixed pool of
//! worker threads.
//!
//! The per-item computation is the number of Collatz transitions of an integer. The items
//! `1..=N` are distributed over `W` threads by one of three [`Strategy`]:
//!
//! - static contiguous chunks, one per worker;
//! - round-robin interleaving;
//! - a generator/workers/collector pipeline over two bounded queues.
//!
//! The [`BenchmarkHarness`] runs them over the same job, times them and checks that they agree.
//!
//! ```no_run
//! use collatz_bench::prelude::*;
//!
//! let job = Job::new(1_000_000, 8);
//! let comparison = BenchmarkHarness::new(job, Collatz::default()).run();
//! comparison.verify().unwrap();
//! println!("{comparison}");
//! ```
#[macro_use]
extern crate log;

pub mod aggregate;
pub mod channel;
pub mod collatz;
pub mod config;
pub mod harness;
pub mod montecarlo;
pub mod partition;
#[cfg(feature = "tokio")]
pub mod service;
pub(crate) mod worker;

pub use aggregate::{Aggregate, PartialResult};
pub use channel::BoundedQueue;
pub use collatz::{bounded_steps, steps, Collatz, ComputeError, Kernel};
pub use config::BenchConfig;
pub use harness::{BenchmarkHarness, Comparison, StrategyRun};
pub use partition::{Job, RunError, Strategy};
pub use worker::WorkerId;

pub mod prelude {
    pub use super::aggregate::{Aggregate, PartialResult};
    pub use super::collatz::{sequential_average, Collatz, Kernel};
    pub use super::config::BenchConfig;
    pub use super::harness::{BenchmarkHarness, Comparison};
    pub use super::partition::{Job, Strategy};
}
