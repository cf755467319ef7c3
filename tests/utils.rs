#![allow(dead_code)] // not all tests use all the members

use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use collatz_bench::collatz::{steps, ComputeError};

/// Records how many times each item of `1..=items` has been evaluated.
pub struct CoverageMap {
    hits: Vec<AtomicU8>,
}

impl CoverageMap {
    pub fn new(items: u64) -> Self {
        Self {
            hits: (0..items).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    /// A kernel that marks the item and returns the item itself as its "step count".
    pub fn kernel(&self) -> impl Fn(u64) -> Result<u64, ComputeError> + Sync + '_ {
        move |n| {
            self.hits[(n - 1) as usize].fetch_add(1, Ordering::Relaxed);
            Ok(n)
        }
    }

    /// The items evaluated a number of times different than one.
    pub fn anomalies(&self) -> Vec<(u64, u8)> {
        self.hits
            .iter()
            .enumerate()
            .map(|(i, h)| (i as u64 + 1, h.load(Ordering::Relaxed)))
            .filter(|&(_, count)| count != 1)
            .collect()
    }
}

/// The sum of the step counts of `1..=items`, computed on the current thread.
pub fn reference_steps(items: u64) -> u64 {
    (1..=items).map(steps).sum()
}

pub struct TestHelper;

impl TestHelper {
    pub fn setup() {
        let _ = env_logger::Builder::new()
            .filter(None, log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    /// Run `body` on a separate thread, failing the test if it doesn't complete in time.
    ///
    /// A deadlocked strategy would otherwise hang the whole test binary.
    pub fn with_timeout<F: FnOnce() + Send + 'static>(body: F) {
        Self::setup();
        let timeout_sec = Self::parse_int_from_env("COLLATZ_TEST_TIMEOUT").unwrap_or(30);
        let timeout = Duration::from_secs(timeout_sec);
        let (sender, receiver) = std::sync::mpsc::channel();
        let worker = std::thread::Builder::new()
            .name("test-body".into())
            .spawn(move || {
                body();
                sender.send(()).unwrap();
            })
            .unwrap();
        match receiver.recv_timeout(timeout) {
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => {
                panic!("Test body didn't complete before the timeout of {timeout:?}");
            }
            Err(RecvTimeoutError::Disconnected) => {
                panic!("Test body has panicked!");
            }
        }
        worker.join().expect("Test body has panicked!");
    }

    fn parse_int_from_env<I: FromStr>(var_name: &str) -> Option<I> {
        let content = std::env::var(var_name).ok()?;
        I::from_str(&content).ok()
    }
}
