use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collatz::DEFAULT_MAX_STEPS;
use crate::partition::{Strategy, DEFAULT_QUEUE_CAPACITY};

/// Number of items when nothing else is configured.
pub const DEFAULT_ITEMS: u64 = 10_000_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read the configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration of a benchmark run.
///
/// It can be loaded from a TOML file, every missing field takes its default value:
///
/// ```toml
/// items = 1000000
/// workers = 8
/// queue_capacity = 1000
/// max_steps = 10000
/// strategies = ["static", "interleaved", "pipeline"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// The items are `1..=items`.
    pub items: u64,
    /// Number of worker threads of every strategy.
    pub workers: usize,
    /// Capacity of the job and result queues of the pipeline.
    pub queue_capacity: usize,
    /// Transitions after which an item is considered divergent.
    pub max_steps: u64,
    /// The strategies to run, in order. The first one is the speedup baseline.
    pub strategies: Vec<Strategy>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            items: DEFAULT_ITEMS,
            workers: max_cpu_parallelism(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_steps: DEFAULT_MAX_STEPS,
            strategies: Strategy::ALL.to_vec(),
        }
    }
}

impl BenchConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("reading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BenchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |what: &str| Err(ConfigError::Invalid(what.to_string()));
        if self.items == 0 {
            return invalid("items must be positive");
        }
        if self.workers == 0 {
            return invalid("workers must be positive");
        }
        if self.queue_capacity == 0 {
            return invalid("queue_capacity must be positive");
        }
        if self.max_steps == 0 {
            return invalid("max_steps must be positive");
        }
        if self.strategies.is_empty() {
            return invalid("at least one strategy is required");
        }
        Ok(())
    }
}

/// Number of processing units available to this process, 4 if it can't be determined.
pub fn max_cpu_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
