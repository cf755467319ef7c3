use serde::{Deserialize, Serialize};

use crate::worker::WorkerId;

/// The partial sum produced by a single worker, or by a single item in the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialResult {
    pub worker_id: WorkerId,
    pub local_sum: u64,
    pub local_count: u64,
}

impl PartialResult {
    pub fn new(worker_id: WorkerId) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }

    /// The partial result of a single item.
    pub fn single(worker_id: WorkerId, steps: u64) -> Self {
        Self {
            worker_id,
            local_sum: steps,
            local_count: 1,
        }
    }

    #[inline]
    pub fn add(&mut self, steps: u64) {
        self.local_sum += steps;
        self.local_count += 1;
    }
}

/// Total steps and total number of items of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub total_steps: u64,
    pub total_count: u64,
}

impl Aggregate {
    #[inline]
    pub fn absorb(&mut self, partial: &PartialResult) {
        self.total_steps += partial.local_sum;
        self.total_count += partial.local_count;
    }

    pub fn merge(mut self, other: Aggregate) -> Aggregate {
        self.total_steps += other.total_steps;
        self.total_count += other.total_count;
        self
    }

    /// `total_steps / total_count`, `NaN` for an empty aggregate.
    pub fn average(&self) -> f64 {
        self.total_steps as f64 / self.total_count as f64
    }
}

impl<'a> FromIterator<&'a PartialResult> for Aggregate {
    fn from_iter<I: IntoIterator<Item = &'a PartialResult>>(iter: I) -> Self {
        let mut aggregate = Aggregate::default();
        for partial in iter {
            aggregate.absorb(partial);
        }
        aggregate
    }
}

/// Reduce a slot array once every worker has written its slot.
///
/// The reduction is a plain sum, hence it doesn't depend on the order in which workers finished.
pub fn reduce(slots: &[PartialResult]) -> Aggregate {
    slots.iter().collect()
}
