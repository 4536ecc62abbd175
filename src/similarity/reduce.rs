use ahash::RandomState;
use indexmap::IndexMap;
use tracing::debug;

use crate::error::Result;
use crate::pipeline::records::{PairDistance, PairKey};
use crate::pipeline::{EntryBudget, Stage};
use crate::similarity::task::PartialRecord;

/// Sums the map-side squared sums per pair and emits `sqrt(sum)` at the barrier
#[derive(Debug, Clone, Default)]
pub struct DistanceReducer {
    sums: IndexMap<PairKey, f64, RandomState>,
    budget: EntryBudget,
}

impl DistanceReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: EntryBudget) -> Self {
        Self { budget, ..Self::default() }
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }
}

impl Stage for DistanceReducer {
    type Input = PartialRecord;
    type Output = PairDistance;
    const NAME: &'static str = "pair-distance";

    fn accumulate(&mut self, rec: PartialRecord) -> Result<()> {
        *self.sums.entry(rec.key).or_insert(0.0) += rec.squared_sum;
        self.budget.check(Self::NAME, self.sums.len())
    }

    fn finalize(self) -> Result<Vec<PairDistance>> {
        debug!(stage = Self::NAME, emitted = self.sums.len(), "barrier reached");
        Ok(self
            .sums
            .into_iter()
            .map(|(pair, sum)| PairDistance { pair, distance: sum.sqrt() })
            .collect())
    }
}
