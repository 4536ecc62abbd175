//! Pairwise similarity engine.
//!
//! Map: one [`AnchorTask`] per book vector, run in parallel against a shared
//! read-only arena, each scanning forward from its own slot.
//! Each task combines term contributions per pair, so the shuffle holds one
//! record per pair.
//! Shuffle: partial records routed to partitions by [`Partitioner`].
//! Reduce: one [`DistanceReducer`] per partition, run in parallel.

pub mod partition;
pub mod reduce;
pub mod task;

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{DistanceMode, PipelineConfig};
use crate::error::Result;
use crate::pipeline::records::{BookVector, PairDistance};
use crate::pipeline::{EntryBudget, Stage};
use crate::utils::datastruct::arena::Arena;

pub use self::partition::Partitioner;
pub use self::reduce::DistanceReducer;
pub use self::task::{AnchorTask, PartialRecord, VectorArena};

/// Euclidean distance of every unordered pair of book vectors
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    mode: DistanceMode,
    partitioner: Partitioner,
    budget: EntryBudget,
}

impl SimilarityEngine {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            mode: config.distance_mode,
            partitioner: Partitioner::new(config.reduce_partitions),
            budget: EntryBudget::new(config.max_barrier_entries),
        }
    }

    pub fn mode(&self) -> DistanceMode {
        self.mode
    }

    /// Distances of all pairs, self pairs included, ordered by pair key
    pub fn run(&self, vectors: Vec<BookVector>) -> Result<Vec<PairDistance>> {
        let arena: VectorArena = Arc::new(vectors.into_iter().collect::<Arena<_>>());
        info!(books = arena.len(), mode = ?self.mode, "computing pair distances");
        let partials = self.map_phase(&arena)?;

        let mut buckets: Vec<Vec<PartialRecord>> = vec![Vec::new(); self.partitioner.partitions()];
        for rec in partials.into_iter().flatten() {
            buckets[self.partitioner.partition(&rec.key)].push(rec);
        }
        debug!(
            partitions = buckets.len(),
            partials = buckets.iter().map(Vec::len).sum::<usize>(),
            "partials routed"
        );

        let reduced: Vec<Vec<PairDistance>> = buckets
            .into_par_iter()
            .map(|bucket| {
                let mut reducer = DistanceReducer::with_budget(self.budget);
                reducer.accumulate_all(bucket)?;
                reducer.finalize()
            })
            .collect::<Result<_>>()?;

        let mut distances: Vec<PairDistance> = reduced.into_iter().flatten().collect();
        distances.sort_by(|a, b| a.pair.cmp(&b.pair));
        Ok(distances)
    }

    /// one anchor task per slot, run in parallel
    fn map_phase(&self, arena: &VectorArena) -> Result<Vec<Vec<PartialRecord>>> {
        let tasks: Vec<AnchorTask> = arena
            .slots()
            .map(|slot| AnchorTask::new(Arc::clone(arena), slot, self.mode))
            .collect();
        tasks.par_iter().map(AnchorTask::run).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{Book, Term};
    use crate::pipeline::records::PairKey;
    use crate::utils::math::sparse::{euclidean, SparseVector};
    use proptest::prelude::*;

    fn vector(book: &str, entries: &[(&str, f64)]) -> BookVector {
        BookVector {
            book: Book::new(book),
            weights: SparseVector::from_entries(entries.iter().map(|(t, w)| (Term::from(*t), *w))),
        }
    }

    fn engine(mode: DistanceMode, partitions: usize) -> SimilarityEngine {
        SimilarityEngine::new(&PipelineConfig {
            distance_mode: mode,
            reduce_partitions: partitions,
            max_barrier_entries: None,
        })
    }

    fn lookup(out: &[PairDistance], a: &str, b: &str) -> f64 {
        out.iter()
            .find(|d| d.pair == PairKey::new(Book::new(a), Book::new(b)))
            .map(|d| d.distance)
            .unwrap()
    }

    #[test]
    fn every_pair_exactly_once() {
        let vectors: Vec<BookVector> = (0..7).map(|i| vector(&format!("b{i}"), &[("t", i as f64)])).collect();
        let out = engine(DistanceMode::AnchorTerms, 3).run(vectors).unwrap();
        assert_eq!(out.len(), 7 * 8 / 2);
        let mut keys: Vec<&PairKey> = out.iter().map(|d| &d.pair).collect();
        keys.dedup();
        assert_eq!(keys.len(), out.len());
    }

    #[test]
    fn anchor_terms_mode_drops_terms_only_in_later_book() {
        let vectors = vec![vector("a", &[("x", 1.0)]), vector("b", &[("x", 1.0), ("y", 5.0)])];
        let anchor = engine(DistanceMode::AnchorTerms, 4).run(vectors.clone()).unwrap();
        assert_eq!(lookup(&anchor, "a", "b"), 0.0);
        let union = engine(DistanceMode::Union, 4).run(vectors).unwrap();
        assert_eq!(lookup(&union, "a", "b"), 5.0);
    }

    #[test]
    fn union_mode_is_euclidean() {
        let vectors = vec![vector("a", &[("x", 3.0), ("z", 1.0)]), vector("b", &[("y", 4.0), ("z", 1.0)])];
        let direct = euclidean(vectors[0].weights.union_pairs(&vectors[1].weights));
        let out = engine(DistanceMode::Union, 1).run(vectors).unwrap();
        assert_eq!(lookup(&out, "a", "b"), 5.0);
        assert_eq!(direct, 5.0);
        assert_eq!(lookup(&out, "a", "a"), 0.0);
        assert_eq!(lookup(&out, "b", "b"), 0.0);
    }

    #[test]
    fn shuffle_holds_one_record_per_pair() {
        let terms: Vec<(String, f64)> = (0..3_000).map(|i| (format!("t{i}"), (i % 7) as f64 + 0.5)).collect();
        let books = 30;
        let vectors: Vec<BookVector> = (0..books)
            .map(|b| {
                let refs: Vec<(&str, f64)> = terms
                    .iter()
                    .skip(b * 50)
                    .map(|(t, w)| (t.as_str(), *w))
                    .collect();
                vector(&format!("book{b}"), &refs)
            })
            .collect();
        for mode in [DistanceMode::AnchorTerms, DistanceMode::Union] {
            let e = engine(mode, 8);
            let arena: VectorArena = Arc::new(vectors.iter().cloned().collect());
            let held: usize = e.map_phase(&arena).unwrap().iter().map(Vec::len).sum();
            assert_eq!(held, books * (books + 1) / 2);
        }
    }

    #[test]
    fn empty_input() {
        assert!(engine(DistanceMode::Union, 2).run(Vec::new()).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn partition_count_does_not_change_result(
            weights in proptest::collection::vec(proptest::collection::vec((0usize..5, 0.1f64..10.0), 0..5), 1..8),
            partitions in 1usize..50,
        ) {
            let vectors: Vec<BookVector> = weights
                .iter()
                .enumerate()
                .map(|(i, entries)| {
                    let named: Vec<(String, f64)> = entries.iter().map(|(t, w)| (format!("t{t}"), *w)).collect();
                    let refs: Vec<(&str, f64)> = named.iter().map(|(t, w)| (t.as_str(), *w)).collect();
                    vector(&format!("book{i}"), &refs)
                })
                .collect();
            let one = engine(DistanceMode::Union, 1).run(vectors.clone()).unwrap();
            let many = engine(DistanceMode::Union, partitions).run(vectors).unwrap();
            prop_assert_eq!(one, many);
        }
    }
}
