use std::sync::Arc;

use crate::config::DistanceMode;
use crate::error::{RecommendError, Result};
use crate::pipeline::records::{BookVector, PairKey};
use crate::utils::datastruct::arena::{Arena, ArenaSlot};
use crate::utils::math::sparse::squared_diff;

/// read-only set of book vectors shared by every map task
pub type VectorArena = Arc<Arena<BookVector>>;

/// Squared-difference sum of one pair, combined over its terms on the map side
#[derive(Debug, Clone, PartialEq)]
pub struct PartialRecord {
    pub key: PairKey,
    pub squared_sum: f64,
}

impl PartialRecord {
    /// zero-contribution record, only marks that the pair exists
    pub fn presence(key: PairKey) -> Self {
        Self { key, squared_sum: 0.0 }
    }
}

/// Map task of the similarity engine
///
/// Holds its anchor's slot in the shared arena and scans only the vectors
/// after it, so every unordered pair is produced by exactly one task.
/// Term contributions are summed per pair before leaving the task, so a task
/// emits one record per pair whatever the vector sizes.
#[derive(Debug, Clone)]
pub struct AnchorTask {
    arena: VectorArena,
    anchor: ArenaSlot,
    mode: DistanceMode,
}

impl AnchorTask {
    pub fn new(arena: VectorArena, anchor: ArenaSlot, mode: DistanceMode) -> Self {
        Self { arena, anchor, mode }
    }

    /// Emit the self pair, then one record per later book.
    pub fn run(&self) -> Result<Vec<PartialRecord>> {
        let anchor = self.arena.get(&self.anchor).ok_or_else(|| {
            RecommendError::source_unavailable(
                "shared vector set",
                format!("no book vector at slot {} of {}", self.anchor.index(), self.arena.len()),
            )
        })?;

        let mut out = Vec::with_capacity(self.arena.len() - self.anchor.index());
        out.push(PartialRecord::presence(PairKey::new(anchor.book.clone(), anchor.book.clone())));
        for (_, other) in self.arena.iter_after(&self.anchor) {
            let squared_sum = match self.mode {
                DistanceMode::AnchorTerms => squared_sum(anchor.weights.anchor_pairs(&other.weights)),
                DistanceMode::Union => squared_sum(anchor.weights.union_pairs(&other.weights)),
            };
            out.push(PartialRecord {
                key: PairKey::new(anchor.book.clone(), other.book.clone()),
                squared_sum,
            });
        }
        Ok(out)
    }
}

fn squared_sum<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    pairs.into_iter().fold(0.0, |acc, (a, o)| acc + squared_diff(a, o))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{Book, Term};
    use crate::utils::math::sparse::SparseVector;

    fn vector(book: &str, entries: &[(&str, f64)]) -> BookVector {
        BookVector {
            book: Book::new(book),
            weights: SparseVector::from_entries(entries.iter().map(|(t, w)| (Term::from(*t), *w))),
        }
    }

    fn arena() -> VectorArena {
        Arc::new(
            vec![
                vector("a", &[("x", 1.0), ("y", 2.0)]),
                vector("b", &[("y", 1.0), ("z", 3.0)]),
                vector("c", &[]),
            ]
            .into_iter()
            .collect(),
        )
    }

    fn keys(records: &[PartialRecord]) -> Vec<String> {
        records.iter().map(|r| r.key.to_string()).collect()
    }

    fn sum_of(records: &[PartialRecord], key: &str) -> f64 {
        records
            .iter()
            .find(|r| r.key.to_string() == key)
            .map(|r| r.squared_sum)
            .unwrap()
    }

    #[test]
    fn scans_forward_only() {
        let arena = arena();
        let out = AnchorTask::new(arena.clone(), ArenaSlot::new(1), DistanceMode::AnchorTerms)
            .run()
            .unwrap();
        assert_eq!(keys(&out), vec!["b_b", "b_c"]);
        let last = AnchorTask::new(arena, ArenaSlot::new(2), DistanceMode::AnchorTerms)
            .run()
            .unwrap();
        assert_eq!(last, vec![PartialRecord::presence(PairKey::new(Book::new("c"), Book::new("c")))]);
    }

    #[test]
    fn anchor_terms_only_sums_anchor_terms() {
        let out = AnchorTask::new(arena(), ArenaSlot::new(0), DistanceMode::AnchorTerms)
            .run()
            .unwrap();
        // x: (1 - 0)^2, y: (2 - 1)^2; z only in b is dropped
        assert_eq!(sum_of(&out, "a_b"), 2.0);
        assert_eq!(sum_of(&out, "a_a"), 0.0);
    }

    #[test]
    fn union_sums_both_term_sets() {
        let out = AnchorTask::new(arena(), ArenaSlot::new(0), DistanceMode::Union)
            .run()
            .unwrap();
        assert_eq!(sum_of(&out, "a_b"), 11.0);
        assert_eq!(sum_of(&out, "a_c"), 5.0);
    }

    #[test]
    fn emits_one_record_per_pair_regardless_of_vector_size() {
        let terms: Vec<(String, f64)> = (0..2_000).map(|i| (format!("t{i}"), 1.0 + i as f64)).collect();
        let refs: Vec<(&str, f64)> = terms.iter().map(|(t, w)| (t.as_str(), *w)).collect();
        let arena: VectorArena = Arc::new((0..5).map(|i| vector(&format!("book{i}"), &refs)).collect());
        for mode in [DistanceMode::AnchorTerms, DistanceMode::Union] {
            let out = AnchorTask::new(arena.clone(), ArenaSlot::new(1), mode).run().unwrap();
            // self pair plus the three later books
            assert_eq!(out.len(), 4);
            assert!(out.iter().all(|r| r.squared_sum == 0.0));
        }
    }

    #[test]
    fn empty_anchor_still_marks_its_pairs() {
        let arena: VectorArena = Arc::new(vec![vector("e", &[]), vector("f", &[("x", 1.0)])].into_iter().collect());
        let out = AnchorTask::new(arena, ArenaSlot::new(0), DistanceMode::AnchorTerms)
            .run()
            .unwrap();
        assert_eq!(keys(&out), vec!["e_e", "e_f"]);
        assert_eq!(sum_of(&out, "e_f"), 0.0);
    }

    #[test]
    fn missing_slot_fails_the_task() {
        let err = AnchorTask::new(arena(), ArenaSlot::new(7), DistanceMode::Union)
            .run()
            .unwrap_err();
        assert!(matches!(err, RecommendError::SourceUnavailable { .. }));
    }
}
