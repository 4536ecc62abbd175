use std::cmp::Ordering;

use num::Float;
use serde::{Deserialize, Serialize};

use crate::book::Term;

/// Sparse term-weight vector
///
/// Entries are kept sorted by term, one entry per term.
/// A term without an entry has an implicit weight of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector<N = f64>
where
    N: Float,
{
    entries: Vec<(Term, N)>,
}

impl<N> Default for SparseVector<N>
where
    N: Float,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N> SparseVector<N>
where
    N: Float,
{
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Build from entries in any order.
    /// Zero weights are dropped; for a repeated term the last weight wins.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Term, N)>,
    {
        let mut entries: Vec<(Term, N)> = entries.into_iter().collect();
        // stable sort keeps input order among equal terms
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let mut deduped: Vec<(Term, N)> = Vec::with_capacity(entries.len());
        for (term, weight) in entries {
            match deduped.last_mut() {
                Some(last) if last.0 == term => last.1 = weight,
                _ => deduped.push((term, weight)),
            }
        }
        deduped.retain(|(_, w)| !w.is_zero());
        Self { entries: deduped }
    }

    #[inline]
    pub fn get(&self, term: &str) -> Option<N> {
        self.entries
            .binary_search_by(|(t, _)| (**t).cmp(term))
            .ok()
            .map(|i| self.entries[i].1)
    }

    #[inline]
    pub fn weight(&self, term: &str) -> N {
        self.get(term).unwrap_or_else(N::zero)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, N)> + '_ {
        self.entries.iter().map(|(t, w)| (&**t, *w))
    }

    /// (self_i, other_i) for every term of `self`
    /// terms only `other` has are not visited
    pub fn anchor_pairs<'a>(&'a self, other: &'a SparseVector<N>) -> impl Iterator<Item = (N, N)> + 'a {
        self.entries.iter().map(move |(t, w)| (*w, other.weight(t)))
    }

    /// (self_i, other_i) for every term of either vector
    /// merge join over the two sorted entry lists
    pub fn union_pairs(&self, other: &SparseVector<N>) -> Vec<(N, N)> {
        let mut out = Vec::with_capacity(self.len().max(other.len()));
        let mut a_it = self.entries.iter().fuse();
        let mut b_it = other.entries.iter().fuse();
        let mut a_next = a_it.next();
        let mut b_next = b_it.next();
        while let (Some((ta, wa)), Some((tb, wb))) = (a_next, b_next) {
            match ta.cmp(tb) {
                Ordering::Equal => {
                    out.push((*wa, *wb));
                    a_next = a_it.next();
                    b_next = b_it.next();
                }
                Ordering::Less => {
                    out.push((*wa, N::zero()));
                    a_next = a_it.next();
                }
                Ordering::Greater => {
                    out.push((N::zero(), *wb));
                    b_next = b_it.next();
                }
            }
        }
        while let Some((_, wa)) = a_next {
            out.push((*wa, N::zero()));
            a_next = a_it.next();
        }
        while let Some((_, wb)) = b_next {
            out.push((N::zero(), *wb));
            b_next = b_it.next();
        }
        out
    }
}

/// (a - b)^2
#[inline(always)]
pub fn squared_diff<N: Float>(a: N, b: N) -> N {
    let diff = a - b;
    diff * diff
}

/// sqrt(Σ (a_i - b_i)^2)
pub fn euclidean<N, I>(pairs: I) -> N
where
    N: Float,
    I: IntoIterator<Item = (N, N)>,
{
    pairs
        .into_iter()
        .fold(N::zero(), |acc, (a, b)| acc + squared_diff(a, b))
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(entries: &[(&str, f64)]) -> SparseVector<f64> {
        SparseVector::from_entries(entries.iter().map(|(t, w)| (Term::from(*t), *w)))
    }

    #[test]
    fn from_entries_sorts_dedups_and_drops_zero() {
        let v = vec_of(&[("b", 2.0), ("a", 1.0), ("c", 0.0), ("b", 3.0)]);
        assert_eq!(v.iter().collect::<Vec<_>>(), vec![("a", 1.0), ("b", 3.0)]);
        assert_eq!(v.weight("c"), 0.0);
        assert_eq!(v.get("zzz"), None);
    }

    #[test]
    fn anchor_pairs_skip_terms_only_in_other() {
        let a = vec_of(&[("x", 1.0)]);
        let b = vec_of(&[("x", 0.5), ("y", 4.0)]);
        assert_eq!(a.anchor_pairs(&b).collect::<Vec<_>>(), vec![(1.0, 0.5)]);
        assert_eq!(euclidean(a.anchor_pairs(&b)), 0.5);
    }

    #[test]
    fn union_pairs_cover_both_term_sets() {
        let a = vec_of(&[("a", 1.0), ("c", 3.0)]);
        let b = vec_of(&[("b", 2.0), ("c", 1.0), ("d", 1.0)]);
        assert_eq!(
            a.union_pairs(&b),
            vec![(1.0, 0.0), (0.0, 2.0), (3.0, 1.0), (0.0, 1.0)]
        );
        assert!((euclidean(a.union_pairs(&b)) - 10f64.sqrt()).abs() < 1e-12);
        assert_eq!(euclidean(a.union_pairs(&b)), euclidean(b.union_pairs(&a)));
    }

    #[test]
    fn empty_vectors_are_at_distance_zero() {
        let e = SparseVector::<f64>::new();
        assert!(e.union_pairs(&e).is_empty());
        assert_eq!(euclidean::<f64, _>(e.union_pairs(&e)), 0.0);
    }
}
