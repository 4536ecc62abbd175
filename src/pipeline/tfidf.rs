use ahash::RandomState;
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::book::{Book, Term};
use crate::error::Result;
use crate::pipeline::corpus::Corpus;
use crate::pipeline::records::{BookVector, TermPostings};
use crate::pipeline::{EntryBudget, Stage};
use crate::utils::math::sparse::SparseVector;

type Postings = IndexMap<Book, f64, RandomState>;

/// Builds the sparse TF-IDF vector of every book
///
/// ```text
/// IDF(term)         = log2(totalBooks / documentFrequency(term))
/// TFIDF(term, book) = normFreq(term, book) * IDF(term)
/// ```
///
/// The universe of books is discovered while postings arrive, so the book
/// count and every IDF are only known in `finalize`.
/// Several postings records for the same term are merged.
#[derive(Debug, Clone, Default)]
pub struct TfIdfBuilder {
    terms: IndexMap<Term, Postings, RandomState>,
    books: IndexSet<Book, RandomState>,
    entries: usize,
    budget: EntryBudget,
}

impl TfIdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: EntryBudget) -> Self {
        Self { budget, ..Self::default() }
    }

    /// document frequencies of what has been accumulated so far
    pub fn corpus(&self) -> Corpus {
        let mut corpus = Corpus::new();
        corpus.set_book_num(self.books.len() as u64);
        for (term, postings) in &self.terms {
            corpus.set_term_count(term, postings.len() as u64);
        }
        corpus
    }

    pub fn book_num(&self) -> usize {
        self.books.len()
    }
}

impl Stage for TfIdfBuilder {
    type Input = TermPostings;
    type Output = BookVector;
    const NAME: &'static str = "tf-idf";

    fn accumulate(&mut self, rec: TermPostings) -> Result<()> {
        let postings = self.terms.entry(rec.term).or_default();
        for (book, freq) in rec.postings {
            if freq <= 0.0 {
                continue;
            }
            self.books.insert(book.clone());
            if postings.insert(book, freq).is_none() {
                self.entries += 1;
            }
        }
        self.budget.check(Self::NAME, self.entries)
    }

    fn finalize(self) -> Result<Vec<BookVector>> {
        let corpus = self.corpus();
        let mut weights: Vec<Vec<(Term, f64)>> = vec![Vec::new(); self.books.len()];
        for (term, postings) in self.terms {
            let Some(idf) = corpus.idf(&term) else {
                continue;
            };
            for (book, freq) in postings {
                let weight = freq * idf;
                // terms present in every book weigh exactly 0
                if weight == 0.0 {
                    continue;
                }
                if let Some(idx) = self.books.get_index_of(&book) {
                    weights[idx].push((term.clone(), weight));
                }
            }
        }
        let out: Vec<BookVector> = self
            .books
            .into_iter()
            .zip(weights)
            .map(|(book, entries)| BookVector {
                book,
                weights: SparseVector::from_entries(entries),
            })
            .collect();
        debug!(
            stage = Self::NAME,
            books = out.len(),
            vocab = corpus.vocab_size(),
            "barrier reached"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postings(term: &str, entries: &[(&str, f64)]) -> TermPostings {
        TermPostings {
            term: term.into(),
            postings: entries.iter().map(|(b, f)| (Book::new(b), *f)).collect(),
        }
    }

    fn build(input: Vec<TermPostings>) -> Vec<BookVector> {
        let mut stage = TfIdfBuilder::new();
        stage.accumulate_all(input).unwrap();
        stage.finalize().unwrap()
    }

    #[test]
    fn universal_terms_are_omitted() {
        let out = build(vec![
            postings("a", &[("x", 1.0), ("y", 0.5)]),
            postings("b", &[("x", 0.5)]),
        ]);
        assert_eq!(out.len(), 2);
        let x = &out[0];
        assert_eq!(x.book.as_str(), "x");
        assert_eq!(x.weights.get("a"), None);
        assert_eq!(x.weights.get("b"), Some(0.5));
        // y only holds a universal term, its vector is empty but still emitted
        assert_eq!(out[1].book.as_str(), "y");
        assert!(out[1].weights.is_empty());
    }

    #[test]
    fn partial_groups_for_one_term_are_merged() {
        let mut stage = TfIdfBuilder::new();
        stage.accumulate(postings("t", &[("x", 1.0)])).unwrap();
        stage.accumulate(postings("t", &[("y", 1.0)])).unwrap();
        stage.accumulate(postings("u", &[("z", 1.0)])).unwrap();
        let corpus = stage.corpus();
        assert_eq!(corpus.get_book_num(), 3);
        assert_eq!(corpus.get_term_count("t"), 2);
        let out = stage.finalize().unwrap();
        let x = out.iter().find(|v| v.book.as_str() == "x").unwrap();
        assert!((x.weights.weight("t") - (3.0f64 / 2.0).log2()).abs() < 1e-12);
    }

    #[test]
    fn weight_is_tf_times_idf() {
        let out = build(vec![
            postings("rare", &[("x", 0.25)]),
            postings("common", &[("x", 1.0), ("y", 1.0), ("z", 1.0), ("w", 1.0)]),
        ]);
        let x = &out[0];
        assert_eq!(x.weights.len(), 1);
        assert!((x.weights.weight("rare") - 0.25 * 2.0).abs() < 1e-12);
    }

    #[test]
    fn budget_is_enforced() {
        let mut stage = TfIdfBuilder::with_budget(EntryBudget::new(Some(1)));
        let err = stage
            .accumulate(postings("t", &[("x", 1.0), ("y", 1.0)]))
            .unwrap_err();
        assert!(matches!(err, crate::error::RecommendError::BarrierState { stage: "tf-idf", .. }));
    }
}
