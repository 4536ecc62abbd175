use ahash::RandomState;
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::book::{Book, Term};
use crate::error::Result;
use crate::pipeline::records::{NormalizedFrequency, TermCount, TermPostings};
use crate::pipeline::{EntryBudget, Stage};

type BookCounts = IndexMap<Term, u64, RandomState>;

/// Turns raw counts into within-book normalized frequencies
///
/// freq(term, book) = rawCount / max rawCount in book
///
/// The per-book maximum is only known once every `TermCount` of that book has
/// been seen, and input is not grouped by book, so nothing is emitted before
/// `finalize`.
#[derive(Debug, Clone, Default)]
pub struct FrequencyNormalizer {
    books: IndexMap<Book, BookCounts, RandomState>,
    entries: usize,
    budget: EntryBudget,
}

impl FrequencyNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: EntryBudget) -> Self {
        Self { budget, ..Self::default() }
    }

    /// largest raw count currently held for `book`
    pub fn max_count(&self, book: &str) -> Option<u64> {
        self.books.get(book).and_then(|counts| counts.values().max().copied())
    }
}

impl Stage for FrequencyNormalizer {
    type Input = TermCount;
    type Output = NormalizedFrequency;
    const NAME: &'static str = "normalize";

    fn accumulate(&mut self, rec: TermCount) -> Result<()> {
        let idx = match self.books.get_index_of(&rec.book) {
            Some(idx) => idx,
            None => self.books.insert_full(rec.book, BookCounts::default()).0,
        };
        // a redelivered pair overwrites, it does not add up
        if self.books[idx].insert(rec.term, rec.raw_count).is_none() {
            self.entries += 1;
        } else {
            trace!("duplicate term count replaced");
        }
        self.budget.check(Self::NAME, self.entries)
    }

    fn finalize(self) -> Result<Vec<NormalizedFrequency>> {
        let mut out = Vec::with_capacity(self.entries);
        for (book, counts) in self.books {
            // taken from the surviving counts, so an overwritten larger count is gone
            let max = counts.values().max().copied().unwrap_or(0) as f64;
            for (term, count) in counts {
                out.push(NormalizedFrequency {
                    term,
                    book: book.clone(),
                    freq: count as f64 / max,
                });
            }
        }
        debug!(stage = Self::NAME, emitted = out.len(), "barrier reached");
        Ok(out)
    }
}

/// Collate normalized frequencies into one postings record per term,
/// terms in first-seen order
pub fn group_by_term<I>(freqs: I) -> Vec<TermPostings>
where
    I: IntoIterator<Item = NormalizedFrequency>,
{
    let mut by_term: IndexMap<Term, Vec<(Book, f64)>, RandomState> = IndexMap::default();
    for NormalizedFrequency { term, book, freq } in freqs {
        by_term.entry(term).or_default().push((book, freq));
    }
    by_term
        .into_iter()
        .map(|(term, postings)| TermPostings { term, postings })
        .collect()
}
