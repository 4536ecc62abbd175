use ahash::RandomState;
use indexmap::IndexMap;
use tracing::debug;

use crate::book::{Book, Term};
use crate::error::Result;
use crate::pipeline::records::TermCount;
use crate::pipeline::{EntryBudget, Stage};

type Counts = IndexMap<Term, u64, RandomState>;

/// Counts occurrences of every (term, book) pair
///
/// Input is a stream of `(book, term)` observations in any order.
/// `finalize` emits one `TermCount` per distinct pair, grouped by book in
/// first-seen order.
#[derive(Debug, Clone, Default)]
pub struct TermCounter {
    books: IndexMap<Book, Counts, RandomState>,
    entries: usize,
    budget: EntryBudget,
}

impl TermCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: EntryBudget) -> Self {
        Self { budget, ..Self::default() }
    }

    /// Count every term of one book
    pub fn add_book<I>(&mut self, book: &Book, terms: I) -> Result<()>
    where
        I: IntoIterator<Item = Term>,
    {
        for term in terms {
            self.add(book, term, 1)?;
        }
        Ok(())
    }

    fn add(&mut self, book: &Book, term: Term, n: u64) -> Result<()> {
        let idx = match self.books.get_index_of(book) {
            Some(idx) => idx,
            None => self.books.insert_full(book.clone(), Counts::default()).0,
        };
        let entries = &mut self.entries;
        let slot = self.books[idx].entry(term).or_insert_with(|| {
            *entries += 1;
            0
        });
        *slot += n;
        self.budget.check(Self::NAME, self.entries)
    }

    /// Sum another counter into this one.
    /// Used to combine counters built in parallel, one per book file.
    pub fn merge(&mut self, other: TermCounter) -> Result<()> {
        for (book, counts) in other.books {
            for (term, n) in counts {
                self.add(&book, term, n)?;
            }
        }
        Ok(())
    }

    pub fn count(&self, term: &str, book: &str) -> u64 {
        self.books
            .get(book)
            .and_then(|counts| counts.get(term))
            .copied()
            .unwrap_or(0)
    }

    /// number of distinct (term, book) pairs
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn book_num(&self) -> usize {
        self.books.len()
    }
}

impl Stage for TermCounter {
    type Input = (Book, Term);
    type Output = TermCount;
    const NAME: &'static str = "term-count";

    fn accumulate(&mut self, (book, term): Self::Input) -> Result<()> {
        self.add(&book, term, 1)
    }

    fn finalize(self) -> Result<Vec<TermCount>> {
        let mut out = Vec::with_capacity(self.entries);
        for (book, counts) in self.books {
            for (term, raw_count) in counts {
                out.push(TermCount { term, book: book.clone(), raw_count });
            }
        }
        debug!(stage = Self::NAME, emitted = out.len(), "barrier reached");
        Ok(out)
    }
}
