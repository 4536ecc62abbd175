use ahash::RandomState;
use indexmap::IndexMap;

use crate::book::Term;

/// keep book count and per-term document frequency
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// number of books in the corpus
    pub book_num: u64,
    /// distinct books containing each term
    pub term_counts: IndexMap<Term, u64, RandomState>,
}

impl Corpus {
    /// Create a new instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a term's document frequency directly
    pub fn set_term_count(&mut self, term: &str, count: u64) {
        self.term_counts.insert(term.into(), count);
    }

    pub fn set_book_num(&mut self, book_num: u64) {
        self.book_num = book_num;
    }

    /// Get the number of books in the corpus
    #[inline]
    pub fn get_book_num(&self) -> u64 {
        self.book_num
    }

    /// Get the document frequency of a term, 0 if unknown
    pub fn get_term_count(&self, term: &str) -> u64 {
        self.term_counts.get(term).copied().unwrap_or(0)
    }

    /// log2(books / df)
    /// `None` for a term no book contains
    pub fn idf(&self, term: &str) -> Option<f64> {
        match self.get_term_count(term) {
            0 => None,
            df => Some((self.book_num as f64 / df as f64).log2()),
        }
    }

    /// Get the current vocabulary size (number of unique terms)
    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.term_counts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_counts_and_vocab() {
        let mut corpus = Corpus::new();
        corpus.set_book_num(2);
        corpus.set_term_count("a", 2);
        corpus.set_term_count("b", 1);
        corpus.set_term_count("b", 2);
        assert_eq!(corpus.get_book_num(), 2);
        assert_eq!(corpus.get_term_count("a"), 2);
        assert_eq!(corpus.get_term_count("b"), 2);
        assert_eq!(corpus.get_term_count("c"), 0);
        assert_eq!(corpus.vocab_size(), 2);
    }

    #[test]
    fn idf_is_log2_of_ratio() {
        let mut corpus = Corpus::new();
        corpus.set_book_num(8);
        corpus.set_term_count("rare", 1);
        corpus.set_term_count("everywhere", 8);
        assert_eq!(corpus.idf("rare"), Some(3.0));
        assert_eq!(corpus.idf("everywhere"), Some(0.0));
        assert_eq!(corpus.idf("missing"), None);
    }
}
