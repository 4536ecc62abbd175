use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::{self, Debug, Display};

use crate::book::Book;
use crate::error::{RecommendError, Result};
use crate::query::matrix::SimilarityMatrix;

/// Closest books to a query book
pub struct Neighbors {
    pub query: Book,
    /// (book, distance), ascending by distance then by book
    pub list: Vec<(Book, f64)>,
}

impl Neighbors {
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn books(&self) -> impl Iterator<Item = &Book> + '_ {
        self.list.iter().map(|(book, _)| book)
    }
}

impl Debug for Neighbors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Neighbors of {} [", self.query)?;
            for (book, distance) in &self.list {
                writeln!(f, "    {:?}: {:.6}", book, distance)?;
            }
            write!(f, "]")
        } else {
            f.debug_list().entries(&self.list).finish()
        }
    }
}

/// one line per match, ranked from 1
impl Display for Neighbors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (rank, (book, distance)) in self.list.iter().enumerate() {
            writeln!(f, "{}. {} ({})", rank + 1, book, distance)?;
        }
        Ok(())
    }
}

/// heap entry; the heap max is the member evicted on overflow
struct Candidate<'a> {
    distance: f64,
    seq: usize,
    book: &'a Book,
}

impl Ord for Candidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // largest distance first, among ties the earliest seen
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Candidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate<'_> {}

/// Bounded top-K query over a similarity matrix
#[derive(Debug, Clone, Copy)]
pub struct TopK {
    k: usize,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Up to K books closest to `book`, the book itself excluded.
    ///
    /// Candidates stay in a heap bounded at K; on overflow the largest
    /// distance is evicted, the first one seen when several tie.
    pub fn query(&self, matrix: &SimilarityMatrix, book: &str) -> Result<Neighbors> {
        let query = Book::try_new(book).ok_or_else(|| RecommendError::NotFound(book.to_string()))?;
        let row = matrix
            .row(query.as_str())
            .ok_or_else(|| RecommendError::NotFound(book.to_string()))?;

        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(self.k + 1);
        for (seq, (other, &distance)) in row.iter().enumerate() {
            if *other == query {
                continue;
            }
            heap.push(Candidate { distance, seq, book: other });
            if heap.len() > self.k {
                heap.pop();
            }
        }

        let mut list: Vec<(Book, f64)> = heap.into_iter().map(|c| (c.book.clone(), c.distance)).collect();
        list.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(Neighbors { query, list })
    }
}
