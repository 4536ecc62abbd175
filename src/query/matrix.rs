use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ahash::RandomState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::book::Book;
use crate::error::{RecommendError, Result};
use crate::pipeline::records::{read_records, PairDistance};

/// distances from one book to every other book
pub type Row = IndexMap<Book, f64, RandomState>;

/// Row-per-book similarity matrix
///
/// Each stored pair is inserted in both directions, so
/// `get(a, b) == get(b, a)` even though a pair is persisted once.
/// Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    rows: IndexMap<Book, Row, RandomState>,
}

impl SimilarityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_distances<I>(distances: I) -> Self
    where
        I: IntoIterator<Item = PairDistance>,
    {
        let mut matrix = Self::new();
        for PairDistance { pair, distance } in distances {
            matrix
                .rows
                .entry(pair.first.clone())
                .or_default()
                .insert(pair.second.clone(), distance);
            matrix.rows.entry(pair.second).or_default().insert(pair.first, distance);
        }
        matrix
    }

    /// Load a persisted `book1_book2 distance` file
    pub fn load(path: &Path) -> Result<Self> {
        let matrix = Self::from_distances(read_records::<PairDistance>(path)?);
        info!(path = %path.display(), books = matrix.len(), "similarity matrix loaded");
        Ok(matrix)
    }

    /// Write every unordered pair once
    pub fn save(&self, path: &Path) -> Result<usize> {
        let mut writer = BufWriter::new(File::create(path)?);
        let mut written = 0;
        for (idx, (book, row)) in self.rows.iter().enumerate() {
            for (other, distance) in row {
                if self.rows.get_index_of(other).is_some_and(|o| o >= idx) {
                    writeln!(writer, "{}_{} {}", book, other, distance)?;
                    written += 1;
                }
            }
        }
        writer.flush()?;
        Ok(written)
    }

    /// CBOR snapshot
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_cbor::to_writer(writer, self)?;
        Ok(())
    }

    pub fn load_snapshot(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| RecommendError::source_unavailable(path.display().to_string(), e))?;
        let matrix: Self = serde_cbor::from_reader(BufReader::new(file))?;
        info!(path = %path.display(), books = matrix.len(), "similarity matrix snapshot loaded");
        Ok(matrix)
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.rows.get(a).and_then(|row| row.get(b)).copied()
    }

    pub fn row(&self, book: &str) -> Option<&Row> {
        self.rows.get(book)
    }

    pub fn contains(&self, book: &str) -> bool {
        self.rows.contains_key(book)
    }

    pub fn books(&self) -> impl Iterator<Item = &Book> + '_ {
        self.rows.keys()
    }

    /// number of books
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::records::parse_records;

    fn sample() -> SimilarityMatrix {
        SimilarityMatrix::from_distances(parse_records::<PairDistance, _, _>([
            "a_a 0",
            "a_b 1.5",
            "a_c 2",
            "b_b 0",
            "b_c 0.5",
            "c_c 0",
        ]))
    }

    #[test]
    fn both_directions_answer_the_same() {
        let m = sample();
        assert_eq!(m.len(), 3);
        assert_eq!(m.get("a", "b"), Some(1.5));
        assert_eq!(m.get("b", "a"), Some(1.5));
        assert_eq!(m.get("c", "b"), m.get("b", "c"));
        assert_eq!(m.get("a", "a"), Some(0.0));
        assert_eq!(m.get("a", "zzz"), None);
        assert_eq!(m.row("b").map(|r| r.len()), Some(3));
    }

    #[test]
    fn load_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book_matrix");
        std::fs::write(&path, "a_b 1\nnot a record\na_a 0\nb_b 0\n").unwrap();
        let m = SimilarityMatrix::load(&path).unwrap();
        assert_eq!(m.get("b", "a"), Some(1.0));
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = SimilarityMatrix::load(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, RecommendError::SourceUnavailable { .. }));
        let err = SimilarityMatrix::load_snapshot(&dir.path().join("missing.cbor")).unwrap_err();
        assert!(matches!(err, RecommendError::SourceUnavailable { .. }));
    }

    #[test]
    fn save_writes_each_pair_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book_matrix");
        let m = sample();
        assert_eq!(m.save(&path).unwrap(), 6);
        assert_eq!(SimilarityMatrix::load(&path).unwrap().get("c", "a"), Some(2.0));
    }

    #[test]
    fn snapshot_restores_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book_matrix.cbor");
        let m = sample();
        m.save_snapshot(&path).unwrap();
        let back = SimilarityMatrix::load_snapshot(&path).unwrap();
        assert_eq!(back.get("b", "c"), Some(0.5));
        assert_eq!(back.books().count(), 3);
    }
}
