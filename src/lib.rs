/// This crate is a content-based book recommender built on TF-IDF vectors
/// and an all-pairs Euclidean distance matrix.
pub mod book;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod query;
pub mod similarity;
pub mod utils;

/// Pipeline
/// Runs every stage in order, from tokenized (or raw) books to pair distances.
///
/// Stages:
/// - Term Counter: raw count of each (term, book) pair
/// - Frequency Normalizer: count / largest count in the same book
/// - TF-IDF Builder: normalized frequency x log2(books / document frequency)
/// - Similarity Engine: Euclidean distance of every unordered pair
///
/// `run_dir` also reads one book per file and writes each stage's records
/// as line-oriented text.
pub use pipeline::{Pipeline, PipelineOutput};

/// Barrier Stage Trait
/// Two-phase contract shared by every aggregating stage.
/// `accumulate` takes records in any order; `finalize` consumes the stage and
/// emits its output once all input has been seen.
pub use pipeline::{EntryBudget, Stage};

/// Stage Records
/// The records exchanged between stages. Each one has a text line form
/// (`Display` / `FromStr`):
/// - `TermCount`: `term book rawCount`
/// - `TermPostings`: `term |book1_freq1|book2_freq2|...`
/// - `BookVector`: `book term1=weight1 term2=weight2 ...`
/// - `PairDistance`: `book1_book2 distance`
pub use pipeline::records::{BookVector, NormalizedFrequency, PairDistance, PairKey, TermCount, TermPostings};

/// Corpus statistics
/// Number of books and the document frequency of each term.
/// Used as the base data for IDF calculation.
pub use pipeline::corpus::Corpus;

/// Pairwise Similarity Engine
/// Each book vector is the anchor of one parallel map task that scans the
/// shared vector arena forward from its own position, so every unordered pair
/// is computed exactly once. Partial records are routed to reduce partitions
/// by the pair's second book.
pub use similarity::SimilarityEngine;

/// Similarity Matrix and Top-K Query
/// - `SimilarityMatrix`: row-per-book distances, both directions stored
/// - `TopK`: K closest books to a query book using a bounded candidate heap
/// - `Neighbors`: ranked result of one query
pub use query::{Neighbors, SimilarityMatrix, TopK};

/// Sparse term-weight vector, generic over float weight types
pub use utils::math::sparse::SparseVector;

pub use book::{Book, Term};
pub use config::{Config, DistanceMode};
pub use error::{RecommendError, Result};
