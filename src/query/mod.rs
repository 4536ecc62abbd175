//! Top-K query engine over a persisted similarity matrix.

pub mod matrix;
pub mod topk;

pub use self::matrix::{Row, SimilarityMatrix};
pub use self::topk::{Neighbors, TopK};
