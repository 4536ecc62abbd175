//! Error types for the recommender pipeline and query engine.

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, RecommendError>;

/// Error taxonomy of the pipeline
///
/// - `Parse` is recovered locally (the offending record is skipped)
/// - `BarrierState` and `SourceUnavailable` fail the whole stage
/// - `NotFound` is reported to the query caller, never a crash
#[derive(Debug, Error)]
pub enum RecommendError {
    /// Malformed record line
    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// A barrier stage holds more entries than the configured budget
    #[error("barrier state of stage `{stage}` exceeded its budget ({entries} > {limit} entries)")]
    BarrierState {
        stage: &'static str,
        entries: usize,
        limit: usize,
    },

    /// Query for a book that is not in the matrix
    #[error("book not found: {0}")]
    NotFound(String),

    /// Shared vector set, matrix file or input directory cannot be opened
    #[error("source unavailable: {source_name}: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Binary snapshot encode/decode errors
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecommendError {
    /// parse error helper
    pub fn parse(line: usize, reason: impl Into<String>) -> Self {
        RecommendError::Parse { line, reason: reason.into() }
    }

    /// source unavailable helper
    pub fn source_unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        RecommendError::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// true for errors that only invalidate a single record
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RecommendError::Parse { .. })
    }
}

impl From<serde_cbor::Error> for RecommendError {
    fn from(err: serde_cbor::Error) -> Self {
        RecommendError::Snapshot(err.to_string())
    }
}

impl From<toml::de::Error> for RecommendError {
    fn from(err: toml::de::Error) -> Self {
        RecommendError::Config(err.to_string())
    }
}
