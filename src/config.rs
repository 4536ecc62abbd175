//! Configuration for the pipeline, the query engine and logging.
//!
//! Loaded from TOML; every field has a default so an empty or missing
//! file yields a working configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RecommendError, Result};

/// default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "book-recommender.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
}

/// Which terms contribute to a pair distance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceMode {
    /// Only the anchor book's terms are summed.
    /// Terms present only in the later book are dropped (reference behaviour).
    #[default]
    AnchorTerms,
    /// Sum over the union of both term sets (true Euclidean distance)
    Union,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub distance_mode: DistanceMode,
    /// number of aggregation partitions for pair distances
    pub reduce_partitions: usize,
    /// upper bound on entries held by a barrier stage, `None` is unbounded
    pub max_barrier_entries: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            distance_mode: DistanceMode::AnchorTerms,
            reduce_partitions: 40,
            max_barrier_entries: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// K of the top-K query
    pub top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { top_k: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Config {
    /// Load from `path`, or from `./book-recommender.toml` when `path` is `None`.
    /// An explicit path must exist; the implicit one falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !path.exists() {
            if explicit {
                return Err(RecommendError::Config(format!("config file not found: {}", path.display())));
            }
            return Ok(Config::default());
        }
        let content = fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.reduce_partitions == 0 {
            return Err(RecommendError::Config("pipeline.reduce_partitions must be at least 1".into()));
        }
        if self.pipeline.max_barrier_entries == Some(0) {
            return Err(RecommendError::Config("pipeline.max_barrier_entries must be at least 1".into()));
        }
        Ok(())
    }
}
