//! Corpus to similarity matrix pipeline.
//!
//! Term Counter -> Frequency Normalizer -> TF-IDF Builder -> Similarity Engine.
//! Every aggregating stage is a [`Stage`]: records are accumulated into an
//! owned state, and output only exists once `finalize` consumes that state.

pub mod corpus;
pub mod normalize;
pub mod records;
pub mod scan;
pub mod term_count;
pub mod tfidf;

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::book::{Book, Term};
use crate::config::PipelineConfig;
use crate::error::{RecommendError, Result};
use crate::similarity::SimilarityEngine;

use self::normalize::{group_by_term, FrequencyNormalizer};
use self::records::{write_records, BookVector, PairDistance, TermCount, TermPostings};
use self::scan::BookScanner;
use self::term_count::TermCounter;
use self::tfidf::TfIdfBuilder;

/// output file names inside the pipeline output directory
pub const TERM_COUNTS_FILE: &str = "term_counts";
pub const TERM_POSTINGS_FILE: &str = "term_postings";
pub const BOOK_VECTORS_FILE: &str = "book_vectors";
pub const BOOK_MATRIX_FILE: &str = "book_matrix";

/// Two-phase barrier stage
///
/// `accumulate` is called once per input record in any order, `finalize`
/// exactly once after the last record. Taking `self` by value drops the
/// working state at the barrier.
pub trait Stage {
    type Input;
    type Output;
    /// stage name used in logs and errors
    const NAME: &'static str;

    fn accumulate(&mut self, record: Self::Input) -> Result<()>;

    fn finalize(self) -> Result<Vec<Self::Output>>;

    fn accumulate_all<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Self::Input>,
        Self: Sized,
    {
        for record in records {
            self.accumulate(record)?;
        }
        Ok(())
    }
}

/// Upper bound on the number of entries a stage may hold before its barrier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryBudget {
    limit: Option<usize>,
}

impl EntryBudget {
    pub fn new(limit: Option<usize>) -> Self {
        Self { limit }
    }

    pub fn unbounded() -> Self {
        Self { limit: None }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// fails closed once `entries` passes the limit
    #[inline]
    pub fn check(&self, stage: &'static str, entries: usize) -> Result<()> {
        match self.limit {
            Some(limit) if entries > limit => Err(RecommendError::BarrierState { stage, entries, limit }),
            _ => Ok(()),
        }
    }
}

/// Output of every stage of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub term_counts: Vec<TermCount>,
    pub postings: Vec<TermPostings>,
    pub vectors: Vec<BookVector>,
    pub distances: Vec<PairDistance>,
}

/// Runs the stages in order, in memory
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn budget(&self) -> EntryBudget {
        EntryBudget::new(self.config.max_barrier_entries)
    }

    /// Run on already tokenized books
    pub fn run<I>(&self, books: I) -> Result<PipelineOutput>
    where
        I: IntoIterator<Item = (Book, Vec<Term>)>,
    {
        let mut counter = TermCounter::with_budget(self.budget());
        for (book, terms) in books {
            counter.add_book(&book, terms)?;
        }
        self.run_counter(counter)
    }

    /// Run on raw book texts, each scanned for its title and body
    pub fn run_texts<I, S>(&self, texts: I) -> Result<PipelineOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run(texts.into_iter().map(|text| BookScanner::scan_text(text.as_ref())))
    }

    fn run_counter(&self, counter: TermCounter) -> Result<PipelineOutput> {
        info!(books = counter.book_num(), pairs = counter.len(), "term counting done");
        let term_counts = counter.finalize()?;

        let mut normalizer = FrequencyNormalizer::with_budget(self.budget());
        normalizer.accumulate_all(term_counts.iter().cloned())?;
        let postings = group_by_term(normalizer.finalize()?);
        info!(terms = postings.len(), "normalization done");

        let mut builder = TfIdfBuilder::with_budget(self.budget());
        builder.accumulate_all(postings.iter().cloned())?;
        let vectors = builder.finalize()?;
        info!(books = vectors.len(), "tf-idf vectors built");

        let distances = SimilarityEngine::new(&self.config).run(vectors.clone())?;
        info!(pairs = distances.len(), "similarity matrix built");

        Ok(PipelineOutput { term_counts, postings, vectors, distances })
    }

    /// Read every file of `input_dir` as one book, run the pipeline and write
    /// each stage's records into `output_dir`.
    pub fn run_dir(&self, input_dir: &Path, output_dir: &Path) -> Result<PipelineOutput> {
        let mut files: Vec<PathBuf> = fs::read_dir(input_dir)
            .map_err(|e| RecommendError::source_unavailable(input_dir.display().to_string(), e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        if files.is_empty() {
            warn!(dir = %input_dir.display(), "no book files found");
        }
        info!(files = files.len(), threads = rayon::current_num_threads(), "scanning books");

        // one counter per file, merged in file order
        let counters: Vec<TermCounter> = files
            .par_iter()
            .filter_map(|path| match fs::read_to_string(path) {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable book file");
                    None
                }
            })
            .map(|text| {
                let (book, terms) = BookScanner::scan_text(&text);
                let mut counter = TermCounter::new();
                counter.add_book(&book, terms)?;
                Ok(counter)
            })
            .collect::<Result<_>>()?;
        let mut counter = TermCounter::with_budget(self.budget());
        for part in counters {
            counter.merge(part)?;
        }

        let output = self.run_counter(counter)?;
        fs::create_dir_all(output_dir)?;
        write_records(&output_dir.join(TERM_COUNTS_FILE), &output.term_counts)?;
        write_records(&output_dir.join(TERM_POSTINGS_FILE), &output.postings)?;
        write_records(&output_dir.join(BOOK_VECTORS_FILE), &output.vectors)?;
        write_records(&output_dir.join(BOOK_MATRIX_FILE), &output.distances)?;
        info!(dir = %output_dir.display(), "pipeline output written");
        Ok(output)
    }
}
