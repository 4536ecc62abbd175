use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use book_recommender::config::Config;
use book_recommender::pipeline::BOOK_MATRIX_FILE;
use book_recommender::{logging, DistanceMode, Pipeline, RecommendError, SimilarityMatrix, TopK};
use clap::{Parser, Subcommand};
use tracing::info;

const PROMPT: &str = "Book name> ";

#[derive(Parser)]
#[command(name = "book-recommender")]
#[command(about = "Content-based book recommendations from TF-IDF distances")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./book-recommender.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the similarity matrix from a directory of plain-text books
    Build {
        /// Directory with one book per file
        input: PathBuf,

        /// Directory receiving every stage's records
        #[arg(short, long)]
        output: PathBuf,

        /// Sum over the union of both books' terms
        #[arg(long)]
        union: bool,

        /// Also write a binary snapshot of the matrix
        #[arg(long)]
        snapshot: bool,
    },

    /// Find the closest books; reads names from stdin when none are given
    Query {
        /// Persisted matrix (`book_matrix` text file or `.cbor` snapshot)
        matrix: PathBuf,

        /// Number of matches (overrides the configuration)
        #[arg(short)]
        k: Option<usize>,

        /// Books to query
        books: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    logging::init(&config.logging)?;

    match cli.command {
        Commands::Build { input, output, union, snapshot } => {
            if union {
                config.pipeline.distance_mode = DistanceMode::Union;
            }
            build(&config, &input, &output, snapshot)
        }
        Commands::Query { matrix, k, books } => {
            let k = k.unwrap_or(config.query.top_k);
            query(&matrix, TopK::new(k), &books)
        }
    }
}

fn build(config: &Config, input: &Path, output: &Path, snapshot: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let result = Pipeline::new(config.pipeline.clone())
        .run_dir(input, output)
        .with_context(|| format!("failed to build the matrix from {}", input.display()))?;
    if snapshot {
        let path = output.join(BOOK_MATRIX_FILE).with_extension("cbor");
        SimilarityMatrix::from_distances(result.distances.iter().cloned()).save_snapshot(&path)?;
        info!(path = %path.display(), "snapshot written");
    }
    info!(
        books = result.vectors.len(),
        pairs = result.distances.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "build finished"
    );
    Ok(())
}

fn load_matrix(path: &Path) -> anyhow::Result<SimilarityMatrix> {
    let matrix = if path.extension().is_some_and(|ext| ext == "cbor") {
        SimilarityMatrix::load_snapshot(path)
    } else {
        SimilarityMatrix::load(path)
    };
    matrix.with_context(|| format!("cannot open similarity matrix {}", path.display()))
}

fn query(path: &Path, top: TopK, books: &[String]) -> anyhow::Result<()> {
    let matrix = load_matrix(path)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if !books.is_empty() {
        for book in books {
            answer(&matrix, top, book, &mut out)?;
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let name = line.trim();
        if name.eq_ignore_ascii_case("exit") || name.eq_ignore_ascii_case("quit") {
            break;
        }
        if name.is_empty() {
            continue;
        }
        answer(&matrix, top, name, &mut out)?;
    }
    Ok(())
}

fn answer(matrix: &SimilarityMatrix, top: TopK, book: &str, out: &mut impl Write) -> anyhow::Result<()> {
    match top.query(matrix, book) {
        Ok(neighbors) => write!(out, "{neighbors}")?,
        Err(RecommendError::NotFound(_)) => writeln!(out, "Book is not found.")?,
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
