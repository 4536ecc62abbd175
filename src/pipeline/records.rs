//! Records exchanged between stages and their line grammars.
//!
//! | record          | line                                  |
//! |-----------------|---------------------------------------|
//! | `TermCount`     | `term book rawCount`                  |
//! | `TermPostings`  | `term |book1_freq1|book2_freq2|...`   |
//! | `BookVector`    | `book term1=weight1 term2=weight2 ...`|
//! | `PairDistance`  | `book1_book2 distance`                |

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::book::{Book, Term};
use crate::error::{RecommendError, Result};
use crate::pipeline::scan::normalize_term;
use crate::utils::math::sparse::SparseVector;

/// Raw occurrence count of a term in a book, `raw_count >= 1`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: Term,
    pub book: Book,
    pub raw_count: u64,
}

/// raw count divided by the book's largest raw count, in (0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFrequency {
    pub term: Term,
    pub book: Book,
    pub freq: f64,
}

/// Every (book, normalized frequency) of one term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermPostings {
    pub term: Term,
    pub postings: Vec<(Book, f64)>,
}

/// TF-IDF vector of one book (the book characteristic vector)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookVector {
    pub book: Book,
    pub weights: SparseVector<f64>,
}

/// Unordered pair of books, `first` precedes `second` in the shared ordering
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub first: Book,
    pub second: Book,
}

/// Final distance of one pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairDistance {
    pub pair: PairKey,
    pub distance: f64,
}

impl PairKey {
    pub fn new(first: Book, second: Book) -> Self {
        Self { first, second }
    }

    pub fn is_self_pair(&self) -> bool {
        self.first == self.second
    }
}

fn parse_weight(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if !value.is_finite() {
        return Err(format!("`{s}` is not finite"));
    }
    Ok(value)
}

/// `0.25` or the `count/max` fraction form
fn parse_frequency(s: &str) -> std::result::Result<f64, String> {
    let freq = match s.split_once('/') {
        Some((num, den)) => {
            let num: u64 = num.parse().map_err(|_| format!("bad numerator in `{s}`"))?;
            let den: u64 = den.parse().map_err(|_| format!("bad denominator in `{s}`"))?;
            if den == 0 {
                return Err(format!("zero denominator in `{s}`"));
            }
            num as f64 / den as f64
        }
        None => parse_weight(s)?,
    };
    if freq <= 0.0 || freq > 1.0 {
        return Err(format!("frequency {freq} outside (0, 1]"));
    }
    Ok(freq)
}

impl fmt::Display for TermCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.term, self.book, self.raw_count)
    }
}

impl FromStr for TermCount {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut it = line.split_whitespace();
        let (Some(term), Some(book), Some(count), None) = (it.next(), it.next(), it.next(), it.next()) else {
            return Err("expected `term book rawCount`".to_string());
        };
        let raw_count: u64 = count.parse().map_err(|_| format!("bad count `{count}`"))?;
        if raw_count == 0 {
            return Err("raw count must be at least 1".to_string());
        }
        let term = normalize_term(term).ok_or_else(|| format!("bad term `{term}`"))?;
        Ok(TermCount {
            term,
            book: Book::new(book),
            raw_count,
        })
    }
}

impl fmt::Display for TermPostings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.term)?;
        for (book, freq) in &self.postings {
            write!(f, "|{}_{}", book, freq)?;
        }
        Ok(())
    }
}

impl FromStr for TermPostings {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let (term, rest) = line
            .split_once('|')
            .ok_or_else(|| "expected `term |book_freq...`".to_string())?;
        let term = term.trim();
        if term.is_empty() || term.contains(char::is_whitespace) {
            return Err(format!("bad term `{term}`"));
        }
        let mut postings = Vec::new();
        for group in rest.split('|').map(str::trim).filter(|g| !g.is_empty()) {
            let (book, freq) = group
                .rsplit_once('_')
                .ok_or_else(|| format!("expected `book_freq`, got `{group}`"))?;
            postings.push((Book::new(book), parse_frequency(freq)?));
        }
        if postings.is_empty() {
            return Err(format!("term `{term}` has no postings"));
        }
        Ok(TermPostings { term: term.into(), postings })
    }
}

impl fmt::Display for BookVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.book)?;
        for (term, weight) in self.weights.iter() {
            write!(f, " {}={}", term, weight)?;
        }
        Ok(())
    }
}

impl FromStr for BookVector {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut it = line.split_whitespace();
        let book = it.next().ok_or_else(|| "empty vector record".to_string())?;
        let mut entries = Vec::new();
        for token in it {
            let (term, weight) = token
                .split_once('=')
                .ok_or_else(|| format!("expected `term=weight`, got `{token}`"))?;
            if term.is_empty() {
                return Err(format!("empty term in `{token}`"));
            }
            entries.push((Term::from(term), parse_weight(weight)?));
        }
        Ok(BookVector {
            book: Book::new(book),
            weights: SparseVector::from_entries(entries),
        })
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.first, self.second)
    }
}

impl FromStr for PairKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('_') {
            Some((a, b)) if !a.is_empty() && !b.is_empty() && !b.contains('_') => {
                Ok(PairKey::new(Book::new(a), Book::new(b)))
            }
            _ => Err(format!("expected `book1_book2`, got `{s}`")),
        }
    }
}

impl fmt::Display for PairDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pair, self.distance)
    }
}

impl FromStr for PairDistance {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut it = line.split_whitespace();
        let (Some(key), Some(distance), None) = (it.next(), it.next(), it.next()) else {
            return Err("expected `book1_book2 distance`".to_string());
        };
        let distance = parse_weight(distance)?;
        if distance < 0.0 {
            return Err(format!("negative distance {distance}"));
        }
        Ok(PairDistance { pair: key.parse()?, distance })
    }
}

/// Parse records from lines.
/// Blank lines are ignored, malformed lines are logged and skipped.
pub fn parse_records<T, I, S>(lines: I) -> Vec<T>
where
    T: FromStr<Err = String>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    for (idx, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<T>() {
            Ok(rec) => out.push(rec),
            Err(reason) => {
                let err = RecommendError::parse(idx + 1, reason);
                warn!(%err, "skipping malformed record");
            }
        }
    }
    out
}

/// Read a record file; a file that cannot be opened is `SourceUnavailable`
pub fn read_records<T>(path: &Path) -> Result<Vec<T>>
where
    T: FromStr<Err = String>,
{
    let file = File::open(path).map_err(|e| RecommendError::source_unavailable(path.display().to_string(), e))?;
    let lines = BufReader::new(file).lines().collect::<std::io::Result<Vec<String>>>()?;
    let records = parse_records(lines);
    debug!(path = %path.display(), records = records.len(), "records read");
    Ok(records)
}

pub fn write_records<'a, T, I>(path: &Path, records: I) -> Result<usize>
where
    T: fmt::Display + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0;
    for rec in records {
        writeln!(writer, "{}", rec)?;
        written += 1;
    }
    writer.flush()?;
    debug!(path = %path.display(), records = written, "records written");
    Ok(written)
}
