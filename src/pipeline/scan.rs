//! Line scanner for plain-text book files.
//!
//! Header lines up to `*** START OF` may carry a `Title:` line; body lines up to
//! `*** END OF` are split into terms; everything after the end marker is ignored.

use crate::book::{Book, Term, UNKNOWN_TITLE};

const START_MARKER: &str = "*** START OF";
const END_MARKER: &str = "*** END OF";
const TITLE_MARKER: &str = "Title:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Body,
    Trailer,
}

/// Scans the lines of one book and yields its terms
#[derive(Debug, Clone)]
pub struct BookScanner {
    title: Book,
    section: Section,
}

impl Default for BookScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl BookScanner {
    pub fn new() -> Self {
        Self {
            title: Book::new(UNKNOWN_TITLE),
            section: Section::Header,
        }
    }

    /// current title
    pub fn book(&self) -> &Book {
        &self.title
    }

    /// Feed one line, returning the terms it contributes.
    pub fn scan_line(&mut self, line: &str) -> Vec<Term> {
        if line.is_empty() {
            return Vec::new();
        }
        if line.contains(START_MARKER) {
            self.section = Section::Body;
            return Vec::new();
        }
        if line.contains(END_MARKER) {
            self.section = Section::Trailer;
            return Vec::new();
        }
        match self.section {
            Section::Header => {
                if let Some((_, title)) = line.split_once(TITLE_MARKER) {
                    self.title = Book::new(title);
                }
                Vec::new()
            }
            Section::Body => line.split_whitespace().filter_map(normalize_term).collect(),
            Section::Trailer => Vec::new(),
        }
    }

    /// Scan a whole text, returning the title and every term occurrence
    pub fn scan_text(text: &str) -> (Book, Vec<Term>) {
        let mut scanner = BookScanner::new();
        let mut terms = Vec::new();
        for line in text.lines() {
            terms.extend(scanner.scan_line(line));
        }
        (scanner.title, terms)
    }
}

/// lower-case a token and keep only ASCII alphanumerics
/// `None` when nothing is left
pub fn normalize_term(token: &str) -> Option<Term> {
    let term: String = token
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if term.is_empty() {
        None
    } else {
        Some(term.into_boxed_str())
    }
}
