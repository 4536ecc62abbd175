use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// title used when a book file has no `Title:` header
pub const UNKNOWN_TITLE: &str = "unknown";

/// characters reserved by the record grammars
/// (`book1_book2`, `|book_freq`, `term=weight`)
const RESERVED: [char; 3] = ['_', '|', '='];

/// A term, case-folded and stripped of non-alphanumeric characters
pub type Term = Box<str>;

/// Book identifier
///
/// Case-normalized title with all whitespace and record delimiters removed.
/// Normalization is idempotent, so identifiers read back from a record
/// compare equal to the ones that were written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Book(Box<str>);

impl Book {
    /// Falls back to [`UNKNOWN_TITLE`] when nothing survives normalization.
    pub fn new(title: &str) -> Self {
        Self::try_new(title).unwrap_or_else(|| Book(UNKNOWN_TITLE.into()))
    }

    /// `None` when the title normalizes to nothing
    pub fn try_new(title: &str) -> Option<Self> {
        let id: String = title
            .chars()
            .filter(|c| !c.is_whitespace() && !RESERVED.contains(c))
            .flat_map(char::to_lowercase)
            .collect();
        if id.is_empty() {
            None
        } else {
            Some(Book(id.into_boxed_str()))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Book {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Book {
    fn from(title: &str) -> Self {
        Book::new(title)
    }
}
