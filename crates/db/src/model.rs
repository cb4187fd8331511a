use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Store-assigned identifier of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub i64);

impl BookId {
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BookId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(BookId)
    }
}

impl From<i64> for BookId {
    fn from(value: i64) -> Self {
        BookId(value)
    }
}

/// Persisted book record.
///
/// `id`, `version`, `created_at` and `updated_at` are managed by the store:
/// `id` is `Some` exactly when the record has been persisted, and when a
/// book is handed to `save` its `version` is the version the caller last
/// read.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: Option<BookId>,
    pub version: i64,
    pub title: String,
    pub author: String,
    pub price: f64,
    pub isbn: Option<String>,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}

impl Book {
    /// A transient book with no identity yet.
    pub fn new(title: impl Into<String>, author: impl Into<String>, price: f64) -> Self {
        Self {
            id: None,
            version: 0,
            title: title.into(),
            author: author.into(),
            price,
            isbn: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }
}
