use serde::{Deserialize, Serialize};

use super::ids::BookId;

/// A catalog entry.
///
/// `is_available` must mirror the absence of an active loan for this book at
/// all times. Only lifecycle decisions flip it; catalog updates touch the
/// descriptive fields alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    pub is_available: bool,
}

impl Book {
    /// Creates a new, available book with a fresh identity.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
        publication_year: i32,
    ) -> Self {
        Self {
            id: BookId::new(),
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
            publication_year,
            is_available: true,
        }
    }
}
