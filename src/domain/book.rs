//! Books held by the library.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::BookId;

/// A catalogued book.
///
/// Two books are equal when their ids are equal; the text fields and the
/// issued flag do not take part in identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    /// Identifier assigned by the catalog
    pub id: BookId,

    /// Title used for search and sorting
    pub title: String,

    pub author: String,

    /// Free-text category, also collected into the catalog's category set
    pub category: String,

    /// Whether the book is currently out with a member
    pub issued: bool,
}

impl Book {
    /// Create a book that is not issued
    pub fn new(
        id: BookId,
        title: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
            category: category.into(),
            issued: false,
        }
    }

    pub fn mark_issued(&mut self) {
        self.issued = true;
    }

    pub fn mark_returned(&mut self) {
        self.issued = false;
    }
}

impl PartialEq for Book {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Book {}

impl Hash for Book {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ID: {} | Title: {} | Author: {} | Category: {} | Issued: {}",
            self.id,
            self.title,
            self.author,
            self.category,
            if self.issued { "Yes" } else { "No" }
        )
    }
}
