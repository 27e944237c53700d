//! Search and ordering over the book collection.
//!
//! Both work on whatever book iterator they are handed and never mutate it.
//! Matching and ordering ignore letter case.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use crate::domain::Book;
use crate::storage::RecordStore;

/// Book field used for searching and sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookField {
    Title,
    Author,
    Category,
}

impl BookField {
    /// The field's text on `book`
    pub fn of<'a>(&self, book: &'a Book) -> &'a str {
        match self {
            BookField::Title => &book.title,
            BookField::Author => &book.author,
            BookField::Category => &book.category,
        }
    }
}

impl fmt::Display for BookField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookField::Title => write!(f, "title"),
            BookField::Author => write!(f, "author"),
            BookField::Category => write!(f, "category"),
        }
    }
}

impl FromStr for BookField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "title" => Ok(BookField::Title),
            "author" => Ok(BookField::Author),
            "category" => Ok(BookField::Category),
            _ => anyhow::bail!("Unknown book field: {}", s),
        }
    }
}

/// Books whose `field` contains `query`, case-insensitively, in input order.
/// An empty query matches every book.
pub fn search<'a, I>(books: I, field: BookField, query: &str) -> Vec<&'a Book>
where
    I: IntoIterator<Item = &'a Book>,
{
    let query_lower = query.to_lowercase();

    books
        .into_iter()
        .filter(|book| field.of(book).to_lowercase().contains(&query_lower))
        .collect()
}

/// Books ordered by `field`, case-insensitively. Ties keep input order.
pub fn sort_by<'a, I>(books: I, field: BookField) -> Vec<&'a Book>
where
    I: IntoIterator<Item = &'a Book>,
{
    let mut sorted: Vec<&Book> = books.into_iter().collect();
    sorted.sort_by_cached_key(|book| field.of(book).to_lowercase());
    sorted
}

impl<S: RecordStore> Catalog<S> {
    pub fn search_by(&self, field: BookField, query: &str) -> Vec<&Book> {
        search(self.books(), field, query)
    }

    pub fn search_by_title(&self, query: &str) -> Vec<&Book> {
        self.search_by(BookField::Title, query)
    }

    pub fn search_by_author(&self, query: &str) -> Vec<&Book> {
        self.search_by(BookField::Author, query)
    }

    pub fn search_by_category(&self, query: &str) -> Vec<&Book> {
        self.search_by(BookField::Category, query)
    }

    pub fn sorted_by(&self, field: BookField) -> Vec<&Book> {
        sort_by(self.books(), field)
    }

    pub fn sorted_by_title(&self) -> Vec<&Book> {
        self.sorted_by(BookField::Title)
    }

    pub fn sorted_by_author(&self) -> Vec<&Book> {
        self.sorted_by(BookField::Author)
    }

    pub fn sorted_by_category(&self) -> Vec<&Book> {
        self.sorted_by(BookField::Category)
    }
}
