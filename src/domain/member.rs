//! Library members and the books they currently hold.

use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{BookId, MemberId};

/// Basic `local@domain.tld` shape. `\w` is spelled out as ASCII word
/// characters so non-ASCII addresses are rejected.
const EMAIL_PATTERN: &str = r"^[A-Za-z0-9_.-]+@[A-Za-z0-9_.-]+\.[A-Za-z]{2,}$";

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

/// Check an address against the member email pattern
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX
        .get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"))
        .is_match(email)
}

/// A registered library member.
///
/// Equality is by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: String,

    /// Books currently held, in the order they were issued. Never holds
    /// the same id twice.
    #[serde(default)]
    pub issued_books: Vec<BookId>,
}

impl Member {
    /// Create a member holding no books
    pub fn new(id: MemberId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            issued_books: Vec::new(),
        }
    }

    /// Set the held books, dropping repeated ids after their first occurrence
    pub fn with_issued_books(mut self, books: impl IntoIterator<Item = BookId>) -> Self {
        self.issued_books.clear();
        for book in books {
            self.add_issued_book(book);
        }
        self
    }

    /// Record a book as held (no-op if already held)
    pub fn add_issued_book(&mut self, book_id: BookId) {
        if !self.issued_books.contains(&book_id) {
            self.issued_books.push(book_id);
        }
    }

    /// Drop a book from the held list (no-op if absent). Returns whether it was held.
    pub fn return_issued_book(&mut self, book_id: BookId) -> bool {
        if let Some(pos) = self.issued_books.iter().position(|id| *id == book_id) {
            self.issued_books.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn holds(&self, book_id: BookId) -> bool {
        self.issued_books.contains(&book_id)
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Member {}

impl Hash for Member {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let held: Vec<String> = self.issued_books.iter().map(ToString::to_string).collect();
        write!(
            f,
            "ID: {} | Name: {} | Email: {} | IssuedBooks: [{}]",
            self.id,
            self.name,
            self.email,
            held.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last-name_1@mail.example.org"));

        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b.c"));
        assert!(!is_valid_email("a@b.c0m"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("jörg@example.com"));
    }

    #[test]
    fn test_issued_books_have_no_duplicates() {
        let mut member = Member::new(MemberId(201), "Alice", "a@b.com");
        member.add_issued_book(BookId(101));
        member.add_issued_book(BookId(102));
        member.add_issued_book(BookId(101));
        assert_eq!(member.issued_books, vec![BookId(101), BookId(102)]);

        let member = member.with_issued_books([BookId(5), BookId(3), BookId(5)]);
        assert_eq!(member.issued_books, vec![BookId(5), BookId(3)]);
    }

    #[test]
    fn test_return_issued_book() {
        let mut member = Member::new(MemberId(201), "Alice", "a@b.com")
            .with_issued_books([BookId(101), BookId(102)]);

        assert!(member.return_issued_book(BookId(101)));
        assert!(!member.return_issued_book(BookId(101)));
        assert_eq!(member.issued_books, vec![BookId(102)]);
    }

    #[test]
    fn test_display() {
        let member = Member::new(MemberId(201), "Alice", "a@b.com")
            .with_issued_books([BookId(101), BookId(104)]);
        assert_eq!(
            member.to_string(),
            "ID: 201 | Name: Alice | Email: a@b.com | IssuedBooks: [101, 104]"
        );
    }
}
