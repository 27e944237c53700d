//! Domain types for the library catalog.
//!
//! This module contains the core data structures:
//! - Ids: `BookId` / `MemberId` newtypes
//! - Book: a catalogued title and its issued flag
//! - Member: a borrower and the books they hold

pub mod book;
pub mod ids;
pub mod member;

// Re-export commonly used types
pub use book::Book;
pub use ids::{BookId, MemberId};
pub use member::{is_valid_email, Member};
