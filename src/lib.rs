//! citylib - flat-file library catalog
//!
//! Tracks books and members, lends books out and takes them back, and
//! searches or sorts the catalog. State lives in two plain text files that
//! are rewritten in full after every change.
//!
//! # Architecture
//!
//! - Every record is one delimited line; malformed lines are skipped on load
//! - The catalog holds all records in memory and enforces the lending rules
//! - Business failures (unknown ids, already issued) are outcome values,
//!   I/O and validation failures are errors
//!
//! # Modules
//!
//! - `domain`: Data structures (Book, Member, ids)
//! - `library`: Catalog operations, line codec, search and sort
//! - `storage`: Record stores (flat files, in-memory)
//! - `config`: Path and option resolution
//! - `cli`: Command-line interface and interactive shell
//!
//! # Usage
//!
//! ```bash
//! citylib add-book "Dune" "Frank Herbert" SciFi
//! citylib add-member Alice alice@example.com
//! citylib issue 101 201
//! citylib search title dune
//! citylib shell
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod library;
pub mod storage;

// Re-export main types at crate root for convenience
pub use domain::{Book, BookId, Member, MemberId};
pub use library::{
    BookField, Catalog, CatalogError, CatalogOptions, Inconsistency, IssueOutcome, LoadReport,
    ReturnOutcome,
};
pub use storage::{FlatFileStore, MemoryStore, PersistenceError, RecordStore};
