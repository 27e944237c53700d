//! Persistence for the catalog's two collections.
//!
//! Each collection lives in its own backing store, one encoded record per
//! line. Loading is tolerant (undecodable lines are counted and skipped);
//! saving always rewrites the whole store.

pub mod flat_file;
pub mod memory;

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{Book, Member};

pub use flat_file::FlatFileStore;
pub use memory::MemoryStore;

/// Errors raised by a record store
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Records decoded from one backing store
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub records: Vec<T>,

    /// Non-blank lines that failed to decode
    pub skipped: usize,
}

impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

/// Backing stores for books and members.
///
/// Saves receive the full collection and must replace whatever the store
/// held before.
pub trait RecordStore {
    /// Read every decodable book
    fn load_books(&self) -> Result<Loaded<Book>, PersistenceError>;

    /// Read every decodable member
    fn load_members(&self) -> Result<Loaded<Member>, PersistenceError>;

    /// Replace the books store with `books`, in iteration order
    fn save_books<'a, I>(&self, books: I) -> Result<(), PersistenceError>
    where
        I: IntoIterator<Item = &'a Book>;

    /// Replace the members store with `members`, in iteration order
    fn save_members<'a, I>(&self, members: I) -> Result<(), PersistenceError>
    where
        I: IntoIterator<Item = &'a Member>;
}

/// Decode non-blank lines with `decode`, counting the ones that fail.
///
/// A trailing `\r` is stripped first so files written on Windows load.
pub(crate) fn decode_lines<'a, T, L, F>(lines: L, decode: F) -> Loaded<T>
where
    L: IntoIterator<Item = &'a str>,
    F: Fn(&str) -> Option<T>,
{
    let mut loaded = Loaded::default();

    for line in lines {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }
        match decode(line) {
            Some(record) => loaded.records.push(record),
            None => {
                tracing::debug!(line, "Skipping malformed record");
                loaded.skipped += 1;
            }
        }
    }

    loaded
}

/// Decode raw file contents line by line.
///
/// A line that is not valid UTF-8 counts as skipped like any other
/// malformed line; the rest of the file still loads.
pub(crate) fn decode_bytes<T, F>(bytes: &[u8], decode: F) -> Loaded<T>
where
    F: Fn(&str) -> Option<T>,
{
    let mut invalid = 0usize;
    let lines = bytes.split(|&b| b == b'\n').filter_map(|raw| match std::str::from_utf8(raw) {
        Ok(line) => Some(line),
        Err(_) => {
            tracing::debug!(line = %String::from_utf8_lossy(raw), "Skipping line that is not UTF-8");
            invalid += 1;
            None
        }
    });

    let mut loaded = decode_lines(lines, decode);
    loaded.skipped += invalid;
    loaded
}
