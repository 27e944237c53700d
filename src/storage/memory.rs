//! In-memory record store.
//!
//! Keeps encoded lines rather than records so the codec is exercised the
//! same way as with real files. Writes can be switched to fail to simulate
//! an unwritable disk.

use std::cell::{Cell, RefCell};
use std::io;
use std::path::PathBuf;

use super::{decode_lines, Loaded, PersistenceError, RecordStore};
use crate::domain::{Book, Member};
use crate::library::codec;

#[derive(Debug, Default)]
pub struct MemoryStore {
    books: RefCell<Vec<String>>,
    members: RefCell<Vec<String>>,
    fail_writes: Cell<bool>,
    fail_reads: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with raw lines
    pub fn with_lines<B, M>(books: B, members: M) -> Self
    where
        B: IntoIterator,
        B::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        let store = Self::new();
        *store.books.borrow_mut() = books.into_iter().map(Into::into).collect();
        *store.members.borrow_mut() = members.into_iter().map(Into::into).collect();
        store
    }

    /// Make every subsequent save fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Make every subsequent load fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    /// Lines currently in the books store
    pub fn book_lines(&self) -> Vec<String> {
        self.books.borrow().clone()
    }

    /// Lines currently in the members store
    pub fn member_lines(&self) -> Vec<String> {
        self.members.borrow().clone()
    }

    fn check_read(&self, name: &str) -> Result<(), PersistenceError> {
        if self.fail_reads.get() {
            return Err(PersistenceError::Read {
                path: PathBuf::from(name),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "reads disabled"),
            });
        }
        Ok(())
    }

    fn check_write(&self, name: &str) -> Result<(), PersistenceError> {
        if self.fail_writes.get() {
            return Err(PersistenceError::Write {
                path: PathBuf::from(name),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "writes disabled"),
            });
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn load_books(&self) -> Result<Loaded<Book>, PersistenceError> {
        self.check_read("memory:books")?;
        let lines = self.books.borrow();
        Ok(decode_lines(lines.iter().map(String::as_str), codec::decode_book))
    }

    fn load_members(&self) -> Result<Loaded<Member>, PersistenceError> {
        self.check_read("memory:members")?;
        let lines = self.members.borrow();
        Ok(decode_lines(lines.iter().map(String::as_str), codec::decode_member))
    }

    fn save_books<'a, I>(&self, books: I) -> Result<(), PersistenceError>
    where
        I: IntoIterator<Item = &'a Book>,
    {
        self.check_write("memory:books")?;
        *self.books.borrow_mut() = books.into_iter().map(codec::encode_book).collect();
        Ok(())
    }

    fn save_members<'a, I>(&self, members: I) -> Result<(), PersistenceError>
    where
        I: IntoIterator<Item = &'a Member>,
    {
        self.check_write("memory:members")?;
        *self.members.borrow_mut() = members.into_iter().map(codec::encode_member).collect();
        Ok(())
    }
}
