//! Two plain text files, one per collection.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{decode_bytes, Loaded, PersistenceError, RecordStore};
use crate::domain::{Book, Member};
use crate::library::codec;

/// Default books file, relative to the working directory
pub const DEFAULT_BOOKS_FILE: &str = "books.txt";

/// Default members file, relative to the working directory
pub const DEFAULT_MEMBERS_FILE: &str = "members.txt";

/// File-based record store
#[derive(Debug, Clone)]
pub struct FlatFileStore {
    books_path: PathBuf,
    members_path: PathBuf,
}

impl FlatFileStore {
    pub fn new(books_path: impl Into<PathBuf>, members_path: impl Into<PathBuf>) -> Self {
        Self {
            books_path: books_path.into(),
            members_path: members_path.into(),
        }
    }

    /// Store using `books.txt` and `members.txt` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(DEFAULT_BOOKS_FILE), dir.join(DEFAULT_MEMBERS_FILE))
    }

    pub fn books_path(&self) -> &Path {
        &self.books_path
    }

    pub fn members_path(&self) -> &Path {
        &self.members_path
    }

    /// Create both files empty if they do not exist yet
    pub fn ensure_files(&self) -> Result<(), PersistenceError> {
        ensure_file(&self.books_path)?;
        ensure_file(&self.members_path)
    }
}

impl RecordStore for FlatFileStore {
    fn load_books(&self) -> Result<Loaded<Book>, PersistenceError> {
        ensure_file(&self.books_path)?;
        let content = read(&self.books_path)?;
        Ok(decode_bytes(&content, codec::decode_book))
    }

    fn load_members(&self) -> Result<Loaded<Member>, PersistenceError> {
        ensure_file(&self.members_path)?;
        let content = read(&self.members_path)?;
        Ok(decode_bytes(&content, codec::decode_member))
    }

    fn save_books<'a, I>(&self, books: I) -> Result<(), PersistenceError>
    where
        I: IntoIterator<Item = &'a Book>,
    {
        rewrite(&self.books_path, books.into_iter().map(codec::encode_book))
    }

    fn save_members<'a, I>(&self, members: I) -> Result<(), PersistenceError>
    where
        I: IntoIterator<Item = &'a Member>,
    {
        rewrite(&self.members_path, members.into_iter().map(codec::encode_member))
    }
}

fn ensure_file(path: &Path) -> Result<(), PersistenceError> {
    if path.exists() {
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PersistenceError::Create {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(drop)
        .map_err(|source| PersistenceError::Create {
            path: path.to_path_buf(),
            source,
        })
}

fn read(path: &Path) -> Result<Vec<u8>, PersistenceError> {
    fs::read(path).map_err(|source| PersistenceError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace `path` with `lines`, one per line.
///
/// The lines go to a temporary file next to the target which is then renamed
/// over it, so readers never observe a half-written store. An existing
/// target keeps its permissions.
fn rewrite<I>(path: &Path, lines: I) -> Result<(), PersistenceError>
where
    I: Iterator<Item = String>,
{
    let write_err = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        let mut count = 0usize;
        for line in lines {
            writeln!(writer, "{}", line).map_err(write_err)?;
            count += 1;
        }
        writer.flush().map_err(write_err)?;
        tracing::debug!(path = %path.display(), records = count, "Rewrote backing store");
    }

    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions()).map_err(write_err)?;
    }

    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookId, MemberId};
    use tempfile::TempDir;

    fn create_test_store() -> (FlatFileStore, TempDir) {
        let temp = TempDir::new().unwrap();
        (FlatFileStore::in_dir(temp.path()), temp)
    }

    #[test]
    fn test_load_creates_missing_files() {
        let (store, _temp) = create_test_store();
        assert!(!store.books_path().exists());

        let books = store.load_books().unwrap();
        let members = store.load_members().unwrap();

        assert!(books.records.is_empty());
        assert!(members.records.is_empty());
        assert!(store.books_path().exists());
        assert!(store.members_path().exists());
    }

    #[test]
    fn test_ensure_files_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let store = FlatFileStore::new(
            temp.path().join("data/books.txt"),
            temp.path().join("data/members.txt"),
        );

        store.ensure_files().unwrap();
        assert!(store.books_path().exists());
        assert!(store.members_path().exists());
    }

    #[test]
    fn test_save_overwrites_whole_file() {
        let (store, _temp) = create_test_store();

        let first = vec![
            Book::new(BookId(101), "Dune", "Herbert", "SciFi"),
            Book::new(BookId(102), "Emma", "Austen", "Classic"),
        ];
        store.save_books(&first).unwrap();

        let second = vec![Book::new(BookId(103), "Ulysses", "Joyce", "Classic")];
        store.save_books(&second).unwrap();

        let content = fs::read_to_string(store.books_path()).unwrap();
        assert_eq!(content, "103,Ulysses,Joyce,Classic,false\n");
    }

    #[test]
    fn test_members_save_and_load() {
        let (store, _temp) = create_test_store();

        let members = vec![
            Member::new(MemberId(201), "Alice", "a@b.com").with_issued_books([BookId(101)]),
            Member::new(MemberId(202), "Bob", "bob@example.com"),
        ];
        store.save_members(&members).unwrap();

        let content = fs::read_to_string(store.members_path()).unwrap();
        assert_eq!(content, "201,Alice,a@b.com,101\n202,Bob,bob@example.com,\n");

        let loaded = store.load_members().unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[0].issued_books, vec![BookId(101)]);
        assert_eq!(loaded.skipped, 0);
    }

    #[test]
    fn test_load_skips_malformed_lines() {
        let (store, _temp) = create_test_store();
        fs::write(
            store.books_path(),
            "101,Dune,Herbert,SciFi,true\n\nnot a book\n102,Emma,Austen,Classic,false\r\n",
        )
        .unwrap();

        let loaded = store.load_books().unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.skipped, 1);
        assert!(loaded.records[0].issued);
        assert_eq!(loaded.records[1].category, "Classic");
    }

    #[cfg(unix)]
    #[test]
    fn test_save_keeps_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (store, _temp) = create_test_store();
        store.ensure_files().unwrap();
        fs::set_permissions(store.books_path(), fs::Permissions::from_mode(0o644)).unwrap();

        store.save_books(&[Book::new(BookId(101), "Dune", "Herbert", "SciFi")]).unwrap();

        let mode = fs::metadata(store.books_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let temp = TempDir::new().unwrap();
        let store = FlatFileStore::new(
            temp.path().join("missing/books.txt"),
            temp.path().join("missing/members.txt"),
        );

        let result = store.save_books(&[Book::new(BookId(101), "Dune", "Herbert", "SciFi")]);
        assert!(matches!(result, Err(PersistenceError::Write { .. })));
    }
}
