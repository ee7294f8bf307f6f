//! Storage roots: the mapping from database names to backends.
//!
//! On disk a root is a directory with one subdirectory per database:
//!
//! ```text
//! <root>/
//! ├─ LOCK               # Advisory lock, held while an engine is open
//! ├─ default/
//! │  └─ store.sdb       # Snapshot of database "default"
//! └─ inventory/
//!    └─ store.sdb
//! ```
//!
//! Database enumeration is a directory listing of the root. A snapshot that
//! cannot be read is renamed to `store.sdb.corrupt` (then `.corrupt.1`, ...)
//! before its database is written again.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::file::FileBackend;
use crate::memory::InMemoryBackend;
use fs2::FileExt;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Snapshot file name inside each database directory.
pub const STORE_FILE: &str = "store.sdb";

const LOCK_FILE: &str = "LOCK";

/// Resolves database names to snapshot backends.
pub trait StorageRoot: Send + Sync {
    /// Returns the backend holding the snapshot of `database`.
    ///
    /// Opening a database that has never been saved is not an error; the
    /// returned backend simply reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or the location cannot be
    /// prepared.
    fn open(&self, database: &str) -> StorageResult<Arc<dyn StorageBackend>>;

    /// Lists the databases known to this root, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be enumerated.
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Moves the stored snapshot of `database` aside, so a fresh one can be
    /// written without destroying it.
    ///
    /// Returns where the old snapshot went, or `None` if nothing was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or the snapshot cannot be
    /// moved. The snapshot is left in place on error.
    fn quarantine(&self, database: &str) -> StorageResult<Option<String>>;
}

/// Checks that `name` can be used as a database name.
///
/// Names become directory names, so they must be non-empty, must not contain
/// path separators and must not start with a dot.
///
/// # Errors
///
/// Returns [`StorageError::InvalidName`] describing the problem.
pub fn validate_database_name(name: &str) -> StorageResult<()> {
    if name.is_empty() {
        return Err(StorageError::invalid_name(name, "name is empty"));
    }
    if name.starts_with('.') {
        return Err(StorageError::invalid_name(name, "name starts with '.'"));
    }
    if name.contains(['/', '\\']) || name.contains('\0') {
        return Err(StorageError::invalid_name(
            name,
            "name contains a path separator",
        ));
    }
    Ok(())
}

/// A storage root backed by a directory on disk.
///
/// Holds an exclusive advisory lock on `<root>/LOCK` for as long as it lives,
/// so two engines never write the same files.
#[derive(Debug)]
pub struct DirectoryRoot {
    path: PathBuf,
    sync: bool,
    _lock_file: File,
}

impl DirectoryRoot {
    /// Opens (creating if needed) the root directory and takes its lock.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another root holds the lock, or an
    /// I/O error if the directory cannot be created.
    pub fn open(path: &Path, sync: bool) -> StorageResult<Self> {
        fs::create_dir_all(path)?;

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: lock_path.display().to_string(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            sync,
            _lock_file: lock_file,
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the snapshot path for `database`.
    #[must_use]
    pub fn store_path(&self, database: &str) -> PathBuf {
        self.path.join(database).join(STORE_FILE)
    }
}

impl StorageRoot for DirectoryRoot {
    fn open(&self, database: &str) -> StorageResult<Arc<dyn StorageBackend>> {
        validate_database_name(database)?;
        let backend = FileBackend::open_with_create_dirs(&self.store_path(database), self.sync)?;
        Ok(Arc::new(backend))
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn quarantine(&self, database: &str) -> StorageResult<Option<String>> {
        validate_database_name(database)?;
        let store = self.store_path(database);
        if !store.exists() {
            return Ok(None);
        }

        let mut target = store.with_file_name(format!("{STORE_FILE}.corrupt"));
        let mut attempt = 1;
        while target.exists() {
            target = store.with_file_name(format!("{STORE_FILE}.corrupt.{attempt}"));
            attempt += 1;
        }
        fs::rename(&store, &target)?;

        warn!(
            database = %database,
            moved_to = %target.display(),
            "moved unreadable snapshot aside"
        );
        Ok(Some(target.display().to_string()))
    }
}

/// A storage root that keeps every database in memory.
///
/// Backends are created on first open and then shared, so a database that is
/// switched away from and back again sees its last saved snapshot.
#[derive(Debug, Default)]
pub struct MemoryRoot {
    backends: RwLock<BTreeMap<String, Arc<InMemoryBackend>>>,
    quarantined: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryRoot {
    /// Creates an empty in-memory root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the backend for `database`, creating it if needed.
    ///
    /// Tests use this to inspect saved bytes or inject write failures.
    pub fn backend(&self, database: &str) -> Arc<InMemoryBackend> {
        if let Some(backend) = self.backends.read().get(database) {
            return Arc::clone(backend);
        }
        Arc::clone(
            self.backends
                .write()
                .entry(database.to_string())
                .or_default(),
        )
    }

    /// Returns the last snapshot of `database` that was moved aside.
    #[must_use]
    pub fn quarantined(&self, database: &str) -> Option<Vec<u8>> {
        self.quarantined.read().get(database).cloned()
    }
}

impl StorageRoot for MemoryRoot {
    fn open(&self, database: &str) -> StorageResult<Arc<dyn StorageBackend>> {
        validate_database_name(database)?;
        Ok(self.backend(database))
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        Ok(self.backends.read().keys().cloned().collect())
    }

    fn quarantine(&self, database: &str) -> StorageResult<Option<String>> {
        validate_database_name(database)?;
        let Some(bytes) = self.backend(database).take() else {
            return Ok(None);
        };
        self.quarantined.write().insert(database.to_string(), bytes);
        Ok(Some(format!("memory:{database}.corrupt")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn name_validation() {
        assert!(validate_database_name("default").is_ok());
        assert!(validate_database_name("my_db-2").is_ok());

        assert!(validate_database_name("").is_err());
        assert!(validate_database_name(".").is_err());
        assert!(validate_database_name("..").is_err());
        assert!(validate_database_name(".hidden").is_err());
        assert!(validate_database_name("a/b").is_err());
        assert!(validate_database_name("a\\b").is_err());
    }

    #[test]
    fn directory_root_layout() {
        let temp = tempdir().unwrap();
        let root = DirectoryRoot::open(temp.path(), false).unwrap();

        let backend = StorageRoot::open(&root, "users").unwrap();
        backend.replace(b"snapshot").unwrap();

        assert!(temp.path().join("LOCK").is_file());
        assert!(temp.path().join("users").join(STORE_FILE).is_file());
        assert_eq!(root.store_path("users"), temp.path().join("users/store.sdb"));
    }

    #[test]
    fn directory_root_lists_databases() {
        let temp = tempdir().unwrap();
        let root = DirectoryRoot::open(temp.path(), false).unwrap();

        StorageRoot::open(&root, "zeta").unwrap();
        StorageRoot::open(&root, "alpha").unwrap();
        fs::create_dir(temp.path().join(".cache")).unwrap();

        // Opening creates the directory, so both show up before any save.
        assert_eq!(root.list().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn directory_root_rejects_bad_names() {
        let temp = tempdir().unwrap();
        let root = DirectoryRoot::open(temp.path(), false).unwrap();

        let result = StorageRoot::open(&root, "../escape");
        assert!(matches!(result, Err(StorageError::InvalidName { .. })));
    }

    #[test]
    fn lock_prevents_second_root() {
        let temp = tempdir().unwrap();
        let _first = DirectoryRoot::open(temp.path(), false).unwrap();

        let second = DirectoryRoot::open(temp.path(), false);
        assert!(matches!(second, Err(StorageError::Locked { .. })));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        {
            let _root = DirectoryRoot::open(temp.path(), false).unwrap();
        }
        let _again = DirectoryRoot::open(temp.path(), false).unwrap();
    }

    #[test]
    fn memory_root_shares_backends() {
        let root = MemoryRoot::new();

        StorageRoot::open(&root, "a").unwrap().replace(b"one").unwrap();
        let reopened = StorageRoot::open(&root, "a").unwrap();

        assert_eq!(reopened.read().unwrap().unwrap(), b"one");
        assert_eq!(root.backend("a").write_count(), 1);
        assert_eq!(root.list().unwrap(), vec!["a"]);
    }

    #[test]
    fn directory_quarantine_keeps_bytes() {
        let temp = tempdir().unwrap();
        let root = DirectoryRoot::open(temp.path(), false).unwrap();
        assert_eq!(root.quarantine("broken").unwrap(), None);

        let backend = StorageRoot::open(&root, "broken").unwrap();
        backend.replace(b"first").unwrap();
        let moved = root.quarantine("broken").unwrap().unwrap();
        assert!(moved.ends_with("store.sdb.corrupt"));
        assert!(backend.read().unwrap().is_none());

        backend.replace(b"second").unwrap();
        root.quarantine("broken").unwrap();

        let dir = temp.path().join("broken");
        assert_eq!(fs::read(dir.join("store.sdb.corrupt")).unwrap(), b"first");
        assert_eq!(fs::read(dir.join("store.sdb.corrupt.1")).unwrap(), b"second");
        assert_eq!(root.list().unwrap(), vec!["broken"]);
    }

    #[test]
    fn memory_quarantine_keeps_bytes() {
        let root = MemoryRoot::new();
        root.backend("broken").replace(b"garbage").unwrap();

        assert!(root.quarantine("broken").unwrap().is_some());
        assert_eq!(root.quarantined("broken").as_deref(), Some(&b"garbage"[..]));
        assert!(root.backend("broken").data().is_none());
        assert_eq!(root.quarantine("broken").unwrap(), None);
    }
}
