//! File-based storage backend for persistent snapshots.

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A file-based snapshot backend.
///
/// The snapshot lives in a single file. Replacement uses the
/// write-then-rename pattern:
/// 1. Write to a temporary file next to the target
/// 2. Sync the temporary file to disk
/// 3. Rename it over the target
/// 4. Fsync the directory so the rename itself is durable
///
/// A crash at any point leaves either the old or the new snapshot in place,
/// never a torn file.
///
/// # Example
///
/// ```no_run
/// use schemadb_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open_with_create_dirs(Path::new("dbs/default/store.sdb"), true).unwrap();
/// backend.replace(b"snapshot").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    temp_path: PathBuf,
    sync: bool,
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Creates a backend for the file at `path`.
    ///
    /// The file itself is not created until the first `replace`. With
    /// `sync` set, every replace is fsynced before and after the rename.
    #[must_use]
    pub fn open(path: &Path, sync: bool) -> Self {
        let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        temp_name.push(".tmp");

        Self {
            path: path.to_path_buf(),
            temp_path: path.with_file_name(temp_name),
            sync,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn open_with_create_dirs(path: &Path, sync: bool) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self::open(path, sync))
    }

    /// Returns the path to the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn sync_parent(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_parent(&self) -> io::Result<()> {
        // NTFS journals metadata; directory handles cannot be fsynced.
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn replace(&self, data: &[u8]) -> StorageResult<()> {
        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&self.temp_path)?;
        file.write_all(data)?;
        if self.sync {
            file.sync_all()?;
        }
        drop(file);

        if let Err(e) = fs::rename(&self.temp_path, &self.path) {
            let _ = fs::remove_file(&self.temp_path);
            return Err(e.into());
        }

        if self.sync {
            self.sync_parent()?;
        }

        tracing::trace!(path = %self.path.display(), bytes = data.len(), "snapshot replaced");
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
