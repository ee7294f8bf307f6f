//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An in-memory snapshot backend.
///
/// Suitable for unit tests, integration tests and ephemeral databases.
/// Writes can be made to fail on demand with [`InMemoryBackend::fail_writes`],
/// which is how tests exercise the "memory ahead of disk" path.
///
/// # Example
///
/// ```rust
/// use schemadb_storage::{InMemoryBackend, StorageBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.fail_writes(true);
/// assert!(backend.replace(b"data").is_err());
/// assert!(backend.read().unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that already holds a snapshot.
    ///
    /// Useful for testing load and corruption paths.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(Some(data)),
            ..Self::default()
        }
    }

    /// Makes every subsequent `replace` fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `replace` calls so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Removes and returns the stored snapshot.
    pub fn take(&self) -> Option<Vec<u8>> {
        self.data.write().take()
    }

    /// Returns a copy of the stored snapshot.
    #[must_use]
    pub fn data(&self) -> Option<Vec<u8>> {
        self.data.read().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.read().clone())
    }

    fn replace(&self, data: &[u8]) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected(
                "in-memory backend configured to fail".to_string(),
            ));
        }
        *self.data.write() = Some(data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().as_ref().map_or(0, |d| d.len() as u64))
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_starts_empty() {
        let backend = InMemoryBackend::new();
        assert!(backend.read().unwrap().is_none());
        assert_eq!(backend.size().unwrap(), 0);
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn memory_replace_overwrites() {
        let backend = InMemoryBackend::new();
        backend.replace(b"first").unwrap();
        backend.replace(b"second!").unwrap();

        assert_eq!(backend.read().unwrap().unwrap(), b"second!");
        assert_eq!(backend.size().unwrap(), 7);
        assert_eq!(backend.write_count(), 2);
    }

    #[test]
    fn memory_with_data() {
        let backend = InMemoryBackend::with_data(b"preloaded".to_vec());
        assert_eq!(backend.data().unwrap(), b"preloaded");
    }

    #[test]
    fn failed_write_keeps_previous_data() {
        let backend = InMemoryBackend::new();
        backend.replace(b"kept").unwrap();

        backend.fail_writes(true);
        let result = backend.replace(b"lost");
        assert!(matches!(result, Err(StorageError::WriteRejected(_))));
        assert_eq!(backend.read().unwrap().unwrap(), b"kept");

        backend.fail_writes(false);
        backend.replace(b"back").unwrap();
        assert_eq!(backend.read().unwrap().unwrap(), b"back");
    }
}
