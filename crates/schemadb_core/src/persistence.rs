//! Snapshot persistence for one database.

use crate::error::CoreResult;
use schemadb_codec::{decode_snapshot, encode_snapshot, Snapshot};
use schemadb_storage::StorageBackend;
use std::sync::Arc;
use tracing::{debug, trace};

/// Reads and writes the snapshot of one database through a storage backend.
#[derive(Clone)]
pub struct Persistence {
    database: String,
    backend: Arc<dyn StorageBackend>,
}

impl Persistence {
    /// Wraps a backend.
    pub fn new(database: impl Into<String>, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            database: database.into(),
            backend,
        }
    }

    /// Loads the stored snapshot, or an empty one if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be read, or a codec
    /// error if the stored bytes are not a valid snapshot.
    pub fn load(&self) -> CoreResult<Snapshot> {
        let Some(bytes) = self.backend.read()? else {
            trace!(database = %self.database, "no stored snapshot");
            return Ok(Snapshot::new());
        };
        if bytes.is_empty() {
            return Ok(Snapshot::new());
        }
        let snapshot = decode_snapshot(&bytes)?;
        debug!(
            database = %self.database,
            bytes = bytes.len(),
            records = snapshot.record_count(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Atomically replaces the stored snapshot. Returns the bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be encoded or written. A failed
    /// save leaves the previously stored snapshot intact.
    pub fn save(&self, snapshot: &Snapshot) -> CoreResult<u64> {
        let bytes = encode_snapshot(snapshot)?;
        self.backend.replace(&bytes)?;
        debug!(
            database = %self.database,
            bytes = bytes.len(),
            location = %self.backend.location(),
            "saved snapshot"
        );
        Ok(bytes.len() as u64)
    }

    /// Name of the database this handle persists.
    pub fn database(&self) -> &str {
        &self.database
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("database", &self.database)
            .field("location", &self.backend.location())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use schemadb_codec::Value;
    use schemadb_storage::{FileBackend, InMemoryBackend};
    use tempfile::tempdir;

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.schemas.insert("User".into(), "name:string".into());
        snapshot
            .records
            .entry("User".into())
            .or_default()
            .insert("Alice".into(), Value::object([("name", Value::from("Alice"))]));
        snapshot
    }

    #[test]
    fn missing_snapshot_loads_empty() {
        let persistence = Persistence::new("db", Arc::new(InMemoryBackend::new()));
        assert!(persistence.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let persistence = Persistence::new("db", Arc::new(InMemoryBackend::new()));
        persistence.save(&sample()).unwrap();
        assert_eq!(persistence.load().unwrap(), sample());
    }

    #[test]
    fn save_then_load_on_disk() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db").join("store.sdb");
        let backend = FileBackend::open_with_create_dirs(&path, true).unwrap();
        let persistence = Persistence::new("db", Arc::new(backend));

        persistence.save(&sample()).unwrap();
        let reopened = Persistence::new("db", Arc::new(FileBackend::open(&path, true)));
        assert_eq!(reopened.load().unwrap(), sample());
    }

    #[test]
    fn failed_save_keeps_previous_snapshot() {
        let backend = Arc::new(InMemoryBackend::new());
        let persistence = Persistence::new("db", backend.clone());
        persistence.save(&Snapshot::new()).unwrap();

        backend.fail_writes(true);
        let err = persistence.save(&sample()).unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert!(persistence.load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_snapshot_is_codec_error() {
        let backend = Arc::new(InMemoryBackend::with_data(b"not a snapshot".to_vec()));
        let persistence = Persistence::new("db", backend);
        assert!(matches!(persistence.load(), Err(CoreError::Codec(_))));
    }
}
