//! Storage backend trait definition.

use crate::error::StorageResult;

/// A snapshot store for a single SchemaDB database.
///
/// Backends are **opaque byte stores** holding one snapshot. SchemaDB owns
/// the snapshot format; a backend only knows how to hand the bytes back and
/// how to swap them for new ones.
///
/// # Invariants
///
/// - `read` returns `None` until the first successful `replace`
/// - `replace` is all-or-nothing: after a failed call, `read` still returns
///   the previous contents
/// - Backends must be `Send + Sync` so an engine can be shared across threads
pub trait StorageBackend: Send + Sync {
    /// Reads the whole stored snapshot.
    ///
    /// Returns `Ok(None)` if nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    fn read(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Atomically replaces the stored snapshot with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. The previous snapshot is left
    /// untouched in that case.
    fn replace(&self, data: &[u8]) -> StorageResult<()>;

    /// Returns the size of the stored snapshot in bytes (0 if absent).
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Human-readable location of the snapshot, used in logs.
    fn location(&self) -> String;
}
