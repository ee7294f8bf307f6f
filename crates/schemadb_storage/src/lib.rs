//! # SchemaDB Storage
//!
//! Storage backends and database roots for SchemaDB.
//!
//! This crate is the lowest layer of SchemaDB. A backend holds exactly one
//! snapshot file for one logical database and treats its contents as
//! **opaque bytes**: it can read the whole file back and replace it
//! atomically, nothing more. The snapshot format itself lives in
//! `schemadb_codec`.
//!
//! A [`StorageRoot`] maps database names to backends and enumerates the
//! databases that exist under it.
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - one file on disk, replaced with write-then-rename
//! - [`InMemoryBackend`] - for testing, with write fault injection
//!
//! ## Available Roots
//!
//! - [`DirectoryRoot`] - `<root>/<database>/store.sdb`, guarded by a lock file
//! - [`MemoryRoot`] - in-memory backends keyed by database name
//!
//! ## Example
//!
//! ```rust
//! use schemadb_storage::{InMemoryBackend, StorageBackend};
//!
//! let backend = InMemoryBackend::new();
//! assert!(backend.read().unwrap().is_none());
//!
//! backend.replace(b"snapshot").unwrap();
//! assert_eq!(backend.read().unwrap().as_deref(), Some(&b"snapshot"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
mod root;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
pub use root::{validate_database_name, DirectoryRoot, MemoryRoot, StorageRoot, STORE_FILE};
