//! # SchemaDB Core
//!
//! The in-memory engine behind SchemaDB, a schema-validated record store.
//!
//! This crate provides:
//! - Schema definitions and record validation
//! - Key derivation for records
//! - The partial-key index used for abbreviated lookups
//! - Per-database state and its snapshot persistence
//! - The [`StorageEngine`] that ties them together
//!
//! ## Usage
//!
//! ```
//! use schemadb_core::{Config, CoreError, StorageEngine};
//!
//! let engine = StorageEngine::open_in_memory(Config::default()).unwrap();
//! engine.create_schema("User", "name:string age:int").unwrap();
//!
//! engine.add_record("User", r#"{"name":"Alice","age":30}"#).unwrap();
//! engine.add_record("User", r#"{"name":"Alicia","age":28}"#).unwrap();
//!
//! assert_eq!(engine.get_record("User", "Alice").unwrap().key, "Alice");
//! assert!(matches!(
//!     engine.get_record("User", "Ali"),
//!     Err(CoreError::AmbiguousKey { .. })
//! ));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod index;
mod key;
mod persistence;
mod schema;
mod state;
mod stats;

pub use config::Config;
pub use engine::{StorageEngine, CREATED_AT, UPDATED_AT};
pub use error::{CoreError, CoreResult, ValidationError};
pub use index::{IndexReport, PartialKeyIndex};
pub use key::extract_key;
pub use persistence::Persistence;
pub use schema::{FieldDef, FieldType, SchemaDef, SchemaParsePolicy, UnknownTypePolicy};
pub use state::{DatabaseState, Record};
pub use stats::{DatabaseStats, EngineStats, StatsSnapshot};

// Re-export the value type records are made of.
pub use schemadb_codec::Value;

/// Crate version, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
