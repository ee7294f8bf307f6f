//! # SchemaDB Testkit
//!
//! Test utilities for SchemaDB.
//!
//! This crate provides:
//! - Engine fixtures backed by temporary directories or memory
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use schemadb_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_engine() {
//!     with_temp_engine(|engine| {
//!         engine.create_schema("User", "name:string").unwrap();
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
