//! Test fixtures and engine helpers.
//!
//! Provides convenience functions for setting up test engines
//! and common test scenarios.

use schemadb_core::{Config, StorageEngine};
use schemadb_storage::MemoryRoot;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A test engine with automatic cleanup.
pub struct TestEngine {
    /// The engine instance.
    pub engine: StorageEngine,
    /// Memory root, when the engine is not on disk.
    pub memory: Option<Arc<MemoryRoot>>,
    temp_dir: Option<TempDir>,
}

impl TestEngine {
    /// Creates an engine over an in-memory root.
    pub fn memory() -> Self {
        Self::memory_with(Config::default())
    }

    /// Creates an engine over an in-memory root with the given config.
    pub fn memory_with(config: Config) -> Self {
        let root = Arc::new(MemoryRoot::new());
        let engine = StorageEngine::with_root(config, root.clone())
            .expect("Failed to open in-memory engine");
        Self {
            engine,
            memory: Some(root),
            temp_dir: None,
        }
    }

    /// Creates an engine rooted in a fresh temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = Config::new().root(temp_dir.path()).sync_on_save(false);
        let engine = StorageEngine::open(config).expect("Failed to open file engine");
        Self {
            engine,
            memory: None,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the root directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Drops the engine and opens a new one on the same directory.
    ///
    /// # Panics
    ///
    /// Panics if the engine is in-memory.
    pub fn reopen(self) -> Self {
        let Self {
            engine, temp_dir, ..
        } = self;
        let temp_dir = temp_dir.expect("Only file engines can be reopened");
        let config = engine.config().clone();
        drop(engine);
        let engine = StorageEngine::open(config).expect("Failed to reopen engine");
        Self {
            engine,
            memory: None,
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestEngine {
    type Target = StorageEngine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

/// Runs a test with a temporary in-memory engine.
///
/// # Example
///
/// ```rust,ignore
/// use schemadb_testkit::with_temp_engine;
///
/// #[test]
/// fn my_test() {
///     with_temp_engine(|engine| {
///         assert!(engine.list_schemas().is_empty());
///     });
/// }
/// ```
pub fn with_temp_engine<F, R>(f: F) -> R
where
    F: FnOnce(&StorageEngine) -> R,
{
    let test = TestEngine::memory();
    f(&test)
}

/// Runs a test with a temporary file-based engine.
pub fn with_file_engine<F, R>(f: F) -> R
where
    F: FnOnce(&StorageEngine) -> R,
{
    let test = TestEngine::file();
    f(&test)
}

/// Creates the `User` schema and a few users whose keys share prefixes.
pub fn seed_users(engine: &StorageEngine) {
    engine
        .create_schema("User", "name:string age:int email:string")
        .expect("Failed to create schema");
    for (name, age) in [("Alice", 30), ("Alicia", 28), ("Bob", 25), ("Carol", 41)] {
        engine
            .add_record("User", &format!(r#"{{"name":"{name}","age":{age}}}"#))
            .expect("Failed to add record");
    }
}
