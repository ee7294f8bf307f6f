//! Verify command implementation.

use schemadb_codec::decode_snapshot;
use schemadb_core::StorageEngine;
use schemadb_storage::{FileBackend, StorageBackend, STORE_FILE};
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of snapshot files checked.
    pub snapshots_checked: usize,
    /// Number of schemas whose index was checked.
    pub schemas_checked: usize,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks every snapshot under the root and the indexes of the selected
/// database.
pub fn verify(engine: &StorageEngine, root: &Path) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let mut result = VerifyResult::default();

    for database in engine.list_databases()? {
        let path = root.join(&database).join(STORE_FILE);
        if !path.exists() {
            continue;
        }
        result.snapshots_checked += 1;
        match FileBackend::open(&path, false).read() {
            Ok(Some(bytes)) => {
                if let Err(err) = decode_snapshot(&bytes) {
                    result.errors.push(format!("{database}: {err}"));
                }
            }
            Ok(None) => {}
            Err(err) => result.errors.push(format!("{database}: {err}")),
        }
    }

    let current = engine.current_database();
    for (schema, report) in engine.verify_index() {
        result.schemas_checked += 1;
        for key in &report.dangling {
            result
                .errors
                .push(format!("{current}/{schema}: index holds unknown key '{key}'"));
        }
        for key in &report.missing {
            result
                .errors
                .push(format!("{current}/{schema}: key '{key}' missing from index"));
        }
    }

    Ok(result)
}

/// Runs the verify command.
pub fn run(engine: &StorageEngine, root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying databases at {}", root.display());
    println!();

    let result = verify(engine, root)?;
    println!("Snapshots checked: {}", result.snapshots_checked);
    println!("Schemas checked:   {}", result.schemas_checked);
    for error in &result.errors {
        println!("  - {error}");
    }

    println!();
    if result.is_ok() {
        println!("✓ Database verification passed");
        Ok(())
    } else {
        println!("✗ Database verification failed");
        Err("verification failed".into())
    }
}
