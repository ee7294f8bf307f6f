//! Inspect command implementation.

use schemadb_core::StorageEngine;
use schemadb_storage::{FileBackend, StorageBackend, STORE_FILE};
use serde::Serialize;
use std::path::Path;

/// Database inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Root directory.
    pub root: String,
    /// Selected database.
    pub database: String,
    /// Snapshot file size in bytes.
    pub snapshot_size: u64,
    /// Total records across schemas.
    pub total_records: usize,
    /// Per-schema details.
    pub schemas: Vec<SchemaStats>,
    /// Every database under the root.
    pub databases: Vec<String>,
}

/// Statistics for a single schema.
#[derive(Debug, Serialize)]
pub struct SchemaStats {
    /// Schema name.
    pub name: String,
    /// Definition string.
    pub definition: String,
    /// Number of records.
    pub records: usize,
}

/// Collects inspection data for the selected database.
pub fn inspect(engine: &StorageEngine, root: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let stats = engine.stats();
    let snapshot_path = root.join(&stats.database).join(STORE_FILE);
    let snapshot_size = FileBackend::open(&snapshot_path, false).size()?;

    let mut schemas = Vec::with_capacity(stats.records.len());
    for (name, records) in &stats.records {
        schemas.push(SchemaStats {
            name: name.clone(),
            definition: engine.get_schema(name)?,
            records: *records,
        });
    }

    Ok(InspectResult {
        root: root.display().to_string(),
        database: stats.database.clone(),
        snapshot_size,
        total_records: stats.total_records(),
        schemas,
        databases: engine.list_databases()?,
    })
}

/// Runs the inspect command.
pub fn run(engine: &StorageEngine, root: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(engine, root)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        "text" => print_text_output(&result),
        other => return Err(format!("unknown format '{other}' (expected text or json)").into()),
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("SchemaDB Database Inspection");
    println!("============================");
    println!();
    println!("Root:     {}", result.root);
    println!("Database: {}", result.database);
    println!("Snapshot: {}", format_size(result.snapshot_size));
    println!();
    println!("Schemas:");
    if result.schemas.is_empty() {
        println!("  (none)");
    }
    for schema in &result.schemas {
        println!(
            "  {} ({} records): {}",
            schema.name, schema.records, schema.definition
        );
    }
    println!();
    println!("Total records: {}", result.total_records);
    println!("Databases:     {}", result.databases.join(", "));
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
