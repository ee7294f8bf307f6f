//! Database commands: use, dbs, wipe.

use schemadb_core::StorageEngine;

/// Runs the use command.
///
/// Selecting a database also saves it, so it exists on disk afterwards.
pub fn use_database(engine: &StorageEngine, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    engine.use_database(name)?;
    engine.flush()?;
    println!("Switched to database '{name}'");
    Ok(())
}

/// Runs the dbs command.
pub fn list(engine: &StorageEngine) -> Result<(), Box<dyn std::error::Error>> {
    let databases = engine.list_databases()?;
    let current = engine.current_database();
    if databases.is_empty() {
        println!("No databases found");
        return Ok(());
    }
    println!("Available databases:");
    for db in databases {
        let marker = if db == current { "*" } else { " " };
        println!("{marker} {db}");
    }
    Ok(())
}

/// Runs the wipe command.
pub fn wipe(engine: &StorageEngine) -> Result<(), Box<dyn std::error::Error>> {
    engine.wipe_database()?;
    println!("Database '{}' wiped", engine.current_database());
    Ok(())
}
