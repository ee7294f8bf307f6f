//! Schema command: list, view or define schemas.

use schemadb_core::StorageEngine;

/// Runs the schema command.
///
/// With no name, lists schemas. With a name only, shows its definition.
/// With a name and fields, defines the schema.
pub fn run(
    engine: &StorageEngine,
    name: Option<&str>,
    fields: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    match name {
        None => {
            let schemas = engine.list_schemas();
            if schemas.is_empty() {
                println!("No schemas defined");
            } else {
                println!("Defined schemas:");
                for schema in schemas {
                    println!("  {schema}");
                }
            }
        }
        Some(name) if fields.is_empty() => {
            let definition = engine.get_schema(name)?;
            println!("Schema '{name}': {definition}");
        }
        Some(name) => {
            engine.create_schema(name, &fields.join(" "))?;
            println!("Schema '{name}' created successfully");
        }
    }
    Ok(())
}
