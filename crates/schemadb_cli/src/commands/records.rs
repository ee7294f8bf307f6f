//! Record commands: add, get, delete, list.

use schemadb_core::{Record, StorageEngine};

/// Renders a record as one line of compact JSON.
pub fn render(record: &Record) -> String {
    record.value.to_json_string()
}

/// Runs the add command.
pub fn add(engine: &StorageEngine, schema: &str, json: &str) -> Result<(), Box<dyn std::error::Error>> {
    let key = engine.add_record(schema, json)?;
    println!("Record added with key '{key}'");
    Ok(())
}

/// Runs the get command.
pub fn get(engine: &StorageEngine, schema: &str, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let record = engine.get_record(schema, key)?;
    println!("{}", render(&record));
    Ok(())
}

/// Runs the delete command.
pub fn delete(engine: &StorageEngine, schema: &str, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    engine.delete_record(schema, key)?;
    println!("Record deleted successfully");
    Ok(())
}

/// Runs the list command.
pub fn list(engine: &StorageEngine, schema: &str) -> Result<(), Box<dyn std::error::Error>> {
    let records = engine.list_records(schema)?;
    if records.is_empty() {
        println!("No records in schema '{schema}'");
    }
    for record in &records {
        println!("{}", render(record));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemadb_core::{Config, CoreError};

    fn engine() -> StorageEngine {
        let engine = StorageEngine::open_in_memory(Config::default()).unwrap();
        engine.create_schema("User", "name:string age:int").unwrap();
        engine
    }

    #[test]
    fn render_is_compact_json() {
        let engine = engine();
        engine.add_record("User", r#"{ "name": "Alice", "age": 30 }"#).unwrap();
        let line = render(&engine.get_record("User", "Alice").unwrap());

        assert!(!line.contains('\n'));
        assert!(line.starts_with(r#"{"age":30,"#));
        assert!(line.contains(r#""name":"Alice""#));
    }

    #[test]
    fn commands_report_errors() {
        let engine = engine();
        assert!(add(&engine, "User", r#"{"name":"Alice","age":30}"#).is_ok());
        assert!(get(&engine, "User", "Ali").is_ok());
        assert!(list(&engine, "User").is_ok());

        let err = get(&engine, "User", "Bob").unwrap_err();
        assert!(err.downcast_ref::<CoreError>().is_some_and(CoreError::is_not_found));
        assert!(delete(&engine, "User", "Ali").is_err());
        assert!(delete(&engine, "User", "Alice").is_ok());
        assert!(add(&engine, "Ghost", "{}").is_err());
    }
}
