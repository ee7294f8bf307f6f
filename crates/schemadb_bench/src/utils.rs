//! Benchmark utilities.

use rand::distributions::Alphanumeric;
use rand::Rng;
use schemadb_codec::{Snapshot, Value};

/// Generate a random alphanumeric key of the given length.
pub fn random_key(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate distinct keys that share a handful of leading characters,
/// so partial lookups hit crowded buckets.
pub fn generate_keys(count: usize) -> Vec<String> {
    let stems = ["Ali", "Bob", "Car", "Dan"];
    let mut keys: Vec<String> = (0..count)
        .map(|i| format!("{}{}{}", stems[i % stems.len()], random_key(6), i))
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

/// Build a user record as JSON text.
pub fn user_json(name: &str) -> String {
    let age: i64 = rand::thread_rng().gen_range(18..90);
    format!(r#"{{"name":"{name}","age":{age},"email":"{name}@example.com","active":true}}"#)
}

/// Build a snapshot with one `User` schema holding `count` records.
pub fn user_snapshot(count: usize) -> Snapshot {
    let mut rng = rand::thread_rng();
    let mut snapshot = Snapshot::new();
    snapshot
        .schemas
        .insert("User".into(), "name:string age:int email:string active:bool".into());
    let records = snapshot.records.entry("User".into()).or_default();
    for key in generate_keys(count) {
        let value = Value::object([
            ("name", Value::from(key.as_str())),
            ("age", Value::Integer(rng.gen_range(18..90))),
            ("email", Value::from(format!("{key}@example.com"))),
            ("active", Value::Bool(rng.gen())),
        ]);
        records.insert(key, value);
    }
    snapshot
}
