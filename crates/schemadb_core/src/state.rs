//! In-memory state of one database.

use crate::index::{IndexReport, PartialKeyIndex};
use crate::schema::SchemaDef;
use schemadb_codec::{RecordMap, Snapshot, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// A stored record and its key.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The record's key.
    pub key: String,
    /// The record's fields, timestamps included.
    pub value: Value,
}

/// Schemas, records and partial-key indexes of one database.
///
/// Every schema has a record map and an index, even when it holds no
/// records. The index of a schema always covers exactly the keys of its
/// record map.
#[derive(Debug, Clone)]
pub struct DatabaseState {
    name: String,
    prefix_len: usize,
    schemas: BTreeMap<String, SchemaDef>,
    records: BTreeMap<String, RecordMap>,
    indexes: BTreeMap<String, PartialKeyIndex>,
    dirty: bool,
    unreadable: bool,
}

impl DatabaseState {
    /// Creates an empty database state.
    pub fn new(name: impl Into<String>, prefix_len: usize) -> Self {
        Self {
            name: name.into(),
            prefix_len,
            schemas: BTreeMap::new(),
            records: BTreeMap::new(),
            indexes: BTreeMap::new(),
            dirty: false,
            unreadable: false,
        }
    }

    /// Restores a database from a snapshot and rebuilds its indexes.
    ///
    /// Stored definitions were accepted when they were created, so they are
    /// re-read leniently. Records under a schema with no stored definition
    /// are kept under an empty definition.
    pub fn from_snapshot(name: impl Into<String>, snapshot: Snapshot, prefix_len: usize) -> Self {
        let mut state = Self::new(name, prefix_len);

        for (schema, definition) in &snapshot.schemas {
            state
                .schemas
                .insert(schema.clone(), SchemaDef::lenient(schema, definition));
        }

        for (schema, records) in snapshot.records {
            if !state.schemas.contains_key(&schema) {
                warn!(schema = %schema, "records stored without a schema definition");
                state
                    .schemas
                    .insert(schema.clone(), SchemaDef::lenient(&schema, ""));
            }
            state.records.insert(schema, records);
        }

        let names: Vec<String> = state.schemas.keys().cloned().collect();
        for schema in names {
            let records = state.records.entry(schema.clone()).or_default();
            let index = PartialKeyIndex::rebuild(prefix_len, records.keys());
            state.indexes.insert(schema, index);
        }
        state
    }

    /// Captures the state as a snapshot.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            records: self.records.clone(),
            schemas: self
                .schemas
                .iter()
                .map(|(name, def)| (name.clone(), def.definition().to_string()))
                .collect(),
        }
    }

    /// Database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if memory holds changes that have not been saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Returns true if this database stands in for a stored snapshot that
    /// could not be read and is still in place. Such a state must not be
    /// saved until it is cleared.
    pub fn is_unreadable(&self) -> bool {
        self.unreadable
    }

    pub(crate) fn mark_unreadable(&mut self) {
        self.unreadable = true;
    }

    /// Inserts or redefines a schema. Existing records are kept as they are.
    pub fn upsert_schema(&mut self, def: SchemaDef) {
        let name = def.name().to_string();
        let prefix_len = self.prefix_len;
        self.records.entry(name.clone()).or_default();
        self.indexes
            .entry(name.clone())
            .or_insert_with(|| PartialKeyIndex::new(prefix_len));
        self.schemas.insert(name, def);
        self.dirty = true;
    }

    /// Looks up a schema.
    pub fn schema(&self, name: &str) -> Option<&SchemaDef> {
        self.schemas.get(name)
    }

    /// Schema names in sorted order.
    pub fn schema_names(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }

    /// Records of a schema, by key.
    pub fn records(&self, schema: &str) -> Option<&RecordMap> {
        self.records.get(schema)
    }

    /// Stores a record under `key`, replacing any previous one.
    ///
    /// Returns the replaced value. The schema must exist.
    pub fn put(&mut self, schema: &str, key: &str, value: Value) -> Option<Value> {
        let prefix_len = self.prefix_len;
        let previous = self
            .records
            .entry(schema.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.indexes
            .entry(schema.to_string())
            .or_insert_with(|| PartialKeyIndex::new(prefix_len))
            .insert(key);
        self.dirty = true;
        previous
    }

    /// Fetches a record by its exact key.
    pub fn get(&self, schema: &str, key: &str) -> Option<&Value> {
        self.records.get(schema).and_then(|records| records.get(key))
    }

    /// Removes a record by its exact key.
    pub fn remove(&mut self, schema: &str, key: &str) -> Option<Value> {
        let removed = self.records.get_mut(schema)?.remove(key)?;
        if let Some(index) = self.indexes.get_mut(schema) {
            index.remove(key);
        }
        self.dirty = true;
        Some(removed)
    }

    /// Full keys of `schema` that start with `partial`, sorted.
    pub fn lookup(&self, schema: &str, partial: &str) -> Vec<String> {
        self.indexes
            .get(schema)
            .map(|index| index.lookup(partial))
            .unwrap_or_default()
    }

    /// The partial-key index of a schema.
    pub fn index(&self, schema: &str) -> Option<&PartialKeyIndex> {
        self.indexes.get(schema)
    }

    /// Drops every schema, record and index.
    ///
    /// A cleared state may overwrite an unreadable snapshot.
    pub fn clear(&mut self) {
        self.schemas.clear();
        self.records.clear();
        self.indexes.clear();
        self.dirty = true;
        self.unreadable = false;
    }

    /// Checks every schema's index against its record map.
    pub fn verify(&self) -> BTreeMap<String, IndexReport> {
        self.schemas
            .keys()
            .map(|schema| {
                let keys = self.records.get(schema).into_iter().flat_map(BTreeMap::keys);
                let report = match self.indexes.get(schema) {
                    Some(index) => index.verify(keys),
                    None => IndexReport {
                        dangling: Vec::new(),
                        missing: keys.cloned().collect(),
                    },
                };
                (schema.clone(), report)
            })
            .collect()
    }

    /// Number of records per schema.
    pub fn record_counts(&self) -> BTreeMap<String, usize> {
        self.schemas
            .keys()
            .map(|schema| {
                let count = self.records.get(schema).map_or(0, BTreeMap::len);
                (schema.clone(), count)
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn index_mut(&mut self, schema: &str) -> Option<&mut PartialKeyIndex> {
        self.indexes.get_mut(schema)
    }
}
