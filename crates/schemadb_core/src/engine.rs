//! The storage engine.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::index::IndexReport;
use crate::key::extract_key;
use crate::persistence::Persistence;
use crate::schema::SchemaDef;
use crate::state::{DatabaseState, Record};
use crate::stats::{DatabaseStats, EngineStats};
use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;
use schemadb_codec::{parse_json, Value, MAX_RECORD_DEPTH, SCHEMAS_KEY};
use schemadb_storage::{validate_database_name, DirectoryRoot, MemoryRoot, StorageRoot};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Field stamped with the time a record was first added.
pub const CREATED_AT: &str = "created_at";

/// Field stamped with the time a record was last added or replaced.
pub const UPDATED_AT: &str = "updated_at";

/// Everything guarded by the engine lock.
struct EngineState {
    /// The current database.
    active: DatabaseState,
    /// Databases switched away from whose last save failed.
    parked: HashMap<String, DatabaseState>,
    /// Open persistence handles by database name.
    handles: HashMap<String, Persistence>,
}

/// The main SchemaDB handle.
///
/// A `StorageEngine` owns one current database at a time. Every mutation
/// validates its input, updates memory and then saves the whole current
/// database before returning.
///
/// # Opening an Engine
///
/// ```rust,no_run
/// use schemadb_core::{Config, StorageEngine};
///
/// let engine = StorageEngine::open(Config::new().root("./dbs"))?;
///
/// engine.create_schema("User", "name:string age:int")?;
/// let key = engine.add_record("User", r#"{"name":"Alice","age":30}"#)?;
/// assert_eq!(key, "Alice");
///
/// let alice = engine.get_record("User", "Ali")?;
/// assert_eq!(alice.key, "Alice");
/// # Ok::<(), schemadb_core::CoreError>(())
/// ```
///
/// # Failure Semantics
///
/// A save that fails after memory was updated is reported to the caller but
/// not undone: memory stays ahead of disk until the next successful save.
///
/// # Thread Safety
///
/// All state sits behind one read-write lock. Lookups share it; mutations
/// hold it exclusively, including the save.
pub struct StorageEngine {
    config: Config,
    root: Arc<dyn StorageRoot>,
    state: RwLock<EngineState>,
    stats: EngineStats,
}

impl StorageEngine {
    /// Opens an engine over the directory named by `config.root`.
    ///
    /// The directory is created if missing and locked for the lifetime of
    /// the engine. The default database is loaded.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the root is locked by another engine or
    /// cannot be created, and a codec error if the default database's
    /// snapshot is corrupt.
    pub fn open(config: Config) -> CoreResult<Self> {
        let root = DirectoryRoot::open(&config.root, config.sync_on_save)?;
        info!(root = %config.root.display(), "opened storage root");
        Self::with_root(config, Arc::new(root))
    }

    /// Opens an engine whose databases live only in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured default database name is invalid.
    pub fn open_in_memory(config: Config) -> CoreResult<Self> {
        Self::with_root(config, Arc::new(MemoryRoot::new()))
    }

    /// Opens an engine over any storage root.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] for an invalid default database
    /// name, or the error from opening or loading that database.
    pub fn with_root(config: Config, root: Arc<dyn StorageRoot>) -> CoreResult<Self> {
        let name = config.default_database.clone();
        validate_database_name(&name).map_err(|e| CoreError::invalid_input(e.to_string()))?;

        let persistence = Persistence::new(&name, root.open(&name)?);
        let active = DatabaseState::from_snapshot(&name, persistence.load()?, config.partial_key_len);
        debug!(database = %name, schemas = active.schema_names().len(), "loaded default database");

        let mut handles = HashMap::new();
        handles.insert(name, persistence);

        Ok(Self {
            config,
            root,
            state: RwLock::new(EngineState {
                active,
                parked: HashMap::new(),
                handles,
            }),
            stats: EngineStats::new(),
        })
    }

    /// Returns engine configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ========================================================================
    // Schemas
    // ========================================================================

    /// Defines a schema in the current database, replacing any previous
    /// definition of the same name.
    ///
    /// Existing records are not revalidated against a new definition.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] for an empty or reserved name, or a
    /// malformed definition under [`SchemaParsePolicy::Reject`]. A failed
    /// save is returned as is and the schema stays defined in memory.
    ///
    /// [`SchemaParsePolicy::Reject`]: crate::SchemaParsePolicy::Reject
    pub fn create_schema(&self, name: &str, fields: &str) -> CoreResult<()> {
        if name.trim().is_empty() {
            return Err(CoreError::invalid_input("schema name is empty"));
        }
        if name == SCHEMAS_KEY {
            return Err(CoreError::invalid_input(format!(
                "schema name {SCHEMAS_KEY} is reserved"
            )));
        }
        let def = SchemaDef::parse(name, fields, self.config.schema_parse_policy)?;

        let mut guard = self.state.write();
        guard.active.upsert_schema(def);
        debug!(schema = %name, fields = %fields, "defined schema");
        self.flush_locked(&mut guard)
    }

    /// Returns the definition string of a schema.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaNotFound`] if the schema does not exist.
    pub fn get_schema(&self, name: &str) -> CoreResult<String> {
        let guard = self.state.read();
        guard
            .active
            .schema(name)
            .map(|def| def.definition().to_string())
            .ok_or_else(|| CoreError::schema_not_found(name))
    }

    /// Returns the parsed definition of a schema.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaNotFound`] if the schema does not exist.
    pub fn schema_def(&self, name: &str) -> CoreResult<SchemaDef> {
        let guard = self.state.read();
        guard
            .active
            .schema(name)
            .cloned()
            .ok_or_else(|| CoreError::schema_not_found(name))
    }

    /// Lists schema names of the current database, sorted.
    pub fn list_schemas(&self) -> Vec<String> {
        self.state.read().active.schema_names()
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Adds a record from JSON text and returns its key.
    ///
    /// The key is derived from the record as submitted (see
    /// [`extract_key`](crate::extract_key)). The record is stamped with
    /// [`CREATED_AT`] and [`UPDATED_AT`], then validated. A record whose key
    /// already exists replaces the old one and keeps its creation time.
    ///
    /// # Errors
    ///
    /// - [`CoreError::SchemaNotFound`] if the schema does not exist
    /// - [`CoreError::InvalidInput`] if the text is not a JSON object, or
    ///   nests arrays and objects too deeply to be saved
    /// - [`CoreError::KeyExtractionFailed`] if the derived key is empty
    /// - [`CoreError::ValidationFailed`] if a field has the wrong type
    /// - a storage or codec error if the save fails; the record stays in memory
    pub fn add_record(&self, schema: &str, json: &str) -> CoreResult<String> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let def = state
            .active
            .schema(schema)
            .ok_or_else(|| CoreError::schema_not_found(schema))?;

        let parsed = parse_json(json).map_err(|e| CoreError::invalid_input(e.to_string()))?;
        let kind = parsed.type_name();
        let depth = parsed.depth();
        let Value::Object(mut fields) = parsed else {
            return Err(CoreError::invalid_input(format!(
                "record must be a JSON object, got {kind}"
            )));
        };
        if depth > MAX_RECORD_DEPTH {
            return Err(CoreError::invalid_input(format!(
                "record nests {depth} levels deep, at most {MAX_RECORD_DEPTH} are allowed"
            )));
        }

        let key = extract_key(&fields, json)?;

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let created = state
            .active
            .get(schema, &key)
            .and_then(|existing| existing.get(CREATED_AT))
            .cloned()
            .unwrap_or_else(|| Value::Text(now.clone()));
        fields.insert(CREATED_AT.to_string(), created);
        fields.insert(UPDATED_AT.to_string(), Value::Text(now));

        def.validate(&fields, self.config.unknown_type_policy)?;

        let replaced = state
            .active
            .put(schema, &key, Value::Object(fields))
            .is_some();
        self.stats.record_write();
        debug!(schema = %schema, key = %key, replaced, "stored record");

        self.flush_locked(state)?;
        Ok(key)
    }

    /// Fetches a record by exact or partial key.
    ///
    /// An exact key match always wins. Otherwise the key is treated as a
    /// prefix: one match returns that record, several fail with the sorted
    /// candidates.
    ///
    /// # Errors
    ///
    /// - [`CoreError::SchemaNotFound`] if the schema does not exist
    /// - [`CoreError::RecordNotFound`] if nothing matches
    /// - [`CoreError::AmbiguousKey`] if several keys match
    pub fn get_record(&self, schema: &str, key: &str) -> CoreResult<Record> {
        let guard = self.state.read();
        let db = &guard.active;
        self.stats.record_read();

        if db.schema(schema).is_none() {
            return Err(CoreError::schema_not_found(schema));
        }
        if let Some(value) = db.get(schema, key) {
            return Ok(Record {
                key: key.to_string(),
                value: value.clone(),
            });
        }

        self.stats.record_partial_lookup();
        let mut candidates = db.lookup(schema, key);
        match candidates.len() {
            0 => Err(CoreError::record_not_found(schema, key)),
            1 => {
                let full = candidates.remove(0);
                let value = db
                    .get(schema, &full)
                    .cloned()
                    .ok_or_else(|| CoreError::record_not_found(schema, key))?;
                debug!(schema = %schema, partial = %key, key = %full, "resolved partial key");
                Ok(Record { key: full, value })
            }
            _ => Err(CoreError::AmbiguousKey {
                schema: schema.to_string(),
                partial: key.to_string(),
                candidates,
            }),
        }
    }

    /// Deletes a record by its exact key. Partial keys are never resolved.
    ///
    /// # Errors
    ///
    /// Returns a not found error for an unknown schema or key. A failed save
    /// is returned as is and the record stays deleted in memory.
    pub fn delete_record(&self, schema: &str, key: &str) -> CoreResult<()> {
        let mut guard = self.state.write();

        if guard.active.schema(schema).is_none() {
            return Err(CoreError::schema_not_found(schema));
        }
        if guard.active.remove(schema, key).is_none() {
            return Err(CoreError::record_not_found(schema, key));
        }
        self.stats.record_delete();
        debug!(schema = %schema, key = %key, "deleted record");

        self.flush_locked(&mut guard)
    }

    /// Lists all records of a schema, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaNotFound`] if the schema does not exist.
    pub fn list_records(&self, schema: &str) -> CoreResult<Vec<Record>> {
        let guard = self.state.read();
        if guard.active.schema(schema).is_none() {
            return Err(CoreError::schema_not_found(schema));
        }
        Ok(guard
            .active
            .records(schema)
            .into_iter()
            .flatten()
            .map(|(key, value)| Record {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    // ========================================================================
    // Databases
    // ========================================================================

    /// Switches the current database.
    ///
    /// The current database is saved first, even when `name` is already
    /// current. If that save fails, its state is kept in memory and reused
    /// when switching back, so no write is lost. The incoming database is
    /// loaded from disk, or starts empty if it has never been saved or cannot
    /// be read. An unreadable snapshot is moved aside first; if that fails
    /// too, saves of the database are refused until it is wiped. Neither
    /// failure fails the switch; both are logged.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] only if `name` is not a valid
    /// database name.
    pub fn use_database(&self, name: &str) -> CoreResult<()> {
        validate_database_name(name).map_err(|e| CoreError::invalid_input(e.to_string()))?;

        let mut guard = self.state.write();
        let outgoing_name = guard.active.name().to_string();
        if outgoing_name == name {
            if let Err(err) = self.flush_locked(&mut guard) {
                warn!(database = %name, error = %err, "could not save current database");
            }
            return Ok(());
        }

        let flushed = self.flush_locked(&mut guard);

        let state = &mut *guard;
        let incoming = match state.parked.remove(name) {
            Some(parked) => {
                debug!(database = %name, "reusing unsaved database state");
                parked
            }
            None => self.load_database(&mut state.handles, name),
        };
        let outgoing = std::mem::replace(&mut state.active, incoming);

        match flushed {
            Ok(()) => {
                state.handles.remove(&outgoing_name);
            }
            Err(err) => {
                warn!(
                    database = %outgoing_name,
                    error = %err,
                    "could not save database before switching; keeping it in memory"
                );
                state.parked.insert(outgoing_name.clone(), outgoing);
            }
        }

        self.stats.record_switch();
        info!(from = %outgoing_name, to = %name, "switched database");
        Ok(())
    }

    /// Returns the name of the current database.
    pub fn current_database(&self) -> String {
        self.state.read().active.name().to_string()
    }

    /// Lists known databases, sorted.
    ///
    /// This includes the current database and any database holding unsaved
    /// changes, even if nothing of them is on disk yet.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the root cannot be enumerated.
    pub fn list_databases(&self) -> CoreResult<Vec<String>> {
        let mut names = self.root.list()?;
        let guard = self.state.read();
        names.push(guard.active.name().to_string());
        names.extend(guard.parked.keys().cloned());
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Removes every schema and record from the current database and saves
    /// the empty state.
    ///
    /// # Errors
    ///
    /// Returns the save error, if any. Memory stays wiped either way.
    pub fn wipe_database(&self) -> CoreResult<()> {
        let mut guard = self.state.write();
        guard.active.clear();
        info!(database = %guard.active.name(), "wiped database");
        self.flush_locked(&mut guard)
    }

    /// Saves the current database.
    ///
    /// Mutations save on their own; this retries after a failed save.
    ///
    /// # Errors
    ///
    /// Returns the save error, if any.
    pub fn flush(&self) -> CoreResult<()> {
        let mut guard = self.state.write();
        self.flush_locked(&mut guard)
    }

    /// Returns true if the current database has changes that are not saved.
    pub fn is_dirty(&self) -> bool {
        self.state.read().active.is_dirty()
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Checks every schema's partial-key index against its records.
    pub fn verify_index(&self) -> BTreeMap<String, IndexReport> {
        self.state.read().active.verify()
    }

    /// Returns record counts for the current database and engine counters.
    pub fn stats(&self) -> DatabaseStats {
        let guard = self.state.read();
        DatabaseStats {
            database: guard.active.name().to_string(),
            records: guard.active.record_counts(),
            dirty: guard.active.is_dirty(),
            operations: self.stats.snapshot(),
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn persistence(
        &self,
        handles: &mut HashMap<String, Persistence>,
        database: &str,
    ) -> CoreResult<Persistence> {
        if let Some(handle) = handles.get(database) {
            return Ok(handle.clone());
        }
        let handle = Persistence::new(database, self.root.open(database)?);
        handles.insert(database.to_string(), handle.clone());
        Ok(handle)
    }

    fn load_database(
        &self,
        handles: &mut HashMap<String, Persistence>,
        database: &str,
    ) -> DatabaseState {
        let prefix_len = self.config.partial_key_len;
        let err = match self.persistence(handles, database).and_then(|p| p.load()) {
            Ok(snapshot) => return DatabaseState::from_snapshot(database, snapshot, prefix_len),
            Err(err) => err,
        };

        let mut state = DatabaseState::new(database, prefix_len);
        match self.root.quarantine(database) {
            Ok(moved_to) => warn!(
                database = %database,
                error = %err,
                moved_to = moved_to.as_deref().unwrap_or("-"),
                "could not load database; starting empty"
            ),
            Err(move_err) => {
                warn!(
                    database = %database,
                    error = %err,
                    move_error = %move_err,
                    "could not load database or move it aside; refusing saves until wiped"
                );
                state.mark_unreadable();
            }
        }
        state
    }

    fn flush_locked(&self, state: &mut EngineState) -> CoreResult<()> {
        let name = state.active.name().to_string();
        if state.active.is_unreadable() {
            if !state.active.is_dirty() {
                return Ok(());
            }
            self.stats.record_flush_failure();
            return Err(CoreError::DatabaseUnreadable { database: name });
        }
        let snapshot = state.active.to_snapshot();
        let result = self
            .persistence(&mut state.handles, &name)
            .and_then(|p| p.save(&snapshot));

        match result {
            Ok(bytes) => {
                state.active.set_dirty(false);
                self.stats.record_flush(bytes);
                Ok(())
            }
            Err(err) => {
                state.active.set_dirty(true);
                self.stats.record_flush_failure();
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("config", &self.config)
            .field("current", &self.current_database())
            .finish_non_exhaustive()
    }
}
