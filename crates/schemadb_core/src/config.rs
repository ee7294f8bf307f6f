//! Engine configuration.

use crate::schema::{SchemaParsePolicy, UnknownTypePolicy};
use std::path::PathBuf;

/// Configuration for opening a storage engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one subdirectory per database.
    pub root: PathBuf,

    /// Database selected when the engine opens.
    pub default_database: String,

    /// Number of leading characters used as the partial-key index prefix.
    pub partial_key_len: usize,

    /// How malformed `field:type` tokens in a schema definition are handled.
    pub schema_parse_policy: SchemaParsePolicy,

    /// How fields declared with an unrecognised type are validated.
    pub unknown_type_policy: UnknownTypePolicy,

    /// Whether to fsync snapshot files on every save (safer but slower).
    pub sync_on_save: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./dbs"),
            default_database: "default".to_string(),
            partial_key_len: 5,
            schema_parse_policy: SchemaParsePolicy::default(),
            unknown_type_policy: UnknownTypePolicy::default(),
            sync_on_save: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root directory.
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Sets the database selected on open.
    #[must_use]
    pub fn default_database(mut self, name: impl Into<String>) -> Self {
        self.default_database = name.into();
        self
    }

    /// Sets the partial-key prefix length. Zero is treated as one.
    #[must_use]
    pub fn partial_key_len(mut self, len: usize) -> Self {
        self.partial_key_len = len.max(1);
        self
    }

    /// Sets the schema parse policy.
    #[must_use]
    pub const fn schema_parse_policy(mut self, policy: SchemaParsePolicy) -> Self {
        self.schema_parse_policy = policy;
        self
    }

    /// Sets the unknown type policy.
    #[must_use]
    pub const fn unknown_type_policy(mut self, policy: UnknownTypePolicy) -> Self {
        self.unknown_type_policy = policy;
        self
    }

    /// Sets whether to fsync on every save.
    #[must_use]
    pub const fn sync_on_save(mut self, value: bool) -> Self {
        self.sync_on_save = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.root, PathBuf::from("./dbs"));
        assert_eq!(config.default_database, "default");
        assert_eq!(config.partial_key_len, 5);
        assert_eq!(config.schema_parse_policy, SchemaParsePolicy::SkipMalformed);
        assert_eq!(config.unknown_type_policy, UnknownTypePolicy::Accept);
        assert!(config.sync_on_save);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .root("/tmp/schemadb")
            .default_database("inventory")
            .partial_key_len(3)
            .schema_parse_policy(SchemaParsePolicy::Reject)
            .unknown_type_policy(UnknownTypePolicy::Reject)
            .sync_on_save(false);

        assert_eq!(config.root, PathBuf::from("/tmp/schemadb"));
        assert_eq!(config.default_database, "inventory");
        assert_eq!(config.partial_key_len, 3);
        assert_eq!(config.schema_parse_policy, SchemaParsePolicy::Reject);
        assert_eq!(config.unknown_type_policy, UnknownTypePolicy::Reject);
        assert!(!config.sync_on_save);
    }

    #[test]
    fn zero_prefix_length_clamped() {
        assert_eq!(Config::new().partial_key_len(0).partial_key_len, 1);
    }
}
