//! Error types for SchemaDB core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// A record field did not match its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}' expected {expected}, got {actual}")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: String,
    /// Declared type of the field.
    pub expected: String,
    /// Type of the value found in the record.
    pub actual: String,
}

/// Errors that can occur in SchemaDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Schema does not exist in the current database.
    #[error("schema not found: {name}")]
    SchemaNotFound {
        /// Name of the schema.
        name: String,
    },

    /// No record matches the requested key.
    #[error("record not found: {key} in schema {schema}")]
    RecordNotFound {
        /// Schema searched.
        schema: String,
        /// Key or partial key that was requested.
        key: String,
    },

    /// Caller supplied malformed input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the problem.
        message: String,
    },

    /// Record does not conform to its schema.
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// A partial key matched more than one record.
    #[error("ambiguous key '{partial}' in schema {schema}: matches {}", candidates.join(", "))]
    AmbiguousKey {
        /// Schema searched.
        schema: String,
        /// Partial key that was requested.
        partial: String,
        /// Matching full keys, sorted.
        candidates: Vec<String>,
    },

    /// No usable key could be derived from a record.
    #[error("could not derive a key from record: {record}")]
    KeyExtractionFailed {
        /// The record as submitted.
        record: String,
    },

    /// The stored snapshot of a database could not be read or moved aside,
    /// so saving over it is refused until the database is wiped.
    #[error("database {database} has an unreadable snapshot; wipe it to start over")]
    DatabaseUnreadable {
        /// Database name.
        database: String,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] schemadb_storage::StorageError),

    /// Snapshot codec error.
    #[error("codec error: {0}")]
    Codec(#[from] schemadb_codec::CodecError),
}

impl CoreError {
    /// Creates a schema not found error.
    pub fn schema_not_found(name: impl Into<String>) -> Self {
        Self::SchemaNotFound { name: name.into() }
    }

    /// Creates a record not found error.
    pub fn record_not_found(schema: impl Into<String>, key: impl Into<String>) -> Self {
        Self::RecordNotFound {
            schema: schema.into(),
            key: key.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Returns true for the schema and record not found errors.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SchemaNotFound { .. } | Self::RecordNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemadb_storage::StorageError;

    #[test]
    fn not_found_grouping() {
        assert!(CoreError::schema_not_found("User").is_not_found());
        assert!(CoreError::record_not_found("User", "Ali").is_not_found());
        assert!(!CoreError::invalid_input("bad").is_not_found());
        assert!(!CoreError::AmbiguousKey {
            schema: "User".into(),
            partial: "Ali".into(),
            candidates: vec!["Alice".into(), "Alicia".into()],
        }
        .is_not_found());
    }

    #[test]
    fn messages_are_single_line() {
        let err = CoreError::AmbiguousKey {
            schema: "User".into(),
            partial: "Ali".into(),
            candidates: vec!["Alice".into(), "Alicia".into()],
        };
        assert_eq!(
            err.to_string(),
            "ambiguous key 'Ali' in schema User: matches Alice, Alicia"
        );

        let err = CoreError::from(ValidationError {
            field: "age".into(),
            expected: "integer".into(),
            actual: "string".into(),
        });
        assert_eq!(
            err.to_string(),
            "validation failed: field 'age' expected integer, got string"
        );
    }

    #[test]
    fn storage_errors_convert() {
        let err: CoreError = StorageError::WriteRejected("disk full".into()).into();
        assert!(matches!(err, CoreError::Storage(_)));
    }
}
