//! Schema definitions and record validation.
//!
//! A schema is declared as whitespace-separated `field:type` tokens:
//!
//! ```text
//! name:string age:int score:float admin:bool extra:json
//! ```
//!
//! Records may omit declared fields and may carry undeclared ones; only
//! fields that are both declared and present are type-checked.

use crate::error::{CoreError, CoreResult, ValidationError};
use schemadb_codec::{Object, Value};
use std::fmt;

/// How malformed tokens in a schema definition are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaParsePolicy {
    /// Malformed tokens are dropped.
    #[default]
    SkipMalformed,
    /// The first malformed token fails the definition.
    Reject,
}

/// How fields declared with an unrecognised type name are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTypePolicy {
    /// Any value is accepted.
    #[default]
    Accept,
    /// Every value fails validation.
    Reject,
}

/// Declared type of a schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// `string`
    String,
    /// `int` or `integer`
    Integer,
    /// `float` or `double`
    Float,
    /// `bool` or `boolean`
    Boolean,
    /// `object` or `json`; accepts any value.
    Object,
    /// Any other type name.
    Unknown(String),
}

impl FieldType {
    /// Resolves a type name from a schema definition.
    pub fn parse(name: &str) -> Self {
        match name {
            "string" => Self::String,
            "int" | "integer" => Self::Integer,
            "float" | "double" => Self::Float,
            "bool" | "boolean" => Self::Boolean,
            "object" | "json" => Self::Object,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Checks a value against this type.
    pub fn accepts(&self, value: &Value, unknown: UnknownTypePolicy) -> bool {
        match (self, value) {
            (Self::String, Value::Text(_))
            | (Self::Integer, Value::Integer(_))
            | (Self::Float, Value::Integer(_) | Value::Float(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Object, _) => true,
            (Self::Integer, Value::Float(x)) => x.is_finite() && x.fract() == 0.0,
            (Self::Unknown(_), _) => unknown == UnknownTypePolicy::Accept,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::Boolean => f.write_str("boolean"),
            Self::Object => f.write_str("object"),
            Self::Unknown(name) => f.write_str(name),
        }
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Declared type.
    pub field_type: FieldType,
}

/// A parsed schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDef {
    name: String,
    definition: String,
    fields: Vec<FieldDef>,
}

impl SchemaDef {
    /// Parses a definition string.
    ///
    /// A token is malformed unless it holds exactly one `:` with a non-empty
    /// name and type. A field declared twice keeps its first position and
    /// takes the last declared type.
    ///
    /// # Errors
    ///
    /// Under [`SchemaParsePolicy::Reject`], returns
    /// [`CoreError::InvalidInput`] naming the first malformed token.
    pub fn parse(name: &str, definition: &str, policy: SchemaParsePolicy) -> CoreResult<Self> {
        if policy == SchemaParsePolicy::Reject {
            if let Some(token) = definition
                .split_whitespace()
                .find(|token| split_token(token).is_none())
            {
                return Err(CoreError::invalid_input(format!(
                    "malformed field declaration '{token}' in schema {name}"
                )));
            }
        }
        Ok(Self::lenient(name, definition))
    }

    /// Parses a definition string, skipping malformed tokens.
    ///
    /// Same as [`parse`](Self::parse) under
    /// [`SchemaParsePolicy::SkipMalformed`], which cannot fail.
    #[must_use]
    pub fn lenient(name: &str, definition: &str) -> Self {
        let mut fields: Vec<FieldDef> = Vec::new();

        for (field, type_name) in definition.split_whitespace().filter_map(split_token) {
            let field_type = FieldType::parse(type_name);
            match fields.iter_mut().find(|f| f.name == field) {
                Some(existing) => existing.field_type = field_type,
                None => fields.push(FieldDef {
                    name: field.to_string(),
                    field_type,
                }),
            }
        }

        Self {
            name: name.to_string(),
            definition: definition.split_whitespace().collect::<Vec<_>>().join(" "),
            fields,
        }
    }

    /// Schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The definition string, with whitespace normalised to single spaces.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Looks up a declared field.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validates a record's fields against this schema.
    ///
    /// Fields are checked in declaration order and the first mismatch is
    /// reported. Declared fields missing from the record are accepted.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for the first mismatched field.
    pub fn validate(&self, record: &Object, unknown: UnknownTypePolicy) -> Result<(), ValidationError> {
        for field in &self.fields {
            let Some(value) = record.get(&field.name) else {
                continue;
            };
            if !field.field_type.accepts(value, unknown) {
                return Err(ValidationError {
                    field: field.name.clone(),
                    expected: field.field_type.to_string(),
                    actual: value.type_name().to_string(),
                });
            }
        }
        Ok(())
    }
}

fn split_token(token: &str) -> Option<(&str, &str)> {
    let (name, type_name) = token.split_once(':')?;
    if name.is_empty() || type_name.is_empty() || type_name.contains(':') {
        return None;
    }
    Some((name, type_name))
}
