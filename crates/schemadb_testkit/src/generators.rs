//! Property-based test generators using proptest.
//!
//! Provides strategies for generating keys, schema definitions and records
//! that conform to them.

use proptest::prelude::*;
use schemadb_codec::{Object, Snapshot, Value};
use schemadb_core::FieldType;

/// Strategy for generating record keys.
///
/// The alphabet is small so generated keys share prefixes often, and
/// includes multi-byte characters.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[abñ日][abcñé日]{0,7}").expect("Invalid regex")
}

/// Strategy for generating partial keys to look up.
pub fn partial_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[abñ日][abcñé日]{0,5}").expect("Invalid regex")
}

/// Strategy for generating valid schema names.
pub fn schema_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-zA-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating one of the built-in field types.
pub fn field_type_strategy() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        Just(FieldType::String),
        Just(FieldType::Integer),
        Just(FieldType::Float),
        Just(FieldType::Boolean),
        Just(FieldType::Object),
    ]
}

/// Strategy for generating a field list with distinct names.
pub fn fields_strategy() -> impl Strategy<Value = Vec<(String, FieldType)>> {
    prop::collection::btree_map("[a-z]{1,8}", field_type_strategy(), 0..6)
        .prop_map(|fields| fields.into_iter().collect())
}

/// Renders fields as a definition string such as `name:string age:int`.
pub fn definition_of(fields: &[(String, FieldType)]) -> String {
    fields
        .iter()
        .map(|(name, field_type)| format!("{name}:{field_type}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strategy for generating scalar values of any type.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::Text),
    ]
}

/// Strategy for generating nested values.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4).prop_map(Value::Object),
        ]
    })
}

/// Strategy for a value the given type accepts.
pub fn conforming_value(field_type: &FieldType) -> BoxedStrategy<Value> {
    match field_type {
        FieldType::String => "[a-zA-Z0-9]{0,12}".prop_map(Value::Text).boxed(),
        FieldType::Integer => any::<i64>().prop_map(Value::Integer).boxed(),
        FieldType::Float => (-1.0e9f64..1.0e9).prop_map(Value::Float).boxed(),
        FieldType::Boolean => any::<bool>().prop_map(Value::Bool).boxed(),
        FieldType::Object | FieldType::Unknown(_) => value_strategy().boxed(),
    }
}

/// Strategy for a value the given type rejects, if one exists.
pub fn nonconforming_value(field_type: &FieldType) -> Option<BoxedStrategy<Value>> {
    let strategy = match field_type {
        FieldType::String => any::<i64>().prop_map(Value::Integer).boxed(),
        FieldType::Integer | FieldType::Float => "[a-z]{1,8}".prop_map(Value::Text).boxed(),
        FieldType::Boolean => any::<i64>().prop_map(Value::Integer).boxed(),
        FieldType::Object | FieldType::Unknown(_) => return None,
    };
    Some(strategy)
}

/// Strategy for a record whose declared fields all conform to `fields`.
///
/// Each declared field is present or absent at random.
pub fn conforming_record(fields: &[(String, FieldType)]) -> impl Strategy<Value = Object> {
    let per_field: Vec<_> = fields
        .iter()
        .map(|(name, field_type)| {
            let name = name.clone();
            prop::option::of(conforming_value(field_type))
                .prop_map(move |value| value.map(|v| (name.clone(), v)))
        })
        .collect();
    per_field.prop_map(|entries| entries.into_iter().flatten().collect())
}

/// Strategy for a whole snapshot of schemas and records.
pub fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    prop::collection::btree_map(
        schema_name_strategy(),
        (
            fields_strategy(),
            prop::collection::btree_map(key_strategy(), value_strategy(), 0..6),
        ),
        0..4,
    )
    .prop_map(|schemas| {
        let mut snapshot = Snapshot::new();
        for (name, (fields, records)) in schemas {
            snapshot.schemas.insert(name.clone(), definition_of(&fields));
            snapshot.records.insert(name, records);
        }
        snapshot
    })
}

/// A mutation applied to a set of keys.
#[derive(Debug, Clone)]
pub enum KeyOperation {
    /// Insert a key
    Insert(String),
    /// Remove a key
    Remove(String),
}

/// Strategy for generating key operations.
pub fn key_operation_strategy() -> impl Strategy<Value = KeyOperation> {
    prop_oneof![
        3 => key_strategy().prop_map(KeyOperation::Insert),
        1 => key_strategy().prop_map(KeyOperation::Remove),
    ]
}

/// Strategy for generating a sequence of key operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<KeyOperation>> {
    prop::collection::vec(key_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemadb_core::{SchemaDef, SchemaParsePolicy};

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn keys_are_non_empty(key in key_strategy()) {
            prop_assert!(!key.is_empty());
        }

        #[test]
        fn definitions_parse_back(fields in fields_strategy()) {
            let def = SchemaDef::parse("T", &definition_of(&fields), SchemaParsePolicy::Reject).unwrap();
            prop_assert_eq!(def.fields().len(), fields.len());
            for ((name, field_type), parsed) in fields.iter().zip(def.fields()) {
                prop_assert_eq!(name, &parsed.name);
                prop_assert_eq!(field_type, &parsed.field_type);
            }
        }
    }
}
