//! Record key derivation.

use crate::error::{CoreError, CoreResult};
use schemadb_codec::Object;

/// Fields consulted for a key, in priority order.
const KEY_FIELDS: [&str; 3] = ["id", "name", "key"];

/// Derives the key of a record as submitted.
///
/// The key is the value of `id`, else `name`, else `key`. Failing those, it
/// is the first text value in field-name order, then the first field name.
/// A record with no fields is keyed by its trimmed input text. Non-text
/// values are rendered the way [`Value`](schemadb_codec::Value) displays them.
///
/// # Errors
///
/// Returns [`CoreError::KeyExtractionFailed`] if the derived key is empty.
pub fn extract_key(record: &Object, raw: &str) -> CoreResult<String> {
    let key = KEY_FIELDS
        .iter()
        .find_map(|field| record.get(*field))
        .map(ToString::to_string)
        .or_else(|| {
            record
                .values()
                .find_map(|value| value.as_text())
                .map(str::to_string)
        })
        .or_else(|| record.keys().next().cloned())
        .unwrap_or_else(|| raw.trim().to_string());

    if key.is_empty() {
        return Err(CoreError::KeyExtractionFailed {
            record: raw.trim().to_string(),
        });
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemadb_codec::parse_json;

    fn key_of(json: &str) -> CoreResult<String> {
        let value = parse_json(json).unwrap();
        extract_key(value.as_object().unwrap(), json)
    }

    #[test]
    fn id_wins() {
        assert_eq!(key_of(r#"{"name":"Alice","id":"u-1"}"#).unwrap(), "u-1");
    }

    #[test]
    fn name_before_key() {
        assert_eq!(key_of(r#"{"key":"k","name":"Alice"}"#).unwrap(), "Alice");
        assert_eq!(key_of(r#"{"key":"k","other":"x"}"#).unwrap(), "k");
    }

    #[test]
    fn non_text_key_fields_rendered() {
        assert_eq!(key_of(r#"{"id":42}"#).unwrap(), "42");
        assert_eq!(key_of(r#"{"id":7.0}"#).unwrap(), "7");
        assert_eq!(key_of(r#"{"id":true}"#).unwrap(), "true");
        assert_eq!(key_of(r#"{"id":null}"#).unwrap(), "null");
        assert_eq!(key_of(r#"{"id":[1,2]}"#).unwrap(), "[1,2]");
    }

    #[test]
    fn first_text_value_in_field_order() {
        assert_eq!(
            key_of(r#"{"zeta":"last","count":3,"beta":"first"}"#).unwrap(),
            "first"
        );
    }

    #[test]
    fn first_field_name_when_no_text() {
        assert_eq!(key_of(r#"{"qty":3,"flag":true}"#).unwrap(), "flag");
    }

    #[test]
    fn empty_record_uses_raw_input() {
        assert_eq!(key_of("  {}  ").unwrap(), "{}");
    }

    #[test]
    fn empty_key_fails() {
        let err = key_of(r#"{"id":""}"#).unwrap_err();
        assert!(matches!(err, CoreError::KeyExtractionFailed { .. }));
    }
}
