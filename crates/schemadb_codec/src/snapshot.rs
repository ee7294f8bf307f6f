//! The snapshot file format.
//!
//! A snapshot holds the complete state of one database. On disk it is laid
//! out as:
//!
//! ```text
//! ┌──────────┬─────────┬─────────────┬──────────────────┬─────────┐
//! │ "SDBS"   │ version │ payload len │ canonical payload│ CRC32   │
//! │ 4 bytes  │ u16 BE  │ u32 BE      │ len bytes        │ u32 BE  │
//! └──────────┴─────────┴─────────────┴──────────────────┴─────────┘
//! ```
//!
//! The payload is one object mapping each schema name to the object of its
//! records (key to value). Schema definitions ride along under the reserved
//! key [`SCHEMAS_KEY`], mapping schema name to definition string. The
//! checksum covers every byte before it.

use crate::checksum::crc32;
use crate::decoder::{from_cbor, MAX_DEPTH};
use crate::encoder::to_canonical_cbor;
use crate::error::{CodecError, CodecResult};
use crate::value::{Object, Value};
use std::collections::BTreeMap;

/// Reserved top-level key holding schema definitions.
pub const SCHEMAS_KEY: &str = "__schemas__";

/// Magic bytes at the start of every snapshot file.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"SDBS";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Deepest record a snapshot can hold. The payload wraps every record in
/// two objects: the top-level map and the schema's record map.
pub const MAX_RECORD_DEPTH: usize = MAX_DEPTH - 2;

const HEADER_LEN: usize = 4 + 2 + 4;
const CHECKSUM_LEN: usize = 4;

/// Records of one schema, by key.
pub type RecordMap = BTreeMap<String, Value>;

/// The serializable state of one database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Records by schema name, then by key.
    pub records: BTreeMap<String, RecordMap>,
    /// Schema definition strings by schema name.
    pub schemas: BTreeMap<String, String>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the snapshot holds no schemas and no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.records.values().all(BTreeMap::is_empty)
    }

    /// Total number of records across all schemas.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    fn to_payload(&self) -> CodecResult<Value> {
        let mut top = Object::new();
        for (schema, records) in &self.records {
            if schema == SCHEMAS_KEY {
                return Err(CodecError::invalid_structure(format!(
                    "schema name {SCHEMAS_KEY} is reserved"
                )));
            }
            top.insert(schema.clone(), Value::Object(records.clone()));
        }
        let schemas: Object = self
            .schemas
            .iter()
            .map(|(name, def)| (name.clone(), Value::Text(def.clone())))
            .collect();
        top.insert(SCHEMAS_KEY.to_string(), Value::Object(schemas));
        Ok(Value::Object(top))
    }

    fn from_payload(payload: Value) -> CodecResult<Self> {
        let Value::Object(top) = payload else {
            return Err(CodecError::invalid_structure("snapshot payload is not an object"));
        };

        let mut snapshot = Snapshot::new();
        for (name, entry) in top {
            let Value::Object(fields) = entry else {
                return Err(CodecError::invalid_structure(format!(
                    "snapshot entry {name} is not an object"
                )));
            };
            if name == SCHEMAS_KEY {
                for (schema, def) in fields {
                    let Value::Text(def) = def else {
                        return Err(CodecError::invalid_structure(format!(
                            "definition of schema {schema} is not text"
                        )));
                    };
                    snapshot.schemas.insert(schema, def);
                }
            } else {
                snapshot.records.insert(name, fields);
            }
        }
        Ok(snapshot)
    }
}

/// Encodes a snapshot into its file form.
///
/// Equal snapshots always produce identical bytes.
///
/// # Errors
///
/// Returns an error if a record contains a NaN, if a schema uses the
/// reserved name, or if the payload is larger than the format allows.
pub fn encode_snapshot(snapshot: &Snapshot) -> CodecResult<Vec<u8>> {
    let payload = to_canonical_cbor(&snapshot.to_payload()?)?;
    let payload_len = u32::try_from(payload.len()).map_err(|_| CodecError::SizeLimitExceeded {
        claimed: payload.len() as u64,
        max_allowed: u64::from(u32::MAX),
    })?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    out.extend_from_slice(SNAPSHOT_MAGIC);
    out.extend_from_slice(&SNAPSHOT_VERSION.to_be_bytes());
    out.extend_from_slice(&payload_len.to_be_bytes());
    out.extend_from_slice(&payload);
    let checksum = crc32(&out);
    out.extend_from_slice(&checksum.to_be_bytes());
    Ok(out)
}

/// Decodes a snapshot from its file form.
///
/// # Errors
///
/// Returns an error on a bad magic, an unsupported version, truncation,
/// a checksum mismatch, or a malformed payload.
pub fn decode_snapshot(bytes: &[u8]) -> CodecResult<Snapshot> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(CodecError::UnexpectedEof);
    }
    if &bytes[0..4] != SNAPSHOT_MAGIC {
        return Err(CodecError::invalid_header("bad magic"));
    }

    let version = u16::from_be_bytes([bytes[4], bytes[5]]);
    if version != SNAPSHOT_VERSION {
        return Err(CodecError::invalid_header(format!(
            "unsupported version {version}"
        )));
    }

    let payload_len = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
    let body_len = HEADER_LEN
        .checked_add(payload_len)
        .ok_or(CodecError::UnexpectedEof)?;
    match bytes.len().cmp(&(body_len + CHECKSUM_LEN)) {
        std::cmp::Ordering::Less => return Err(CodecError::UnexpectedEof),
        std::cmp::Ordering::Greater => {
            return Err(CodecError::invalid_structure("trailing bytes after checksum"))
        }
        std::cmp::Ordering::Equal => {}
    }

    let stored = u32::from_be_bytes([
        bytes[body_len],
        bytes[body_len + 1],
        bytes[body_len + 2],
        bytes[body_len + 3],
    ]);
    let actual = crc32(&bytes[..body_len]);
    if stored != actual {
        return Err(CodecError::ChecksumMismatch {
            expected: stored,
            actual,
        });
    }

    Snapshot::from_payload(from_cbor(&bytes[HEADER_LEN..body_len])?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot
            .schemas
            .insert("User".into(), "name:string age:int".into());
        snapshot.schemas.insert("Empty".into(), String::new());

        let mut users = RecordMap::new();
        users.insert(
            "Alice".into(),
            Value::object([("name", Value::from("Alice")), ("age", Value::Integer(30))]),
        );
        users.insert(
            "Bob".into(),
            Value::object([("name", Value::from("Bob")), ("age", Value::Float(25.0))]),
        );
        snapshot.records.insert("User".into(), users);
        snapshot.records.insert("Empty".into(), RecordMap::new());
        snapshot
    }

    #[test]
    fn round_trip() {
        let snapshot = sample();
        let bytes = encode_snapshot(&snapshot).unwrap();
        assert_eq!(decode_snapshot(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn empty_round_trip() {
        let bytes = encode_snapshot(&Snapshot::new()).unwrap();
        let decoded = decode_snapshot(&bytes).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded, Snapshot::new());
    }

    #[test]
    fn header_layout() {
        let bytes = encode_snapshot(&Snapshot::new()).unwrap();
        assert_eq!(&bytes[0..4], b"SDBS");
        assert_eq!(&bytes[4..6], &[0, 1]);
        let len = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
        assert_eq!(bytes.len(), HEADER_LEN + len + CHECKSUM_LEN);
    }

    #[test]
    fn deterministic_bytes() {
        assert_eq!(
            encode_snapshot(&sample()).unwrap(),
            encode_snapshot(&sample()).unwrap()
        );
    }

    #[test]
    fn counts() {
        let snapshot = sample();
        assert_eq!(snapshot.record_count(), 2);
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn reserved_schema_name_rejected() {
        let mut snapshot = Snapshot::new();
        snapshot
            .records
            .insert(SCHEMAS_KEY.to_string(), RecordMap::new());
        assert!(matches!(
            encode_snapshot(&snapshot),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn corrupted_payload_detected() {
        let mut bytes = encode_snapshot(&sample()).unwrap();
        bytes[HEADER_LEN + 3] ^= 0x01;
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(CodecError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = encode_snapshot(&sample()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(CodecError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn unsupported_version_rejected() {
        let mut bytes = encode_snapshot(&sample()).unwrap();
        bytes[5] = 9;
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(CodecError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn truncation_rejected() {
        let bytes = encode_snapshot(&sample()).unwrap();
        assert_eq!(
            decode_snapshot(&bytes[..bytes.len() - 1]),
            Err(CodecError::UnexpectedEof)
        );
        assert_eq!(decode_snapshot(&bytes[..3]), Err(CodecError::UnexpectedEof));
    }

    fn record_of_depth(depth: usize) -> Value {
        let inner = (1..depth).fold(Value::Integer(1), |inner, _| Value::Array(vec![inner]));
        Value::object([("v", inner)])
    }

    #[test]
    fn deepest_record_survives() {
        let mut snapshot = Snapshot::new();
        snapshot.schemas.insert("Doc".into(), String::new());
        let record = record_of_depth(MAX_RECORD_DEPTH);
        assert_eq!(record.depth(), MAX_RECORD_DEPTH);
        snapshot
            .records
            .entry("Doc".into())
            .or_default()
            .insert("deep".into(), record);

        let bytes = encode_snapshot(&snapshot).unwrap();
        assert_eq!(decode_snapshot(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn too_deep_record_is_not_written() {
        let mut snapshot = Snapshot::new();
        snapshot
            .records
            .entry("Doc".into())
            .or_default()
            .insert("deep".into(), record_of_depth(MAX_RECORD_DEPTH + 1));

        assert!(matches!(
            encode_snapshot(&snapshot),
            Err(CodecError::TooDeep { .. })
        ));
    }
}
