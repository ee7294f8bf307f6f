//! # SchemaDB Codec
//!
//! Record values and the on-disk snapshot format for SchemaDB.
//!
//! Records are [`Value`] trees. They come in as JSON ([`parse_json`]) and
//! are stored in a deterministic binary form with these canonical rules:
//!
//! - Object keys are sorted length-first, then bytewise
//! - Integers use the shortest encoding
//! - Floats are always 64-bit doubles and never NaN
//! - Strings must be UTF-8
//! - No indefinite-length items
//!
//! A [`Snapshot`] wraps one database's schemas and records in a checksummed
//! file image.
//!
//! ## Usage
//!
//! ```
//! use schemadb_codec::{decode_snapshot, encode_snapshot, parse_json, Snapshot};
//!
//! let alice = parse_json(r#"{"name":"Alice","age":30}"#).unwrap();
//!
//! let mut snapshot = Snapshot::new();
//! snapshot.schemas.insert("User".into(), "name:string age:int".into());
//! snapshot
//!     .records
//!     .entry("User".into())
//!     .or_default()
//!     .insert("Alice".into(), alice);
//!
//! let bytes = encode_snapshot(&snapshot).unwrap();
//! assert_eq!(decode_snapshot(&bytes).unwrap(), snapshot);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod checksum;
mod decoder;
mod encoder;
mod error;
mod json;
mod snapshot;
mod value;

pub use checksum::crc32;
pub use decoder::{from_cbor, CanonicalDecoder, MAX_DEPTH};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use json::parse_json;
pub use snapshot::{
    decode_snapshot, encode_snapshot, RecordMap, Snapshot, MAX_RECORD_DEPTH, SCHEMAS_KEY,
    SNAPSHOT_MAGIC, SNAPSHOT_VERSION,
};
pub use value::{Object, Value};
