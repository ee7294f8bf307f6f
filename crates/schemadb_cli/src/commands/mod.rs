//! CLI command implementations.

pub mod database;
pub mod inspect;
pub mod records;
pub mod schema;
pub mod verify;
