//! Shared helpers for the SchemaDB benchmarks.

#![deny(unsafe_code)]

pub mod utils;
