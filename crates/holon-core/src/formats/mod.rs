//! # Wire Formats
//!
//! Serialization formats for engine input and output:
//! - `json` — the JSON shape of value trees, type definitions and migration
//!   files, plus read-side rendering of stored objects.
//!
//! The persistent storage row encoding (postcard) lives with the backend in
//! `storage::redb_store`, not here.

pub mod json;

pub use json::{
    object_to_json, parse_migration, run_migration, type_def_from_json, value_tree_from_json,
};
