//! # Error Types
//!
//! The error taxonomy for the Holon engine.
//!
//! Every error is fatal to the enclosing top-level `unify()` call: it
//! propagates up, triggers transaction rollback, and surfaces to the caller
//! with the offending definition name / type / id(s) attached. The engine
//! performs no automatic retries; retry policy is the caller's.

use crate::model::{ObjectId, Uri};
use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HolonError>;

/// Errors that can occur in the Holon engine and its storage backends.
///
/// - No silent failures
/// - No `unwrap()`/`expect()` in non-test code; all errors are propagated
#[derive(Debug, Error)]
pub enum HolonError {
    /// Candidate elimination (or a unique-lookup storage operation) left
    /// more than one match. The engine never guesses.
    #[error("ambiguous match for type \"{type_uri}\": {} candidates {candidates:?}", candidates.len())]
    Ambiguity {
        type_uri: Uri,
        candidates: Vec<ObjectId>,
    },

    /// A type declares identity attributes but the update supplies none of
    /// them. Partial presence is sufficient; only total absence fails.
    #[error("no identity child supplied for type \"{type_uri}\"")]
    Identity { type_uri: Uri },

    /// Cardinality "many" is not supported at this position (identity
    /// attributes, candidate seeding).
    #[error("cardinality \"many\" not supported for definition \"{def}\"")]
    UnsupportedCardinality { def: Uri },

    /// URI collision on create. URIs are globally unique across nodes and
    /// edges.
    #[error("URI \"{uri}\" is already taken")]
    DuplicateUri { uri: Uri },

    /// A declared type does not match the expected one.
    #[error("type mismatch: expected \"{expected}\", got \"{actual}\"")]
    TypeMismatch { expected: Uri, actual: Uri },

    /// An internal invariant was violated, e.g. a resolved value missing an
    /// id, or an update model missing a type.
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// The requested object (node or edge) was not found.
    #[error("object {0:?} not found")]
    ObjectNotFound(ObjectId),

    /// No object carries the given URI.
    #[error("no object with URI \"{0}\"")]
    UriNotFound(Uri),

    /// The type registry has no definition for the given type URI.
    #[error("unknown type \"{0}\"")]
    UnknownType(Uri),

    /// Invalid persisted schema or type-definition input, e.g. an unknown
    /// association-definition kind tag.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed wire input (JSON value trees, migration files).
    #[error("format error: {0}")]
    Format(String),

    /// A storage backend failure (I/O, row encoding).
    #[error("storage error: {0}")]
    Storage(String),
}

// =============================================================================
// TESTS
// =============================================================================
