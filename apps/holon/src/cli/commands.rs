//! # CLI Command Implementations

use holon_core::formats::{object_to_json, parse_migration, run_migration};
use holon_core::{
    DbObject, GraphStore, HolonError, ObjectId, RedbGraph, TypeRegistry, Uri,
};
use std::path::Path;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum migration file size (50 MB).
///
/// This prevents memory exhaustion from accidental large files.
const MAX_MIGRATION_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), HolonError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        HolonError::Storage(format!("cannot read metadata of '{}': {e}", path.display()))
    })?;
    if metadata.len() > max_size {
        return Err(HolonError::Format(format!(
            "file size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<serde_json::Value, HolonError> {
    validate_file_size(path, MAX_MIGRATION_FILE_SIZE)?;
    let text = std::fs::read_to_string(path)
        .map_err(|e| HolonError::Storage(format!("cannot read '{}': {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| HolonError::Format(format!("invalid JSON in '{}': {e}", path.display())))
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Apply a migration file against a persistent store.
pub fn migrate(file: &Path, db: &Path) -> Result<(), HolonError> {
    let json = read_json(file)?;
    let mut store = RedbGraph::open(db)?;
    let mut registry = TypeRegistry::new();

    let unified = run_migration(&mut store, &mut registry, &json)?;

    for value in &unified {
        match value.id() {
            Some(id) => println!("unified object {id}"),
            None => println!("nothing to update"),
        }
    }
    tracing::info!(
        objects = unified.len(),
        nodes = store.node_count()?,
        edges = store.edge_count()?,
        "migration applied"
    );
    Ok(())
}

/// Fetch an object by id or URI and render it with its children.
pub fn get(
    db: &Path,
    id: Option<u64>,
    uri: Option<&str>,
    types: Option<&Path>,
    depth: usize,
) -> Result<(), HolonError> {
    let store = RedbGraph::open(db)?;

    // Types are needed to walk a composite's children; without them only
    // the object itself is rendered.
    let mut registry = TypeRegistry::new();
    if let Some(types_file) = types {
        let json = read_json(types_file)?;
        let _ = parse_migration(&mut registry, &json)?;
    }

    let object: DbObject = match (id, uri) {
        (Some(id), _) => store.object(ObjectId(id))?,
        (None, Some(uri)) => {
            let uri = Uri::new(uri);
            store
                .object_by_uri(&uri)?
                .ok_or(HolonError::UriNotFound(uri))?
        }
        (None, None) => {
            return Err(HolonError::Format(
                "pass either --id or --uri".to_string(),
            ));
        }
    };

    let rendered = object_to_json(&store, &registry, &object, depth)?;
    let pretty = serde_json::to_string_pretty(&rendered)
        .map_err(|e| HolonError::Format(e.to_string()))?;
    println!("{pretty}");
    Ok(())
}

/// Print store statistics.
pub fn status(db: &Path) -> Result<(), HolonError> {
    let store = RedbGraph::open(db)?;
    println!("nodes: {}", store.node_count()?);
    println!("edges: {}", store.edge_count()?);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_then_status_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let migration_path = dir.path().join("migration.json");
        let db_path = dir.path().join("graph.redb");

        std::fs::write(
            &migration_path,
            r#"{
                "types": [
                    { "uri": "ex.email", "data": "simple" },
                    {
                        "uri": "ex.person",
                        "data": "composite_identity",
                        "defs": [
                            { "name": "ex.email", "kind": "composition_def", "identity": true }
                        ]
                    }
                ],
                "objects": [
                    { "type": "ex.person", "ex.email": "a@b.com" }
                ]
            }"#,
        )
        .expect("write");

        migrate(&migration_path, &db_path).expect("migrate");
        // Re-running the same migration is idempotent at the store level,
        // apart from type re-registration, which is a config error.
        let store = RedbGraph::open(&db_path).expect("open");
        assert_eq!(store.node_count().expect("count"), 2);
        assert_eq!(store.edge_count().expect("count"), 1);
    }

    #[test]
    fn oversized_file_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("huge.json");
        std::fs::write(&path, "{}").expect("write");
        assert!(validate_file_size(&path, 1).is_err());
        assert!(validate_file_size(&path, 1024).is_ok());
    }

    #[test]
    fn get_requires_a_selector() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("graph.redb");
        // Bootstrap an empty store.
        let _ = RedbGraph::open(&db_path).expect("open");
        assert!(matches!(
            get(&db_path, None, None, None, 1),
            Err(HolonError::Format(_))
        ));
    }
}
