//! # Label Recomputation
//!
//! After a composite resolves to a concrete object, the engine triggers a
//! label recalculation over the object's now-current children. The engine's
//! behavior never depends on the result; labels are a pure read-side
//! convenience stored as an indexed property.

use crate::error::Result;
use crate::model::{DbObject, SimpleValue, Uri};
use crate::schema::TypeRegistry;
use crate::storage::{GraphStore, RelatedFilter};

/// Property key under which labels are stored (indexed).
pub const LABEL_PROPERTY: &str = "holon.label";

/// Label recursion bound. Composite nesting beyond this yields an empty
/// label rather than an error.
const MAX_LABEL_DEPTH: usize = 8;

// =============================================================================
// SEAM
// =============================================================================

/// Recomputes an object's label from its now-current children.
///
/// Consumed by the engine after every composite update. Implementations
/// must not mutate anything besides the label property.
pub trait LabelCalculator {
    /// Recompute and store the label of `object`.
    fn recalculate(
        &self,
        store: &mut dyn GraphStore,
        registry: &TypeRegistry,
        object: &DbObject,
    ) -> Result<()>;
}

// =============================================================================
// DEFAULT IMPLEMENTATION
// =============================================================================

/// The default labeler.
///
/// An object's label is its own simple value if non-empty, else the label of
/// its first non-empty child in definition order, recursively.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleLabels;

impl SimpleLabels {
    fn label_of(
        &self,
        store: &dyn GraphStore,
        registry: &TypeRegistry,
        object: &DbObject,
        depth: usize,
    ) -> Result<String> {
        if !object.value().is_empty() {
            return Ok(object.value().to_string());
        }
        if depth == 0 {
            return Ok(String::new());
        }
        // Unregistered types (e.g. instance-level edge types) have no
        // children to consult.
        let Ok(type_def) = registry.type_def(object.type_uri()) else {
            return Ok(String::new());
        };
        for def in type_def.defs() {
            let children = store.related_nodes(
                object.player_ref(),
                &RelatedFilter::any()
                    .edge_type(def.instance_edge_type())
                    .my_role(def.parent_role.clone())
                    .other_role(def.child_role.clone())
                    .other_type(def.child_type.clone()),
            )?;
            if let Some(first) = children.first() {
                let label = self.label_of(
                    store,
                    registry,
                    &DbObject::Node(first.node.clone()),
                    depth - 1,
                )?;
                if !label.is_empty() {
                    return Ok(label);
                }
            }
        }
        Ok(String::new())
    }
}

impl LabelCalculator for SimpleLabels {
    fn recalculate(
        &self,
        store: &mut dyn GraphStore,
        registry: &TypeRegistry,
        object: &DbObject,
    ) -> Result<()> {
        let label = self.label_of(&*store, registry, object, MAX_LABEL_DEPTH)?;
        store.store_property(
            object.id(),
            &Uri::new(LABEL_PROPERTY),
            SimpleValue::Text(label),
            true,
        )
    }
}

/// A labeler that does nothing. Useful for callers that maintain labels
/// elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLabels;

impl LabelCalculator for NoLabels {
    fn recalculate(
        &self,
        _store: &mut dyn GraphStore,
        _registry: &TypeRegistry,
        _object: &DbObject,
    ) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
