//! # Value Unification Engine
//!
//! Integrates new values into the store: given a (possibly nested) value
//! tree describing a node's or edge's desired state, decides whether to
//! reuse an existing object or create a new one, and reconciles nested
//! child relationships against their previous state.
//!
//! One top-level [`ValueEngine::unify`] call is one atomic unit of work:
//! the scoped storage transaction is acquired at entry and released on
//! every exit path — full commit on success, full rollback on any failure.
//!
//! Execution is single-threaded, synchronous and recursive; recursion depth
//! is bounded by the composite-type nesting depth. Each recursive call's
//! working state (type, flags, emptied set) is local to that call and
//! passed explicitly — there is no shared mutable engine state.

use crate::error::{HolonError, Result};
use crate::label::{LabelCalculator, SimpleLabels};
use crate::model::{
    ChildModel, ChildSlot, ChildValues, DbObject, EdgeModel, NodeModel, ObjectId, ObjectRef,
    Payload, PlayerRef, RoleModel, SimpleValue, UnifiedValue, UpdateModel, Uri,
};
use crate::schema::{AssocDef, TypeDef, TypeRegistry};
use crate::storage::{GraphStore, RelatedFilter, RelatedNode};
use std::collections::BTreeSet;
use tracing::{debug, error, info};

/// Shorthand for consistency violations.
fn consistency(msg: impl Into<String>) -> HolonError {
    HolonError::Consistency(msg.into())
}

// =============================================================================
// UNIFIED CHILD SLOTS (per-call working state)
// =============================================================================

/// A unified child, paired with the input descriptor it came from.
///
/// The descriptor is needed later when the relating edge's own value is
/// updated; the [`UnifiedValue`] alone does not carry it.
enum Unified<'m> {
    /// Cardinality "one": a single unified child (possibly empty).
    One(UnifiedValue, &'m ChildModel),
    /// Cardinality "many": one unified child per supplied element.
    Many(Vec<(UnifiedValue, &'m ChildModel)>),
}

/// The supplied definitions of one composite, in type-definition order.
type Supplied<'a, 'm> = Vec<(&'a AssocDef, Unified<'m>)>;

// =============================================================================
// ENGINE
// =============================================================================

/// The value unification engine.
///
/// Holds the storage port and type registry for the duration of a series of
/// calls; every per-call state lives on the stack of that call.
pub struct ValueEngine<'a, S: GraphStore> {
    store: &'a mut S,
    registry: &'a TypeRegistry,
    labels: &'a dyn LabelCalculator,
}

impl<'a, S: GraphStore> ValueEngine<'a, S> {
    /// Create an engine with the default labeler.
    pub fn new(store: &'a mut S, registry: &'a TypeRegistry) -> Self {
        Self {
            store,
            registry,
            labels: &SimpleLabels,
        }
    }

    /// Create an engine with a custom labeler.
    pub fn with_labels(
        store: &'a mut S,
        registry: &'a TypeRegistry,
        labels: &'a dyn LabelCalculator,
    ) -> Self {
        Self {
            store,
            registry,
            labels,
        }
    }

    /// Integrate a value tree and return the unified value.
    ///
    /// Used uniformly for create (`target` absent) and update (`target`
    /// present) of either a node or an edge. Everything happens inside one
    /// scoped storage transaction; on any error nothing is applied.
    pub fn unify(
        &mut self,
        model: &UpdateModel,
        target: Option<&DbObject>,
    ) -> Result<UnifiedValue> {
        self.store.begin()?;
        let is_edge = self.subject_is_edge(model, target);
        match self.integrate(model, target, is_edge) {
            Ok(unified) => {
                self.store.commit()?;
                Ok(unified)
            }
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback() {
                    error!(error = %rollback_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Whether the top-level subject is an edge.
    ///
    /// With a target this is the target's kind. Without one, an update model
    /// whose id resolves to an existing edge is an in-place edge update.
    fn subject_is_edge(&self, model: &UpdateModel, target: Option<&DbObject>) -> bool {
        match target {
            Some(object) => object.is_edge(),
            None => {
                matches!(model.payload, Payload::Simple(_) | Payload::Composite(_))
                    && model.id.is_some_and(|id| self.store.edge(id).is_ok())
            }
        }
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    /// One recursive unification call.
    fn integrate(
        &mut self,
        model: &UpdateModel,
        target: Option<&DbObject>,
        is_edge: bool,
    ) -> Result<UnifiedValue> {
        let original_id = model.id;
        match &model.payload {
            // References resolve immediately; no unification logic applies.
            Payload::Ref(object_ref) => self.unify_ref(object_ref, original_id),
            // Deletion markers: "remove this child".
            Payload::Deletion => Ok(UnifiedValue::none(original_id)),
            Payload::Simple(value) => {
                let resolved = self.update_simple(model, value, target, is_edge)?;
                Ok(UnifiedValue {
                    value: resolved,
                    original_id,
                })
            }
            Payload::Composite(children) => {
                let resolved = self.update_composite(model, children, target, is_edge)?;
                Ok(UnifiedValue {
                    value: resolved,
                    original_id,
                })
            }
        }
    }

    fn unify_ref(
        &mut self,
        object_ref: &ObjectRef,
        original_id: Option<ObjectId>,
    ) -> Result<UnifiedValue> {
        if object_ref.is_empty() {
            return Ok(UnifiedValue::none(original_id));
        }
        let object = match object_ref {
            ObjectRef::ById(id) => self.store.object(*id)?,
            ObjectRef::ByUri(uri) => self
                .store
                .object_by_uri(uri)?
                .ok_or_else(|| HolonError::UriNotFound(uri.clone()))?,
        };
        debug!(id = %object.id(), "referencing existing object");
        Ok(UnifiedValue::some(object, original_id))
    }

    // -------------------------------------------------------------------------
    // Simple values
    // -------------------------------------------------------------------------

    /// Returns the unified value, or `None` if there was nothing to update.
    /// The latter is the case for a node subject with an empty string.
    fn update_simple(
        &mut self,
        model: &UpdateModel,
        value: &SimpleValue,
        target: Option<&DbObject>,
        is_edge: bool,
    ) -> Result<Option<DbObject>> {
        if is_edge {
            // An edge's simple value is never unified: even if two edges
            // have the same type and value they are distinct, as they still
            // have different players. Updated in place instead.
            return self.store_edge_simple_value(model, value, target).map(Some);
        }
        if value.is_empty() {
            return Ok(None);
        }
        self.unify_simple(model, value).map(Some)
    }

    fn store_edge_simple_value(
        &mut self,
        model: &UpdateModel,
        value: &SimpleValue,
        target: Option<&DbObject>,
    ) -> Result<DbObject> {
        match target {
            Some(DbObject::Edge(edge)) => {
                self.store.update_edge_value(edge.id, value.clone())?;
                let mut updated = edge.clone();
                updated.value = value.clone();
                Ok(DbObject::Edge(updated))
            }
            Some(DbObject::Node(node)) => Err(consistency(format!(
                "edge subject resolved to node {}",
                node.id
            ))),
            None => {
                // Self-identifying: the model's id names the edge to update.
                let id = model
                    .id
                    .ok_or_else(|| consistency("edge update model has no id"))?;
                self.store.update_edge_value(id, value.clone())?;
                self.store.edge(id).map(DbObject::Edge)
            }
        }
    }

    /// Find-or-create for a non-empty simple node value. Equality is
    /// exact-match, not fuzzy.
    fn unify_simple(&mut self, model: &UpdateModel, value: &SimpleValue) -> Result<DbObject> {
        let type_uri = model
            .type_uri
            .as_ref()
            .ok_or_else(|| consistency("simple update model has no type"))?;
        match self.store.node_by_value(type_uri, value)? {
            Some(node) => {
                debug!(id = %node.id, %type_uri, %value, "reusing simple value");
                Ok(DbObject::Node(node))
            }
            None => {
                let node =
                    self.store
                        .create_node(model.uri.clone(), type_uri.clone(), value.clone())?;
                info!(id = %node.id, %type_uri, %value, "creating simple value");
                Ok(DbObject::Node(node))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Composite values
    // -------------------------------------------------------------------------

    /// Returns the unified composite value, or `None` if there was nothing
    /// to update.
    fn update_composite(
        &mut self,
        model: &UpdateModel,
        children: &ChildValues,
        target: Option<&DbObject>,
        is_edge: bool,
    ) -> Result<Option<DbObject>> {
        let registry = self.registry;
        let type_uri = model
            .type_uri
            .as_ref()
            .ok_or_else(|| consistency("composite update model has no type"))?;
        let type_def = registry.type_def(type_uri)?;

        let (supplied, emptied) = self.unify_children(type_def, children)?;

        let resolved = if type_def.is_value_type() {
            // A pure value object: find-or-create over all supplied children.
            let has_value = supplied.iter().any(|(_, slot)| match slot {
                Unified::One(unified, _) => unified.is_some(),
                Unified::Many(_) => true,
            });
            if has_value {
                let entries: Vec<_> = supplied.iter().map(|(def, slot)| (*def, slot)).collect();
                Some(self.unify_child_values(model, type_def, &entries)?)
            } else {
                None
            }
        } else {
            // An addressable entity: resolve the owner, then reconcile its
            // relationship set in place.
            let parent = self.identify_parent(model, type_def, target, is_edge, &supplied)?;
            Some(self.update_assignments(parent, type_def, &supplied, &emptied, is_edge)?)
        };

        match &resolved {
            Some(object) => {
                let labels = self.labels;
                labels.recalculate(self.store, registry, object)?;
            }
            None => {
                if is_edge {
                    // An edge's value slot is never left unresolved.
                    return self
                        .store_edge_simple_value(model, &SimpleValue::empty(), target)
                        .map(Some);
                }
            }
        }
        Ok(resolved)
    }

    /// Recursively unify the supplied children, in the *type's* definition
    /// order. Input keys with no matching definition are ignored; missing
    /// definitions are untouched (partial update semantics).
    ///
    /// Returns the unified slots plus the set of cardinality-"one"
    /// definitions that unified to nothing (the "emptied" set).
    fn unify_children<'m>(
        &mut self,
        type_def: &'a TypeDef,
        children: &'m ChildValues,
    ) -> Result<(Supplied<'a, 'm>, BTreeSet<Uri>)> {
        let mut supplied: Supplied<'a, 'm> = Vec::new();
        let mut emptied = BTreeSet::new();
        for def in type_def.defs() {
            let Some(slot) = children.get(&def.name) else {
                continue;
            };
            if def.is_one() {
                let child = match slot {
                    ChildSlot::One(child) => child,
                    ChildSlot::Many(list) if list.len() == 1 => &list[0],
                    ChildSlot::Many(_) => {
                        return Err(consistency(format!(
                            "multiple values for one-cardinality definition \"{}\"",
                            def.name
                        )));
                    }
                };
                let unified = self.integrate(&child.value, None, false)?;
                if unified.value.is_none() {
                    emptied.insert(def.name.clone());
                }
                supplied.push((def, Unified::One(unified, child)));
            } else {
                let list: Vec<&ChildModel> = match slot {
                    ChildSlot::Many(list) => list.iter().collect(),
                    ChildSlot::One(child) => vec![child],
                };
                let mut unified_list = Vec::with_capacity(list.len());
                for child in list {
                    unified_list.push((self.integrate(&child.value, None, false)?, child));
                }
                supplied.push((def, Unified::Many(unified_list)));
            }
        }
        Ok((supplied, emptied))
    }

    // -------------------------------------------------------------------------
    // Candidate elimination
    // -------------------------------------------------------------------------

    /// Find-or-create over the given (definition, child) pairs.
    ///
    /// Candidates are seeded from the first pair with a non-empty child and
    /// narrowed by successive per-definition filtering. Zero survivors:
    /// create from scratch. One: reuse. More: fail — never guess.
    fn unify_child_values(
        &mut self,
        model: &UpdateModel,
        type_def: &'a TypeDef,
        entries: &[(&'a AssocDef, &Unified<'_>)],
    ) -> Result<DbObject> {
        let mut seed = None;
        for (index, &(def, slot)) in entries.iter().enumerate() {
            match slot {
                Unified::Many(_) => {
                    return Err(HolonError::UnsupportedCardinality {
                        def: def.name.clone(),
                    });
                }
                Unified::One(unified, _) => {
                    if let Some(child) = &unified.value {
                        seed = Some((index, def, child));
                        break;
                    }
                }
            }
        }
        let Some((seed_index, seed_def, seed_child)) = seed else {
            return Err(consistency(
                "no non-empty child to determine parent candidates",
            ));
        };

        let mut candidates = self.parent_candidates(type_def, seed_def, seed_child)?;
        for (index, &(def, slot)) in entries.iter().enumerate() {
            if index == seed_index {
                continue;
            }
            if candidates.is_empty() {
                break;
            }
            match slot {
                Unified::Many(_) => {
                    return Err(HolonError::UnsupportedCardinality {
                        def: def.name.clone(),
                    });
                }
                Unified::One(unified, _) => {
                    self.eliminate_candidates(&mut candidates, def, unified.value.as_ref())?;
                }
            }
        }

        match candidates.len() {
            0 => self.create_composite_node(model, type_def, entries),
            1 => {
                let node = candidates.remove(0);
                info!(id = %node.id, type_uri = %type_def.uri, "reusing composite");
                Ok(DbObject::Node(node))
            }
            _ => Err(HolonError::Ambiguity {
                type_uri: type_def.uri.clone(),
                candidates: candidates.iter().map(|n| n.id).collect(),
            }),
        }
    }

    /// All same-typed nodes already connected to `child` through `def`'s
    /// instance-level edge type.
    fn parent_candidates(
        &mut self,
        type_def: &TypeDef,
        def: &AssocDef,
        child: &DbObject,
    ) -> Result<Vec<NodeModel>> {
        if def.parent_type != type_def.uri {
            return Err(HolonError::TypeMismatch {
                expected: type_def.uri.clone(),
                actual: def.parent_type.clone(),
            });
        }
        let related = self.store.related_nodes(
            child.player_ref(),
            &RelatedFilter::any()
                .edge_type(def.instance_edge_type())
                .my_role(def.child_role.clone())
                .other_role(def.parent_role.clone())
                .other_type(type_def.uri.clone()),
        )?;
        Ok(related.into_iter().map(|r| r.node).collect())
    }

    /// Narrow `candidates` by one definition: a non-empty child keeps only
    /// candidates connected to it; an empty child keeps only candidates with
    /// *no* child under the definition — presence must mirror absence.
    fn eliminate_candidates(
        &mut self,
        candidates: &mut Vec<NodeModel>,
        def: &AssocDef,
        child: Option<&DbObject>,
    ) -> Result<()> {
        let edge_type = def.instance_edge_type();
        let mut kept = Vec::with_capacity(candidates.len());
        for candidate in candidates.drain(..) {
            let keep = match child {
                Some(child) => self
                    .store
                    .edge_between(
                        &edge_type,
                        PlayerRef::Node(candidate.id),
                        &def.parent_role,
                        child.player_ref(),
                        &def.child_role,
                    )?
                    .is_some(),
                None => self
                    .store
                    .related_nodes(
                        PlayerRef::Node(candidate.id),
                        &RelatedFilter::any()
                            .edge_type(edge_type.clone())
                            .my_role(def.parent_role.clone())
                            .other_role(def.child_role.clone())
                            .other_type(def.child_type.clone()),
                    )?
                    .is_empty(),
            };
            if keep {
                kept.push(candidate);
            } else {
                debug!(id = %candidate.id, def = %def.name, "eliminating parent candidate");
            }
        }
        *candidates = kept;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Parent identification
    // -------------------------------------------------------------------------

    /// Resolve or create the owning object of an identity composite.
    fn identify_parent(
        &mut self,
        model: &UpdateModel,
        type_def: &'a TypeDef,
        target: Option<&DbObject>,
        is_edge: bool,
        supplied: &Supplied<'a, '_>,
    ) -> Result<DbObject> {
        if let Some(object) = target {
            return Ok(object.clone());
        }
        if is_edge {
            // Self-identifying: the edge exists already.
            let id = model
                .id
                .ok_or_else(|| consistency("edge update model has no id"))?;
            return self.store.edge(id).map(DbObject::Edge);
        }
        if !type_def.has_identity_defs() {
            // Without identity attributes no deduplication is possible, even
            // if structurally identical nodes exist elsewhere.
            let node = self.store.create_node(
                model.uri.clone(),
                type_def.uri.clone(),
                SimpleValue::empty(),
            )?;
            info!(id = %node.id, type_uri = %type_def.uri, "creating composite without identity attributes");
            return Ok(DbObject::Node(node));
        }
        let entries = self.identity_entries(type_def, supplied)?;
        self.unify_child_values(model, type_def, &entries)
    }

    /// The identity attributes that are present in the update.
    ///
    /// Missing or emptied identity children are skipped: partial presence is
    /// sufficient. Only when *all* identity children are absent does the
    /// call fail.
    fn identity_entries<'s, 'm>(
        &self,
        type_def: &'a TypeDef,
        supplied: &'s Supplied<'a, 'm>,
    ) -> Result<Vec<(&'a AssocDef, &'s Unified<'m>)>> {
        let mut entries = Vec::new();
        for def in type_def.identity_defs() {
            if !def.is_one() {
                return Err(HolonError::UnsupportedCardinality {
                    def: def.name.clone(),
                });
            }
            if let Some((supplied_def, slot)) =
                supplied.iter().find(|(d, _)| d.name == def.name)
            {
                if let Unified::One(unified, _) = slot {
                    if unified.is_some() {
                        entries.push((*supplied_def, slot));
                    }
                }
            }
        }
        if entries.is_empty() {
            return Err(HolonError::Identity {
                type_uri: type_def.uri.clone(),
            });
        }
        Ok(entries)
    }

    // -------------------------------------------------------------------------
    // Assignment reconciliation
    // -------------------------------------------------------------------------

    /// Diff the parent's current children against the new unified values,
    /// in place, for every definition of the type.
    fn update_assignments(
        &mut self,
        parent: DbObject,
        type_def: &'a TypeDef,
        supplied: &Supplied<'a, '_>,
        emptied: &BTreeSet<Uri>,
        is_edge: bool,
    ) -> Result<DbObject> {
        // sanity check
        if parent.type_uri() != &type_def.uri {
            return Err(HolonError::TypeMismatch {
                expected: type_def.uri.clone(),
                actual: parent.type_uri().clone(),
            });
        }
        for def in type_def.defs() {
            let entry = supplied.iter().find(|(d, _)| d.name == def.name);
            if def.is_one() {
                let (unified_child, child_model) = match entry {
                    Some((_, Unified::One(unified, child_model))) => {
                        (unified.value.as_ref(), Some(*child_model))
                    }
                    _ => (None, None),
                };
                let new_is_empty = emptied.contains(&def.name);
                self.update_assignments_one(
                    &parent,
                    def,
                    unified_child,
                    child_model,
                    new_is_empty,
                    is_edge,
                )?;
            } else if let Some((_, Unified::Many(list))) = entry {
                // Unsupplied "many" definitions are untouched.
                self.update_assignments_many(&parent, def, list, is_edge)?;
            }
        }
        Ok(parent)
    }

    fn update_assignments_one(
        &mut self,
        parent: &DbObject,
        def: &AssocDef,
        unified_child: Option<&DbObject>,
        child_model: Option<&ChildModel>,
        new_is_empty: bool,
        is_edge: bool,
    ) -> Result<()> {
        let mut current = self.children_of(parent, def)?;
        if current.len() > 1 {
            return Err(HolonError::Ambiguity {
                type_uri: def.child_type.clone(),
                candidates: current.iter().map(|r| r.node.id).collect(),
            });
        }
        let old = current.pop();

        // 1) delete the assignment if it exists AND the value has changed or
        //    been emptied
        let mut deleted = false;
        if let Some(old_rel) = &old {
            let changed = unified_child.is_some_and(|child| child.id() != old_rel.node.id);
            if new_is_empty || changed {
                self.store.delete_edge(old_rel.edge.id)?;
                if new_is_empty {
                    info!(parent = %parent.id(), def = %def.name, "deleting assignment from composite");
                }
                deleted = true;
            }
        }

        // 2) create an assignment if none exists OR the value has changed;
        //    a new value must be present
        let mut created: Option<EdgeModel> = None;
        if let Some(child) = unified_child {
            let differs = old.as_ref().is_none_or(|o| o.node.id != child.id());
            if differs {
                created = Some(self.create_child_edge(parent, child, def, deleted)?);
            }
        }

        // 3) update the relating edge's own value — never for edge subjects,
        //    and the newly created edge takes precedence over a retained old
        //    one
        if !is_edge {
            let edge = created.or_else(|| old.filter(|_| !deleted).map(|o| o.edge));
            if let (Some(edge), Some(child_model)) = (edge, child_model) {
                self.update_relating_edge(edge, child_model)?;
            }
        }
        Ok(())
    }

    /// Per-element create/delete, matching old-vs-new by each element's
    /// pre-update id — never by value equality. Unchanged elements are
    /// untouched, preventing delete+recreate churn. A supplied "many"
    /// definition carries the complete new child set: current children not
    /// claimed by any element are deleted.
    fn update_assignments_many(
        &mut self,
        parent: &DbObject,
        def: &AssocDef,
        list: &[(UnifiedValue, &ChildModel)],
        is_edge: bool,
    ) -> Result<()> {
        let mut current = self.children_of(parent, def)?;
        for (unified, child_model) in list {
            let child_model: &ChildModel = child_model;
            let original_id = unified.original_id;
            let new_id = unified.id();
            let old_index =
                original_id.and_then(|id| current.iter().position(|r| r.node.id == id));
            if let Some(id) = original_id {
                if old_index.is_none() {
                    return Err(consistency(format!(
                        "child {id} not found under definition \"{}\" of {}",
                        def.name,
                        parent.id()
                    )));
                }
            }

            // 1) claim the element's previous relationship; delete it if the
            //    value has changed or been emptied
            let mut deleted = false;
            let mut retained: Option<RelatedNode> = None;
            if let Some(index) = old_index {
                let old_rel = current.remove(index);
                if new_id != original_id {
                    self.store.delete_edge(old_rel.edge.id)?;
                    if new_id.is_none() {
                        info!(parent = %parent.id(), def = %def.name, "deleting assignment from composite");
                    }
                    deleted = true;
                } else {
                    retained = Some(old_rel);
                }
            }

            // 2) create an assignment if none exists OR the value has changed
            let mut created: Option<EdgeModel> = None;
            if let Some(child) = unified.value.as_ref() {
                if original_id != new_id {
                    created = Some(self.create_child_edge(parent, child, def, deleted)?);
                }
            }

            // 3) update the relating edge's own value — never for edge
            //    subjects
            if !is_edge {
                let edge = created.or_else(|| retained.map(|r| r.edge));
                if let Some(edge) = edge {
                    self.update_relating_edge(edge, child_model)?;
                }
            }
        }
        // What the update did not claim is gone.
        for stale in current {
            info!(parent = %parent.id(), def = %def.name, child = %stale.node.id, "deleting unclaimed assignment from composite");
            self.store.delete_edge(stale.edge.id)?;
        }
        Ok(())
    }

    /// Apply a child descriptor's edge payload to the relating edge.
    ///
    /// Only the edge's own value is updated; role bindings are frozen once
    /// the edge is created.
    fn update_relating_edge(&mut self, edge: EdgeModel, child_model: &ChildModel) -> Result<()> {
        let Some(payload) = &child_model.edge_value else {
            return Ok(());
        };
        let model = if payload.type_uri.is_some() {
            payload.clone()
        } else {
            let mut filled = payload.clone();
            filled.type_uri = Some(edge.type_uri.clone());
            filled
        };
        let target = DbObject::Edge(edge);
        self.integrate(&model, Some(&target), true)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // DB access helpers
    // -------------------------------------------------------------------------

    /// The parent's current children under one definition.
    fn children_of(&mut self, parent: &DbObject, def: &AssocDef) -> Result<Vec<RelatedNode>> {
        self.store.related_nodes(
            parent.player_ref(),
            &RelatedFilter::any()
                .edge_type(def.instance_edge_type())
                .my_role(def.parent_role.clone())
                .other_role(def.child_role.clone())
                .other_type(def.child_type.clone()),
        )
    }

    /// Create a composite node and its child edges from scratch.
    fn create_composite_node(
        &mut self,
        model: &UpdateModel,
        type_def: &TypeDef,
        entries: &[(&'a AssocDef, &Unified<'_>)],
    ) -> Result<DbObject> {
        let node = self.store.create_node(
            model.uri.clone(),
            type_def.uri.clone(),
            SimpleValue::empty(),
        )?;
        info!(id = %node.id, type_uri = %type_def.uri, "creating composite");
        let parent = DbObject::Node(node);
        for &(def, slot) in entries {
            match slot {
                Unified::One(unified, _) => {
                    if let Some(child) = &unified.value {
                        self.create_child_edge(&parent, child, def, false)?;
                    }
                }
                Unified::Many(list) => {
                    for (unified, _) in list {
                        if let Some(child) = &unified.value {
                            self.create_child_edge(&parent, child, def, false)?;
                        }
                    }
                }
            }
        }
        Ok(parent)
    }

    /// Create one child relationship edge.
    fn create_child_edge(
        &mut self,
        parent: &DbObject,
        child: &DbObject,
        def: &AssocDef,
        reassigned: bool,
    ) -> Result<EdgeModel> {
        info!(
            child = %child.id(),
            parent = %parent.id(),
            def = %def.name,
            reassigned,
            "assigning child to composite"
        );
        self.store.create_edge(
            None,
            def.instance_edge_type(),
            SimpleValue::empty(),
            RoleModel::new(parent.player_ref(), def.parent_role.clone()),
            RoleModel::new(child.player_ref(), def.child_role.clone()),
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
