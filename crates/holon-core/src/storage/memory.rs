//! # In-Memory Graph Storage
//!
//! The volatile reference implementation of the storage port.
//!
//! The scoped transaction is a full-state snapshot: `begin()` clones the
//! state, `rollback()` restores it, `commit()` drops it.

use crate::error::{HolonError, Result};
use crate::model::{EdgeModel, NodeModel, ObjectId, PlayerRef, RoleModel, SimpleValue, Uri};
use crate::storage::state::GraphState;
use crate::storage::{GraphStore, RelatedFilter, RelatedNode};

/// The in-memory graph store.
#[derive(Debug, Clone, Default)]
pub struct MemGraph {
    state: GraphState,
    /// Snapshot taken at `begin()`; present while a transaction is open.
    snapshot: Option<Box<GraphState>>,
}

impl MemGraph {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for MemGraph {
    fn node(&self, id: ObjectId) -> Result<NodeModel> {
        self.state.node(id)
    }

    fn edge(&self, id: ObjectId) -> Result<EdgeModel> {
        self.state.edge(id)
    }

    fn node_by_uri(&self, uri: &Uri) -> Result<Option<NodeModel>> {
        Ok(self.state.node_by_uri(uri))
    }

    fn edge_by_uri(&self, uri: &Uri) -> Result<Option<EdgeModel>> {
        Ok(self.state.edge_by_uri(uri))
    }

    fn node_by_value(&self, type_uri: &Uri, value: &SimpleValue) -> Result<Option<NodeModel>> {
        self.state.node_by_value(type_uri, value)
    }

    fn nodes_by_value(&self, type_uri: &Uri, value: &SimpleValue) -> Result<Vec<NodeModel>> {
        Ok(self.state.nodes_by_value(type_uri, value))
    }

    fn related_nodes(
        &self,
        player: PlayerRef,
        filter: &RelatedFilter,
    ) -> Result<Vec<RelatedNode>> {
        Ok(self.state.related_nodes(player, filter))
    }

    fn edge_between(
        &self,
        edge_type: &Uri,
        player1: PlayerRef,
        role1: &Uri,
        player2: PlayerRef,
        role2: &Uri,
    ) -> Result<Option<EdgeModel>> {
        self.state
            .edge_between(edge_type, player1, role1, player2, role2)
    }

    fn create_node(
        &mut self,
        uri: Option<Uri>,
        type_uri: Uri,
        value: SimpleValue,
    ) -> Result<NodeModel> {
        self.state.create_node(uri, type_uri, value)
    }

    fn create_edge(
        &mut self,
        uri: Option<Uri>,
        type_uri: Uri,
        value: SimpleValue,
        role1: RoleModel,
        role2: RoleModel,
    ) -> Result<EdgeModel> {
        self.state.create_edge(uri, type_uri, value, role1, role2)
    }

    fn delete_edge(&mut self, id: ObjectId) -> Result<()> {
        self.state.delete_edge(id).map(|_| ())
    }

    fn update_node_value(&mut self, id: ObjectId, value: SimpleValue) -> Result<()> {
        self.state.update_node_value(id, value).map(|_| ())
    }

    fn update_edge_value(&mut self, id: ObjectId, value: SimpleValue) -> Result<()> {
        self.state.update_edge_value(id, value).map(|_| ())
    }

    fn store_property(
        &mut self,
        id: ObjectId,
        key: &Uri,
        value: SimpleValue,
        index: bool,
    ) -> Result<()> {
        self.state.store_property(id, key, value, index).map(|_| ())
    }

    fn property(&self, id: ObjectId, key: &Uri) -> Result<Option<SimpleValue>> {
        Ok(self.state.property(id, key))
    }

    fn nodes_by_property(&self, key: &Uri, value: &SimpleValue) -> Result<Vec<NodeModel>> {
        Ok(self.state.nodes_by_property(key, value))
    }

    fn nodes_by_property_range(&self, key: &Uri, from: i64, to: i64) -> Result<Vec<NodeModel>> {
        Ok(self.state.nodes_by_property_range(key, from, to))
    }

    fn begin(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(HolonError::Storage(
                "transaction already active".to_string(),
            ));
        }
        self.snapshot = Some(Box::new(self.state.clone()));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| HolonError::Storage("no active transaction".to_string()))
    }

    fn rollback(&mut self) -> Result<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| HolonError::Storage("no active transaction".to_string()))?;
        self.state = *snapshot;
        Ok(())
    }

    fn node_count(&self) -> Result<usize> {
        Ok(self.state.node_count())
    }

    fn edge_count(&self) -> Result<usize> {
        Ok(self.state.edge_count())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> SimpleValue {
        SimpleValue::text(s)
    }

    fn link(store: &mut MemGraph, whole: ObjectId, part: ObjectId) -> EdgeModel {
        store
            .create_edge(
                None,
                Uri::new("holon.assoc.composition"),
                SimpleValue::empty(),
                RoleModel::new(PlayerRef::Node(whole), "holon.role.whole"),
                RoleModel::new(PlayerRef::Node(part), "holon.role.part"),
            )
            .expect("create edge")
    }

    #[test]
    fn create_and_fetch_node() {
        let mut store = MemGraph::new();
        let node = store
            .create_node(None, Uri::new("ex.note"), text("hi"))
            .expect("create");
        let fetched = store.node(node.id).expect("fetch");
        assert_eq!(fetched, node);
    }

    #[test]
    fn missing_node_is_not_found() {
        let store = MemGraph::new();
        assert!(matches!(
            store.node(ObjectId(99)),
            Err(HolonError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn uri_unique_across_nodes_and_edges() {
        let mut store = MemGraph::new();
        let a = store
            .create_node(Some(Uri::new("ex.home")), Uri::new("ex.note"), text("a"))
            .expect("create");
        let b = store
            .create_node(None, Uri::new("ex.note"), text("b"))
            .expect("create");
        // Same URI on an edge must collide with the node's URI.
        let result = store.create_edge(
            Some(Uri::new("ex.home")),
            Uri::new("holon.assoc.composition"),
            SimpleValue::empty(),
            RoleModel::new(PlayerRef::Node(a.id), "holon.role.whole"),
            RoleModel::new(PlayerRef::Node(b.id), "holon.role.part"),
        );
        assert!(matches!(result, Err(HolonError::DuplicateUri { .. })));
    }

    #[test]
    fn empty_uri_is_not_claimed() {
        let mut store = MemGraph::new();
        store
            .create_node(Some(Uri::new("")), Uri::new("ex.note"), text("a"))
            .expect("create");
        store
            .create_node(Some(Uri::new("")), Uri::new("ex.note"), text("b"))
            .expect("create");
    }

    #[test]
    fn node_by_value_unique_or_ambiguous() {
        let mut store = MemGraph::new();
        store
            .create_node(None, Uri::new("ex.color"), text("red"))
            .expect("create");
        assert!(
            store
                .node_by_value(&Uri::new("ex.color"), &text("red"))
                .expect("lookup")
                .is_some()
        );
        assert!(
            store
                .node_by_value(&Uri::new("ex.color"), &text("blue"))
                .expect("lookup")
                .is_none()
        );
        store
            .create_node(None, Uri::new("ex.color"), text("red"))
            .expect("create");
        assert!(matches!(
            store.node_by_value(&Uri::new("ex.color"), &text("red")),
            Err(HolonError::Ambiguity { .. })
        ));
    }

    #[test]
    fn related_nodes_respects_filters() {
        let mut store = MemGraph::new();
        let person = store
            .create_node(None, Uri::new("ex.person"), SimpleValue::empty())
            .expect("create");
        let email = store
            .create_node(None, Uri::new("ex.email"), text("a@b.com"))
            .expect("create");
        link(&mut store, person.id, email.id);

        let hits = store
            .related_nodes(
                PlayerRef::Node(person.id),
                &RelatedFilter::any()
                    .edge_type("holon.assoc.composition")
                    .my_role("holon.role.whole")
                    .other_role("holon.role.part")
                    .other_type("ex.email"),
            )
            .expect("related");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node.id, email.id);

        // Wrong other-type filter yields nothing.
        let hits = store
            .related_nodes(
                PlayerRef::Node(person.id),
                &RelatedFilter::any().other_type("ex.phone"),
            )
            .expect("related");
        assert!(hits.is_empty());
    }

    #[test]
    fn related_nodes_reverse_direction() {
        let mut store = MemGraph::new();
        let person = store
            .create_node(None, Uri::new("ex.person"), SimpleValue::empty())
            .expect("create");
        let email = store
            .create_node(None, Uri::new("ex.email"), text("a@b.com"))
            .expect("create");
        link(&mut store, person.id, email.id);

        // From the child's perspective the parent is reachable.
        let hits = store
            .related_nodes(
                PlayerRef::Node(email.id),
                &RelatedFilter::any()
                    .my_role("holon.role.part")
                    .other_role("holon.role.whole"),
            )
            .expect("related");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node.id, person.id);
    }

    #[test]
    fn edge_between_either_orientation() {
        let mut store = MemGraph::new();
        let a = store
            .create_node(None, Uri::new("ex.person"), SimpleValue::empty())
            .expect("create");
        let b = store
            .create_node(None, Uri::new("ex.email"), text("a@b.com"))
            .expect("create");
        let edge = link(&mut store, a.id, b.id);

        let found = store
            .edge_between(
                &Uri::new("holon.assoc.composition"),
                PlayerRef::Node(a.id),
                &Uri::new("holon.role.whole"),
                PlayerRef::Node(b.id),
                &Uri::new("holon.role.part"),
            )
            .expect("between");
        assert_eq!(found.map(|e| e.id), Some(edge.id));

        let found = store
            .edge_between(
                &Uri::new("holon.assoc.composition"),
                PlayerRef::Node(b.id),
                &Uri::new("holon.role.part"),
                PlayerRef::Node(a.id),
                &Uri::new("holon.role.whole"),
            )
            .expect("between");
        assert!(found.is_some());
    }

    #[test]
    fn update_edge_value_keeps_roles() {
        let mut store = MemGraph::new();
        let a = store
            .create_node(None, Uri::new("ex.person"), SimpleValue::empty())
            .expect("create");
        let b = store
            .create_node(None, Uri::new("ex.email"), text("a@b.com"))
            .expect("create");
        let edge = link(&mut store, a.id, b.id);

        store
            .update_edge_value(edge.id, text("primary"))
            .expect("update");
        let updated = store.edge(edge.id).expect("fetch");
        assert_eq!(updated.value, text("primary"));
        assert_eq!(updated.role1, edge.role1);
        assert_eq!(updated.role2, edge.role2);
    }

    #[test]
    fn delete_edge_releases_uri() {
        let mut store = MemGraph::new();
        let a = store
            .create_node(None, Uri::new("ex.person"), SimpleValue::empty())
            .expect("create");
        let b = store
            .create_node(None, Uri::new("ex.email"), text("a@b.com"))
            .expect("create");
        let edge = store
            .create_edge(
                Some(Uri::new("ex.assoc.1")),
                Uri::new("holon.assoc.composition"),
                SimpleValue::empty(),
                RoleModel::new(PlayerRef::Node(a.id), "holon.role.whole"),
                RoleModel::new(PlayerRef::Node(b.id), "holon.role.part"),
            )
            .expect("create edge");

        store.delete_edge(edge.id).expect("delete");
        assert_eq!(store.edge_count().expect("count"), 0);
        // URI is free again.
        store
            .create_node(Some(Uri::new("ex.assoc.1")), Uri::new("ex.note"), text("x"))
            .expect("create");
    }

    #[test]
    fn properties_indexed_and_range() {
        let mut store = MemGraph::new();
        let a = store
            .create_node(None, Uri::new("ex.person"), SimpleValue::empty())
            .expect("create");
        let b = store
            .create_node(None, Uri::new("ex.person"), SimpleValue::empty())
            .expect("create");
        let key = Uri::new("ex.prop.age");
        store
            .store_property(a.id, &key, SimpleValue::Int(30), true)
            .expect("store");
        store
            .store_property(b.id, &key, SimpleValue::Int(40), false)
            .expect("store");

        assert_eq!(
            store.property(a.id, &key).expect("read"),
            Some(SimpleValue::Int(30))
        );
        // Only the indexed entry is found by lookup.
        let hits = store
            .nodes_by_property(&key, &SimpleValue::Int(40))
            .expect("lookup");
        assert!(hits.is_empty());
        let hits = store.nodes_by_property_range(&key, 20, 50).expect("range");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a.id);
    }

    #[test]
    fn rollback_restores_state() {
        let mut store = MemGraph::new();
        store
            .create_node(None, Uri::new("ex.note"), text("keep"))
            .expect("create");
        store.begin().expect("begin");
        store
            .create_node(Some(Uri::new("ex.tmp")), Uri::new("ex.note"), text("drop"))
            .expect("create");
        store.rollback().expect("rollback");

        assert_eq!(store.node_count().expect("count"), 1);
        assert!(
            store
                .node_by_uri(&Uri::new("ex.tmp"))
                .expect("lookup")
                .is_none()
        );
    }

    #[test]
    fn commit_keeps_writes() {
        let mut store = MemGraph::new();
        store.begin().expect("begin");
        store
            .create_node(None, Uri::new("ex.note"), text("kept"))
            .expect("create");
        store.commit().expect("commit");
        assert_eq!(store.node_count().expect("count"), 1);
    }

    #[test]
    fn nested_begin_rejected() {
        let mut store = MemGraph::new();
        store.begin().expect("begin");
        assert!(matches!(store.begin(), Err(HolonError::Storage(_))));
    }
}
