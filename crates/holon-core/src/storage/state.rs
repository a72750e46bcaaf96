//! # Shared Graph State
//!
//! The `BTreeMap` graph representation both backends operate on. `MemGraph`
//! holds one directly; `RedbGraph` mirrors one from disk and journals its
//! mutations into redb.
//!
//! All data structures use `BTreeMap` for deterministic ordering.

use crate::error::{HolonError, Result};
use crate::model::{EdgeModel, NodeModel, ObjectId, PlayerRef, RoleModel, SimpleValue, Uri};
use crate::storage::{RelatedFilter, RelatedNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored property value plus its index flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PropEntry {
    pub(crate) value: SimpleValue,
    pub(crate) indexed: bool,
}

/// The complete graph state. Cloned wholesale for snapshot transactions.
#[derive(Debug, Clone, Default)]
pub(crate) struct GraphState {
    /// Node storage: id -> node.
    nodes: BTreeMap<ObjectId, NodeModel>,
    /// Edge storage: id -> edge.
    edges: BTreeMap<ObjectId, EdgeModel>,
    /// URI index, shared by nodes and edges.
    uri_index: BTreeMap<Uri, ObjectId>,
    /// Properties: object id -> key -> entry.
    props: BTreeMap<ObjectId, BTreeMap<Uri, PropEntry>>,
    /// Next available id.
    next_id: u64,
}

impl GraphState {
    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }

    fn assign_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Register a URI, enforcing global uniqueness across nodes and edges.
    fn claim_uri(&mut self, uri: Option<Uri>, id: ObjectId) -> Result<Option<Uri>> {
        let Some(uri) = uri.filter(|u| !u.is_empty()) else {
            return Ok(None);
        };
        if self.uri_index.contains_key(&uri) {
            return Err(HolonError::DuplicateUri { uri });
        }
        self.uri_index.insert(uri.clone(), id);
        Ok(Some(uri))
    }

    /// The other side of an edge, if this edge matches `player` + `filter`.
    fn other_side(
        edge: &EdgeModel,
        player: PlayerRef,
        filter: &RelatedFilter,
    ) -> Option<PlayerRef> {
        if let Some(edge_type) = &filter.edge_type {
            if edge.type_uri != *edge_type {
                return None;
            }
        }
        let (mine, other) = if edge.role1.player == player {
            (&edge.role1, &edge.role2)
        } else if edge.role2.player == player {
            (&edge.role2, &edge.role1)
        } else {
            return None;
        };
        if let Some(my_role) = &filter.my_role {
            if mine.role_type != *my_role {
                return None;
            }
        }
        if let Some(other_role) = &filter.other_role {
            if other.role_type != *other_role {
                return None;
            }
        }
        Some(other.player)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub(crate) fn node(&self, id: ObjectId) -> Result<NodeModel> {
        self.nodes
            .get(&id)
            .cloned()
            .ok_or(HolonError::ObjectNotFound(id))
    }

    pub(crate) fn edge(&self, id: ObjectId) -> Result<EdgeModel> {
        self.edges
            .get(&id)
            .cloned()
            .ok_or(HolonError::ObjectNotFound(id))
    }

    pub(crate) fn node_by_uri(&self, uri: &Uri) -> Option<NodeModel> {
        self.uri_index
            .get(uri)
            .and_then(|id| self.nodes.get(id))
            .cloned()
    }

    pub(crate) fn edge_by_uri(&self, uri: &Uri) -> Option<EdgeModel> {
        self.uri_index
            .get(uri)
            .and_then(|id| self.edges.get(id))
            .cloned()
    }

    pub(crate) fn node_by_value(
        &self,
        type_uri: &Uri,
        value: &SimpleValue,
    ) -> Result<Option<NodeModel>> {
        let mut matches = self.nodes_by_value(type_uri, value);
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(HolonError::Ambiguity {
                type_uri: type_uri.clone(),
                candidates: matches.iter().map(|n| n.id).collect(),
            }),
        }
    }

    pub(crate) fn nodes_by_value(&self, type_uri: &Uri, value: &SimpleValue) -> Vec<NodeModel> {
        self.nodes
            .values()
            .filter(|n| n.type_uri == *type_uri && n.value == *value)
            .cloned()
            .collect()
    }

    pub(crate) fn related_nodes(
        &self,
        player: PlayerRef,
        filter: &RelatedFilter,
    ) -> Vec<RelatedNode> {
        let mut result = Vec::new();
        for edge in self.edges.values() {
            let Some(other) = Self::other_side(edge, player, filter) else {
                continue;
            };
            // Traversal yields nodes; edge players don't qualify.
            let PlayerRef::Node(node_id) = other else {
                continue;
            };
            let Some(node) = self.nodes.get(&node_id) else {
                continue;
            };
            if let Some(other_type) = &filter.other_type {
                if node.type_uri != *other_type {
                    continue;
                }
            }
            result.push(RelatedNode {
                node: node.clone(),
                edge: edge.clone(),
            });
        }
        result.sort_by_key(|r| (r.node.id, r.edge.id));
        result
    }

    pub(crate) fn edge_between(
        &self,
        edge_type: &Uri,
        player1: PlayerRef,
        role1: &Uri,
        player2: PlayerRef,
        role2: &Uri,
    ) -> Result<Option<EdgeModel>> {
        let mut matches: Vec<&EdgeModel> = self
            .edges
            .values()
            .filter(|e| {
                e.type_uri == *edge_type
                    && ((e.role1.player == player1
                        && e.role1.role_type == *role1
                        && e.role2.player == player2
                        && e.role2.role_type == *role2)
                        || (e.role2.player == player1
                            && e.role2.role_type == *role1
                            && e.role1.player == player2
                            && e.role1.role_type == *role2))
            })
            .collect();
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop().cloned()),
            _ => Err(HolonError::Ambiguity {
                type_uri: edge_type.clone(),
                candidates: matches.iter().map(|e| e.id).collect(),
            }),
        }
    }

    pub(crate) fn property(&self, id: ObjectId, key: &Uri) -> Option<SimpleValue> {
        self.props
            .get(&id)
            .and_then(|props| props.get(key))
            .map(|entry| entry.value.clone())
    }

    pub(crate) fn prop_keys(&self, id: ObjectId) -> Vec<Uri> {
        self.props
            .get(&id)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn nodes_by_property(&self, key: &Uri, value: &SimpleValue) -> Vec<NodeModel> {
        let mut result = Vec::new();
        for (id, props) in &self.props {
            let Some(entry) = props.get(key) else {
                continue;
            };
            if entry.indexed && entry.value == *value {
                if let Some(node) = self.nodes.get(id) {
                    result.push(node.clone());
                }
            }
        }
        result
    }

    pub(crate) fn nodes_by_property_range(&self, key: &Uri, from: i64, to: i64) -> Vec<NodeModel> {
        let mut result = Vec::new();
        for (id, props) in &self.props {
            let Some(entry) = props.get(key) else {
                continue;
            };
            let SimpleValue::Int(i) = entry.value else {
                continue;
            };
            if entry.indexed && i >= from && i <= to {
                if let Some(node) = self.nodes.get(id) {
                    result.push(node.clone());
                }
            }
        }
        result
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    pub(crate) fn create_node(
        &mut self,
        uri: Option<Uri>,
        type_uri: Uri,
        value: SimpleValue,
    ) -> Result<NodeModel> {
        let id = self.assign_id();
        let uri = self.claim_uri(uri, id)?;
        let node = NodeModel {
            id,
            uri,
            type_uri,
            value,
        };
        self.nodes.insert(id, node.clone());
        Ok(node)
    }

    pub(crate) fn create_edge(
        &mut self,
        uri: Option<Uri>,
        type_uri: Uri,
        value: SimpleValue,
        role1: RoleModel,
        role2: RoleModel,
    ) -> Result<EdgeModel> {
        let id = self.assign_id();
        let uri = self.claim_uri(uri, id)?;
        let edge = EdgeModel {
            id,
            uri,
            type_uri,
            value,
            role1,
            role2,
        };
        self.edges.insert(id, edge.clone());
        Ok(edge)
    }

    /// Delete an edge, returning it. Its properties and URI claim go with it.
    pub(crate) fn delete_edge(&mut self, id: ObjectId) -> Result<EdgeModel> {
        let edge = self
            .edges
            .remove(&id)
            .ok_or(HolonError::ObjectNotFound(id))?;
        if let Some(uri) = &edge.uri {
            self.uri_index.remove(uri);
        }
        self.props.remove(&id);
        Ok(edge)
    }

    pub(crate) fn update_node_value(&mut self, id: ObjectId, value: SimpleValue) -> Result<NodeModel> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(HolonError::ObjectNotFound(id))?;
        node.value = value;
        Ok(node.clone())
    }

    pub(crate) fn update_edge_value(&mut self, id: ObjectId, value: SimpleValue) -> Result<EdgeModel> {
        let edge = self
            .edges
            .get_mut(&id)
            .ok_or(HolonError::ObjectNotFound(id))?;
        edge.value = value;
        Ok(edge.clone())
    }

    pub(crate) fn store_property(
        &mut self,
        id: ObjectId,
        key: &Uri,
        value: SimpleValue,
        index: bool,
    ) -> Result<PropEntry> {
        if !self.nodes.contains_key(&id) && !self.edges.contains_key(&id) {
            return Err(HolonError::ObjectNotFound(id));
        }
        let entry = PropEntry {
            value,
            indexed: index,
        };
        self.props
            .entry(id)
            .or_default()
            .insert(key.clone(), entry.clone());
        Ok(entry)
    }

    // -------------------------------------------------------------------------
    // Raw loading (persistence bootstrap)
    // -------------------------------------------------------------------------

    /// Insert a node as loaded from disk, preserving its id and URI claim.
    pub(crate) fn load_node(&mut self, node: NodeModel) {
        if let Some(uri) = &node.uri {
            self.uri_index.insert(uri.clone(), node.id);
        }
        if node.id.0 >= self.next_id {
            self.next_id = node.id.0.saturating_add(1);
        }
        self.nodes.insert(node.id, node);
    }

    /// Insert an edge as loaded from disk, preserving its id and URI claim.
    pub(crate) fn load_edge(&mut self, edge: EdgeModel) {
        if let Some(uri) = &edge.uri {
            self.uri_index.insert(uri.clone(), edge.id);
        }
        if edge.id.0 >= self.next_id {
            self.next_id = edge.id.0.saturating_add(1);
        }
        self.edges.insert(edge.id, edge);
    }

    /// Insert a property as loaded from disk.
    pub(crate) fn load_prop(&mut self, id: ObjectId, key: Uri, entry: PropEntry) {
        self.props.entry(id).or_default().insert(key, entry);
    }

    /// Restore the persisted id counter.
    pub(crate) fn set_next_id(&mut self, next_id: u64) {
        if next_id > self.next_id {
            self.next_id = next_id;
        }
    }
}
