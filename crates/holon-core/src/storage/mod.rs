//! # Storage Port
//!
//! The abstract storage operations the engine consumes: indexed CRUD over a
//! directed, typed graph of nodes and two-role hyper-edges, plus scoped
//! transactions.
//!
//! Two backends implement the port:
//! - [`MemGraph`] — in-memory, `BTreeMap`-based, snapshot transactions
//! - [`RedbGraph`] — disk-backed via redb, postcard row encoding
//!
//! Identifiers are assigned here, never by callers. URI uniqueness is
//! enforced globally, across nodes *and* edges.

mod memory;
mod redb_store;
mod state;

pub use memory::MemGraph;
pub use redb_store::RedbGraph;

use crate::error::Result;
use crate::model::{
    DbObject, EdgeModel, NodeModel, ObjectId, PlayerRef, RoleModel, SimpleValue, Uri,
};

// =============================================================================
// TRAVERSAL FILTER
// =============================================================================

/// Filter for relationship traversal.
///
/// All four fields are independently optional; `None` wildcards that
/// position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelatedFilter {
    /// Edge type.
    pub edge_type: Option<Uri>,
    /// Role type on this side.
    pub my_role: Option<Uri>,
    /// Role type on the other side.
    pub other_role: Option<Uri>,
    /// Type of the other node.
    pub other_type: Option<Uri>,
}

impl RelatedFilter {
    /// A filter matching every relationship.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict the edge type.
    #[must_use]
    pub fn edge_type(mut self, uri: impl Into<Uri>) -> Self {
        self.edge_type = Some(uri.into());
        self
    }

    /// Restrict the role type on this side.
    #[must_use]
    pub fn my_role(mut self, uri: impl Into<Uri>) -> Self {
        self.my_role = Some(uri.into());
        self
    }

    /// Restrict the role type on the other side.
    #[must_use]
    pub fn other_role(mut self, uri: impl Into<Uri>) -> Self {
        self.other_role = Some(uri.into());
        self
    }

    /// Restrict the type of the other node.
    #[must_use]
    pub fn other_type(mut self, uri: impl Into<Uri>) -> Self {
        self.other_type = Some(uri.into());
        self
    }
}

/// A node reached by traversal, together with the relating edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedNode {
    /// The node on the other side.
    pub node: NodeModel,
    /// The edge connecting it.
    pub edge: EdgeModel,
}

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// The storage operations the engine requires.
///
/// All fallible operations return `Result<T, HolonError>` so in-memory and
/// persistent backends are consumed uniformly.
pub trait GraphStore {
    /// Fetch a node by id.
    fn node(&self, id: ObjectId) -> Result<NodeModel>;

    /// Fetch an edge by id.
    fn edge(&self, id: ObjectId) -> Result<EdgeModel>;

    /// Fetch a node by URI, or `None`.
    fn node_by_uri(&self, uri: &Uri) -> Result<Option<NodeModel>>;

    /// Fetch an edge by URI, or `None`.
    fn edge_by_uri(&self, uri: &Uri) -> Result<Option<EdgeModel>>;

    /// Look up a single node by exact value.
    ///
    /// Returns `None` if no such node exists; fails with
    /// [`HolonError::Ambiguity`](crate::HolonError::Ambiguity) if more than
    /// one matches.
    fn node_by_value(&self, type_uri: &Uri, value: &SimpleValue) -> Result<Option<NodeModel>>;

    /// All nodes of a type with exactly the given value.
    fn nodes_by_value(&self, type_uri: &Uri, value: &SimpleValue) -> Result<Vec<NodeModel>>;

    /// Nodes related to a node or edge, with the relating edges.
    ///
    /// Results are in deterministic (node-id) order.
    fn related_nodes(&self, player: PlayerRef, filter: &RelatedFilter)
    -> Result<Vec<RelatedNode>>;

    /// The single edge of the given type between two players with the given
    /// role types, or `None`. Fails with `Ambiguity` on more than one.
    fn edge_between(
        &self,
        edge_type: &Uri,
        player1: PlayerRef,
        role1: &Uri,
        player2: PlayerRef,
        role2: &Uri,
    ) -> Result<Option<EdgeModel>>;

    /// Create a node. Storage assigns the id; fails with `DuplicateUri` if
    /// the URI is taken by any node or edge.
    fn create_node(
        &mut self,
        uri: Option<Uri>,
        type_uri: Uri,
        value: SimpleValue,
    ) -> Result<NodeModel>;

    /// Create an edge. Storage assigns the id; fails with `DuplicateUri` if
    /// the URI is taken by any node or edge.
    fn create_edge(
        &mut self,
        uri: Option<Uri>,
        type_uri: Uri,
        value: SimpleValue,
        role1: RoleModel,
        role2: RoleModel,
    ) -> Result<EdgeModel>;

    /// Delete an edge. Its players are untouched.
    fn delete_edge(&mut self, id: ObjectId) -> Result<()>;

    /// Update a node's value in place.
    fn update_node_value(&mut self, id: ObjectId, value: SimpleValue) -> Result<()>;

    /// Update an edge's value in place. Role bindings are never touched.
    fn update_edge_value(&mut self, id: ObjectId, value: SimpleValue) -> Result<()>;

    /// Store a property for a node or edge, optionally indexed.
    fn store_property(
        &mut self,
        id: ObjectId,
        key: &Uri,
        value: SimpleValue,
        index: bool,
    ) -> Result<()>;

    /// Read a property.
    fn property(&self, id: ObjectId, key: &Uri) -> Result<Option<SimpleValue>>;

    /// Nodes whose indexed property equals the given value.
    fn nodes_by_property(&self, key: &Uri, value: &SimpleValue) -> Result<Vec<NodeModel>>;

    /// Nodes whose indexed integer property lies in `from..=to`.
    fn nodes_by_property_range(&self, key: &Uri, from: i64, to: i64) -> Result<Vec<NodeModel>>;

    /// Open the scoped transaction. One top-level `unify()` call maps to
    /// exactly one transaction.
    fn begin(&mut self) -> Result<()>;

    /// Commit the scoped transaction.
    fn commit(&mut self) -> Result<()>;

    /// Roll the scoped transaction back, discarding every write since
    /// `begin()`.
    fn rollback(&mut self) -> Result<()>;

    /// Total number of nodes.
    fn node_count(&self) -> Result<usize>;

    /// Total number of edges.
    fn edge_count(&self) -> Result<usize>;

    // -------------------------------------------------------------------------
    // Provided lookups
    // -------------------------------------------------------------------------

    /// Fetch a node or edge by id.
    fn object(&self, id: ObjectId) -> Result<DbObject> {
        match self.node(id) {
            Ok(node) => Ok(DbObject::Node(node)),
            Err(_) => self.edge(id).map(DbObject::Edge),
        }
    }

    /// Fetch a node or edge by URI, or `None`.
    fn object_by_uri(&self, uri: &Uri) -> Result<Option<DbObject>> {
        if let Some(node) = self.node_by_uri(uri)? {
            return Ok(Some(DbObject::Node(node)));
        }
        Ok(self.edge_by_uri(uri)?.map(DbObject::Edge))
    }
}

// =============================================================================
// TESTS
// =============================================================================
