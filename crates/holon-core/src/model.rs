//! # Core Data Model
//!
//! This module contains the data types the engine operates on:
//! - Identifiers (`ObjectId`, `Uri`)
//! - Primitive payloads (`SimpleValue`)
//! - Stored objects (`NodeModel`, `EdgeModel`, `RoleModel`, `DbObject`)
//! - Update input (`UpdateModel`, `Payload`, `ChildValues`)
//! - Unification output (`UnifiedValue`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Carry ids assigned exclusively by the storage layer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier for a stored object.
///
/// Nodes and edges share one id space. Ids are assigned exclusively by the
/// storage layer and are immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A URI-style name.
///
/// Used for object URIs (globally unique across nodes and edges), type URIs,
/// role-type URIs and association-definition names alike.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Uri(pub String);

impl Uri {
    /// Create a new URI from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the URI as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this URI is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uri {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Uri {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// SIMPLE VALUES
// =============================================================================

/// A primitive value held by a node or an edge.
///
/// Equality is exact-match, not fuzzy. The empty text value is the canonical
/// "empty" payload; for nodes it means "nothing to update".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SimpleValue {
    /// UTF-8 text.
    Text(String),
    /// Signed integer.
    Int(i64),
    /// Boolean.
    Bool(bool),
}

impl SimpleValue {
    /// Create a text value.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// The canonical empty value.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Text(String::new())
    }

    /// Check whether this is the empty text value.
    ///
    /// Ints and bools are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }
}

impl Default for SimpleValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for SimpleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for SimpleValue {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for SimpleValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for SimpleValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for SimpleValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

// =============================================================================
// STORED OBJECTS
// =============================================================================

/// Reference to a role player: a node or another edge (hyper-edges).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlayerRef {
    /// A node plays the role.
    Node(ObjectId),
    /// An edge plays the role.
    Edge(ObjectId),
}

impl PlayerRef {
    /// The player's id, regardless of kind.
    #[must_use]
    pub const fn id(self) -> ObjectId {
        match self {
            Self::Node(id) | Self::Edge(id) => id,
        }
    }
}

/// One of an edge's two typed role slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleModel {
    /// The player bound to this slot. Frozen once the edge is created.
    pub player: PlayerRef,
    /// The role-type URI.
    pub role_type: Uri,
}

impl RoleModel {
    /// Create a new role slot.
    #[must_use]
    pub fn new(player: PlayerRef, role_type: impl Into<Uri>) -> Self {
        Self {
            player,
            role_type: role_type.into(),
        }
    }
}

/// A stored node ("topic").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeModel {
    /// Immutable id, assigned by storage.
    pub id: ObjectId,
    /// Optional URI, globally unique across nodes and edges.
    pub uri: Option<Uri>,
    /// The node's type.
    pub type_uri: Uri,
    /// The node's simple value.
    pub value: SimpleValue,
}

/// A stored edge ("association"): a typed hyper-edge with two role slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeModel {
    /// Immutable id, assigned by storage.
    pub id: ObjectId,
    /// Optional URI, globally unique across nodes and edges.
    pub uri: Option<Uri>,
    /// The edge's type.
    pub type_uri: Uri,
    /// The edge's own value (may be empty).
    pub value: SimpleValue,
    /// First role slot.
    pub role1: RoleModel,
    /// Second role slot.
    pub role2: RoleModel,
}

impl EdgeModel {
    /// The player bound under the given role type, if any.
    #[must_use]
    pub fn player(&self, role_type: &Uri) -> Option<PlayerRef> {
        if self.role1.role_type == *role_type {
            Some(self.role1.player)
        } else if self.role2.role_type == *role_type {
            Some(self.role2.player)
        } else {
            None
        }
    }
}

/// A stored object: node or edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DbObject {
    /// A node.
    Node(NodeModel),
    /// An edge.
    Edge(EdgeModel),
}

impl DbObject {
    /// The object's id.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Node(n) => n.id,
            Self::Edge(e) => e.id,
        }
    }

    /// The object's type URI.
    #[must_use]
    pub fn type_uri(&self) -> &Uri {
        match self {
            Self::Node(n) => &n.type_uri,
            Self::Edge(e) => &e.type_uri,
        }
    }

    /// The object's simple value.
    #[must_use]
    pub fn value(&self) -> &SimpleValue {
        match self {
            Self::Node(n) => &n.value,
            Self::Edge(e) => &e.value,
        }
    }

    /// A player reference to this object.
    #[must_use]
    pub fn player_ref(&self) -> PlayerRef {
        match self {
            Self::Node(n) => PlayerRef::Node(n.id),
            Self::Edge(e) => PlayerRef::Edge(e.id),
        }
    }

    /// Whether this object is an edge.
    #[must_use]
    pub const fn is_edge(&self) -> bool {
        matches!(self, Self::Edge(_))
    }
}

// =============================================================================
// UPDATE MODEL (engine input)
// =============================================================================

/// Reference to an existing object, by id or by URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectRef {
    /// Reference by id.
    ById(ObjectId),
    /// Reference by URI. The empty URI denotes an empty reference.
    ByUri(Uri),
}

impl ObjectRef {
    /// An empty reference resolves to nothing instead of an object.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::ByUri(uri) if uri.is_empty())
    }
}

/// The payload of an update model, resolved once at entry.
///
/// Variant dispatch replaces run-time type inspection: the engine branches
/// on this tag exactly once per recursive call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Reference an existing object; no unification logic applies.
    Ref(ObjectRef),
    /// Deletion marker: "remove this child".
    Deletion,
    /// A primitive value.
    Simple(SimpleValue),
    /// An ordered mapping from association-definition name to child values.
    Composite(ChildValues),
}

/// A value tree describing a node's or edge's desired state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateModel {
    /// Pre-update identity, used for diffing cardinality-"many" children.
    pub id: Option<ObjectId>,
    /// URI to assign on create.
    pub uri: Option<Uri>,
    /// The subject's type. Required except for references and deletions.
    pub type_uri: Option<Uri>,
    /// What to integrate.
    pub payload: Payload,
}

impl UpdateModel {
    /// A reference by id.
    #[must_use]
    pub fn ref_by_id(id: ObjectId) -> Self {
        Self {
            id: Some(id),
            uri: None,
            type_uri: None,
            payload: Payload::Ref(ObjectRef::ById(id)),
        }
    }

    /// A reference by URI.
    #[must_use]
    pub fn ref_by_uri(uri: impl Into<Uri>) -> Self {
        Self {
            id: None,
            uri: None,
            type_uri: None,
            payload: Payload::Ref(ObjectRef::ByUri(uri.into())),
        }
    }

    /// A deletion marker for the child with the given id.
    #[must_use]
    pub fn deletion(id: ObjectId) -> Self {
        Self {
            id: Some(id),
            uri: None,
            type_uri: None,
            payload: Payload::Deletion,
        }
    }

    /// A simple value of the given type.
    #[must_use]
    pub fn simple(type_uri: impl Into<Uri>, value: impl Into<SimpleValue>) -> Self {
        Self {
            id: None,
            uri: None,
            type_uri: Some(type_uri.into()),
            payload: Payload::Simple(value.into()),
        }
    }

    /// A composite value of the given type.
    #[must_use]
    pub fn composite(type_uri: impl Into<Uri>, children: ChildValues) -> Self {
        Self {
            id: None,
            uri: None,
            type_uri: Some(type_uri.into()),
            payload: Payload::Composite(children),
        }
    }

    /// Set the pre-update id.
    #[must_use]
    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the URI to assign on create.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<Uri>) -> Self {
        self.uri = Some(uri.into());
        self
    }
}

/// One child descriptor: the child's value tree plus an optional value tree
/// for the relating edge's own value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildModel {
    /// The child's own value.
    pub value: UpdateModel,
    /// Value to apply to the relating edge. Role bindings are never part of
    /// this; roles are frozen once the edge is created.
    pub edge_value: Option<UpdateModel>,
}

impl ChildModel {
    /// Wrap a child value with no relating-edge payload.
    #[must_use]
    pub const fn new(value: UpdateModel) -> Self {
        Self {
            value,
            edge_value: None,
        }
    }

    /// Attach a relating-edge value.
    #[must_use]
    pub fn with_edge_value(mut self, edge_value: UpdateModel) -> Self {
        self.edge_value = Some(edge_value);
        self
    }
}

impl From<UpdateModel> for ChildModel {
    fn from(value: UpdateModel) -> Self {
        Self::new(value)
    }
}

/// Either a single child or a list of them, per the definition's cardinality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildSlot {
    /// Cardinality "one".
    One(ChildModel),
    /// Cardinality "many".
    Many(Vec<ChildModel>),
}

/// Ordered mapping from association-definition name to child values.
///
/// Input order is irrelevant: the engine processes children in the *type's*
/// definition order. Keys with no matching definition are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChildValues(pub BTreeMap<Uri, ChildSlot>);

impl ChildValues {
    /// Create an empty child map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cardinality-"one" child.
    #[must_use]
    pub fn set(mut self, def: impl Into<Uri>, child: impl Into<ChildModel>) -> Self {
        self.0.insert(def.into(), ChildSlot::One(child.into()));
        self
    }

    /// Append to a cardinality-"many" child list.
    #[must_use]
    pub fn add(mut self, def: impl Into<Uri>, child: impl Into<ChildModel>) -> Self {
        match self.0.entry(def.into()).or_insert_with(|| ChildSlot::Many(Vec::new())) {
            ChildSlot::Many(list) => list.push(child.into()),
            // A previous set() on the same key is replaced by a list.
            slot @ ChildSlot::One(_) => {
                let prev = std::mem::replace(slot, ChildSlot::Many(Vec::new()));
                if let (ChildSlot::One(c), ChildSlot::Many(list)) = (prev, slot) {
                    list.push(c);
                    list.push(child.into());
                }
            }
        }
        self
    }

    /// The slot supplied for a definition, if any.
    #[must_use]
    pub fn get(&self, def: &Uri) -> Option<&ChildSlot> {
        self.0.get(def)
    }

    /// Whether no children are supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// UNIFIED VALUE (engine output)
// =============================================================================

/// Transient result of one unification call.
///
/// Carries the resolved object (or nothing) plus the update model's
/// pre-unification id, needed when diffing cardinality-"many" children.
/// Never persisted; lives only for the duration of one top-level update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedValue {
    /// The resolved node or edge; `None` if there was nothing to update.
    pub value: Option<DbObject>,
    /// The update model's id before unification.
    pub original_id: Option<ObjectId>,
}

impl UnifiedValue {
    /// An empty result.
    #[must_use]
    pub const fn none(original_id: Option<ObjectId>) -> Self {
        Self {
            value: None,
            original_id,
        }
    }

    /// A resolved result.
    #[must_use]
    pub const fn some(value: DbObject, original_id: Option<ObjectId>) -> Self {
        Self {
            value: Some(value),
            original_id,
        }
    }

    /// The resolved object's id, if any.
    #[must_use]
    pub fn id(&self) -> Option<ObjectId> {
        self.value.as_ref().map(DbObject::id)
    }

    /// Whether the call resolved to a concrete object.
    #[must_use]
    pub const fn is_some(&self) -> bool {
        self.value.is_some()
    }
}

// =============================================================================
// TESTS
// =============================================================================
