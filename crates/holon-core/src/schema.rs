//! # Type Model
//!
//! Schema types consumed by the engine: association definitions, type
//! definitions and the type registry.
//!
//! A type's association definitions are held as a plain ordered `Vec` —
//! sibling order is load-bearing. The engine processes a composite's
//! children in this order, never in input order.
//!
//! Definitions are immutable once registered.

use crate::error::{HolonError, Result};
use crate::model::Uri;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// ROLE-TYPE DEFAULTS
// =============================================================================

/// Default role type bound to the parent side of a child relationship.
pub const ROLE_WHOLE: &str = "holon.role.whole";

/// Default role type bound to the child side of a child relationship.
pub const ROLE_PART: &str = "holon.role.part";

// =============================================================================
// DEFINITION KIND
// =============================================================================

/// The kind of an association definition.
///
/// The instance-level edge type is derived deterministically from the kind;
/// there is no third kind. A persisted definition carrying any other kind
/// tag is a fatal configuration error (see [`DefKind::from_tag`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DefKind {
    /// Shared, reusable children.
    Aggregation,
    /// Exclusive children, owned by the parent.
    Composition,
}

impl DefKind {
    /// Parse a persisted kind tag.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "aggregation_def" => Ok(Self::Aggregation),
            "composition_def" => Ok(Self::Composition),
            other => Err(HolonError::Config(format!(
                "unexpected association-definition kind tag \"{other}\""
            ))),
        }
    }

    /// The edge type used for instances of this definition.
    #[must_use]
    pub fn instance_edge_type(self) -> Uri {
        match self {
            Self::Aggregation => Uri::new("holon.assoc.aggregation"),
            Self::Composition => Uri::new("holon.assoc.composition"),
        }
    }
}

// =============================================================================
// CARDINALITY / DATA KIND
// =============================================================================

/// How many children a definition may hold per parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// At most one child.
    One,
    /// Any number of children.
    Many,
}

/// A type's data kind, driving engine dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataKind {
    /// Instances hold a primitive value.
    Simple,
    /// Composite with no independent identity — a pure value object.
    CompositeValue,
    /// Composite addressable entity, matched via identity attributes.
    CompositeIdentity,
}

// =============================================================================
// VIEW CONFIGURATION
// =============================================================================

/// Opaque per-definition view settings.
///
/// Carried and persisted, never interpreted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ViewConfig(pub BTreeMap<String, String>);

impl ViewConfig {
    /// Create an empty view configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a setting.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up a setting.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

// =============================================================================
// ASSOCIATION DEFINITION
// =============================================================================

/// Schema element describing one child relationship slot of a composite
/// type: cardinality, role types, parent/child types, identity flag.
///
/// Belongs to exactly one owning type and is immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssocDef {
    /// The definition's name, unique among its siblings.
    pub name: Uri,
    /// Aggregation or composition.
    pub kind: DefKind,
    /// The owning (parent) type.
    pub parent_type: Uri,
    /// The child type.
    pub child_type: Uri,
    /// Role type bound to the parent player.
    pub parent_role: Uri,
    /// Role type bound to the child player.
    pub child_role: Uri,
    /// Parent-side cardinality.
    pub parent_cardinality: Cardinality,
    /// Child-side cardinality.
    pub child_cardinality: Cardinality,
    /// Whether this definition is part of the type's natural key.
    pub identity: bool,
    /// Opaque view settings.
    pub view_config: ViewConfig,
}

impl AssocDef {
    /// Create a definition with default roles (`whole`/`part`), parent
    /// cardinality `One` and no identity flag.
    #[must_use]
    pub fn new(
        name: impl Into<Uri>,
        kind: DefKind,
        parent_type: impl Into<Uri>,
        child_type: impl Into<Uri>,
        child_cardinality: Cardinality,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            parent_type: parent_type.into(),
            child_type: child_type.into(),
            parent_role: Uri::new(ROLE_WHOLE),
            child_role: Uri::new(ROLE_PART),
            parent_cardinality: Cardinality::One,
            child_cardinality,
            identity: false,
            view_config: ViewConfig::new(),
        }
    }

    /// Flag this definition as an identity attribute.
    #[must_use]
    pub const fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    /// Override the default role types.
    #[must_use]
    pub fn with_roles(mut self, parent_role: impl Into<Uri>, child_role: impl Into<Uri>) -> Self {
        self.parent_role = parent_role.into();
        self.child_role = child_role.into();
        self
    }

    /// Attach view settings.
    #[must_use]
    pub fn with_view_config(mut self, view_config: ViewConfig) -> Self {
        self.view_config = view_config;
        self
    }

    /// The edge type used for instances of this definition.
    #[must_use]
    pub fn instance_edge_type(&self) -> Uri {
        self.kind.instance_edge_type()
    }

    /// Whether the child side holds at most one child.
    #[must_use]
    pub const fn is_one(&self) -> bool {
        matches!(self.child_cardinality, Cardinality::One)
    }
}

// =============================================================================
// TYPE DEFINITION
// =============================================================================

/// A composite (or simple) type: data kind plus ordered child definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    /// The type's URI.
    pub uri: Uri,
    /// Dispatch tag.
    pub data_kind: DataKind,
    /// Ordered association definitions. Order is load-bearing.
    defs: Vec<AssocDef>,
}

impl TypeDef {
    /// Create a type with no definitions.
    #[must_use]
    pub fn new(uri: impl Into<Uri>, data_kind: DataKind) -> Self {
        Self {
            uri: uri.into(),
            data_kind,
            defs: Vec::new(),
        }
    }

    /// Append a definition. Order of calls fixes sibling order.
    ///
    /// Fails if a sibling with the same name exists already.
    pub fn with_def(mut self, def: AssocDef) -> Result<Self> {
        if self.def(&def.name).is_some() {
            return Err(HolonError::Config(format!(
                "type \"{}\" already has a definition \"{}\"",
                self.uri, def.name
            )));
        }
        self.defs.push(def);
        Ok(self)
    }

    /// Ordered iteration over the definitions.
    pub fn defs(&self) -> impl Iterator<Item = &AssocDef> {
        self.defs.iter()
    }

    /// Look up a definition by name.
    #[must_use]
    pub fn def(&self, name: &Uri) -> Option<&AssocDef> {
        self.defs.iter().find(|d| d.name == *name)
    }

    /// The identity attributes, in definition order.
    pub fn identity_defs(&self) -> impl Iterator<Item = &AssocDef> {
        self.defs.iter().filter(|d| d.identity)
    }

    /// Whether any definition is flagged as an identity attribute.
    #[must_use]
    pub fn has_identity_defs(&self) -> bool {
        self.defs.iter().any(|d| d.identity)
    }

    /// Whether this type's instances hold a primitive value.
    #[must_use]
    pub const fn is_simple(&self) -> bool {
        matches!(self.data_kind, DataKind::Simple)
    }

    /// Whether this type is a pure value type (no independent identity).
    #[must_use]
    pub const fn is_value_type(&self) -> bool {
        matches!(self.data_kind, DataKind::CompositeValue)
    }
}

// =============================================================================
// TYPE REGISTRY
// =============================================================================

/// The in-process type registry consumed by the engine.
///
/// Uses `BTreeMap` for deterministic ordering. Registered types are
/// immutable; re-registering a URI is a configuration error.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<Uri, TypeDef>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type.
    pub fn register(&mut self, type_def: TypeDef) -> Result<()> {
        if self.types.contains_key(&type_def.uri) {
            return Err(HolonError::Config(format!(
                "type \"{}\" is already registered",
                type_def.uri
            )));
        }
        self.types.insert(type_def.uri.clone(), type_def);
        Ok(())
    }

    /// Look up a type.
    pub fn type_def(&self, uri: &Uri) -> Result<&TypeDef> {
        self.types
            .get(uri)
            .ok_or_else(|| HolonError::UnknownType(uri.clone()))
    }

    /// Whether a type is registered.
    #[must_use]
    pub fn contains(&self, uri: &Uri) -> bool {
        self.types.contains_key(uri)
    }

    /// All registered types in deterministic order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }
}

// =============================================================================
// TESTS
// =============================================================================
