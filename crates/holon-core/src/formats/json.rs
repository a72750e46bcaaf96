//! # JSON Wire Format
//!
//! The JSON shape of a value tree is an object with the reserved keys
//! `"id"`, `"uri"`, `"type"` and `"value"`; every other key is an
//! association-definition name mapping to a child descriptor or an array of
//! them. A descriptor is one of:
//!
//! - a bare primitive — shorthand for `{"value": <primitive>}`, typed by
//!   the definition's child type
//! - an inline value tree (nested object)
//! - a reference: `{"ref_id": <id>}` or `{"ref_uri": "<uri>"}`
//! - a deletion marker: `{"delete_id": <id>}`
//!
//! A descriptor may carry `"edge"` — a value tree applied to the relating
//! edge's own value.
//!
//! A migration file is `{"types": [...], "objects": [...]}`; types are
//! registered first so the objects can be parsed against them.

use crate::error::{HolonError, Result};
use crate::model::{
    ChildModel, ChildSlot, ChildValues, DbObject, ObjectId, Payload, SimpleValue, UnifiedValue,
    UpdateModel, Uri,
};
use crate::schema::{AssocDef, Cardinality, DataKind, DefKind, TypeDef, TypeRegistry, ViewConfig};
use crate::storage::{GraphStore, RelatedFilter};
use crate::unify::ValueEngine;
use serde_json::{Map, Value as Json};

fn format_err(msg: impl Into<String>) -> HolonError {
    HolonError::Format(msg.into())
}

/// Keys that never name an association definition.
const RESERVED_KEYS: [&str; 5] = ["id", "uri", "type", "value", "edge"];

// =============================================================================
// PRIMITIVES
// =============================================================================

fn simple_value_from_json(json: &Json) -> Result<SimpleValue> {
    match json {
        Json::String(s) => Ok(SimpleValue::Text(s.clone())),
        Json::Number(n) => n
            .as_i64()
            .map(SimpleValue::Int)
            .ok_or_else(|| format_err(format!("non-integer number {n}"))),
        Json::Bool(b) => Ok(SimpleValue::Bool(*b)),
        other => Err(format_err(format!("expected a primitive, got {other}"))),
    }
}

fn id_from_json(json: &Json) -> Result<ObjectId> {
    json.as_u64()
        .map(ObjectId)
        .ok_or_else(|| format_err(format!("expected an id, got {json}")))
}

fn string_from_json(json: &Json, key: &str) -> Result<String> {
    json.as_str()
        .map(String::from)
        .ok_or_else(|| format_err(format!("expected a string for \"{key}\", got {json}")))
}

// =============================================================================
// VALUE TREES
// =============================================================================

/// Parse a top-level value tree. The `"type"` key is required; children are
/// typed against the registry.
pub fn value_tree_from_json(registry: &TypeRegistry, json: &Json) -> Result<UpdateModel> {
    let object = json
        .as_object()
        .ok_or_else(|| format_err(format!("expected a value tree object, got {json}")))?;
    let type_uri = object
        .get("type")
        .ok_or_else(|| format_err("value tree has no \"type\""))
        .and_then(|t| string_from_json(t, "type"))
        .map(Uri::new)?;
    tree_from_map(registry, object, type_uri)
}

/// Parse one child descriptor against its definition.
fn child_from_json(registry: &TypeRegistry, def: &AssocDef, json: &Json) -> Result<ChildModel> {
    // Bare primitive: shorthand for an inline simple value.
    let Some(map) = json.as_object() else {
        let value = simple_value_from_json(json)?;
        return Ok(ChildModel::new(UpdateModel::simple(
            def.child_type.clone(),
            value,
        )));
    };

    let value = if let Some(ref_id) = map.get("ref_id") {
        UpdateModel::ref_by_id(id_from_json(ref_id)?)
    } else if let Some(ref_uri) = map.get("ref_uri") {
        UpdateModel::ref_by_uri(string_from_json(ref_uri, "ref_uri")?)
    } else if let Some(delete_id) = map.get("delete_id") {
        UpdateModel::deletion(id_from_json(delete_id)?)
    } else {
        // Inline value tree; the type defaults to the definition's child type.
        let type_uri = match map.get("type") {
            Some(t) => Uri::new(string_from_json(t, "type")?),
            None => def.child_type.clone(),
        };
        tree_from_map(registry, map, type_uri)?
    };

    let mut child = ChildModel::new(value);
    if let Some(edge_json) = map.get("edge") {
        child = child.with_edge_value(edge_value_from_json(edge_json)?);
    }
    Ok(child)
}

/// Parse a relating-edge payload. The type may be omitted; the engine fills
/// it in from the edge being updated.
fn edge_value_from_json(json: &Json) -> Result<UpdateModel> {
    let (value, type_uri) = match json {
        Json::Object(map) => {
            let value = map
                .get("value")
                .ok_or_else(|| format_err("edge payload has no \"value\""))
                .and_then(simple_value_from_json)?;
            let type_uri = match map.get("type") {
                Some(t) => Some(Uri::new(string_from_json(t, "type")?)),
                None => None,
            };
            (value, type_uri)
        }
        primitive => (simple_value_from_json(primitive)?, None),
    };
    Ok(UpdateModel {
        id: None,
        uri: None,
        type_uri,
        payload: Payload::Simple(value),
    })
}

fn tree_from_map(
    registry: &TypeRegistry,
    map: &Map<String, Json>,
    type_uri: Uri,
) -> Result<UpdateModel> {
    let id = match map.get("id") {
        Some(id) => Some(id_from_json(id)?),
        None => None,
    };
    let uri = match map.get("uri") {
        Some(uri) => Some(Uri::new(string_from_json(uri, "uri")?)),
        None => None,
    };

    let def_entries: Vec<(&String, &Json)> = map
        .iter()
        .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
        .collect();

    let payload = if def_entries.is_empty() {
        let value = match map.get("value") {
            Some(value) => simple_value_from_json(value)?,
            None => SimpleValue::empty(),
        };
        Payload::Simple(value)
    } else {
        if map.contains_key("value") {
            return Err(format_err(format!(
                "value tree of type \"{type_uri}\" mixes \"value\" with child keys"
            )));
        }
        let type_def = registry.type_def(&type_uri)?;
        let mut children = ChildValues::new();
        for (key, child_json) in def_entries {
            let def_name = Uri::new(key.as_str());
            let Some(def) = type_def.def(&def_name) else {
                // Foreign keys are ignored, mirroring the engine.
                continue;
            };
            let slot = match child_json {
                Json::Array(items) => {
                    let mut list = Vec::with_capacity(items.len());
                    for item in items {
                        list.push(child_from_json(registry, def, item)?);
                    }
                    ChildSlot::Many(list)
                }
                single => ChildSlot::One(child_from_json(registry, def, single)?),
            };
            children.0.insert(def_name, slot);
        }
        Payload::Composite(children)
    };

    Ok(UpdateModel {
        id,
        uri,
        type_uri: Some(type_uri),
        payload,
    })
}

// =============================================================================
// TYPE DEFINITIONS
// =============================================================================

/// Parse a type definition.
///
/// The child cardinality is required unless the definition is a
/// composition, where it defaults to "one".
pub fn type_def_from_json(json: &Json) -> Result<TypeDef> {
    let map = json
        .as_object()
        .ok_or_else(|| format_err(format!("expected a type definition object, got {json}")))?;
    let uri = map
        .get("uri")
        .ok_or_else(|| format_err("type definition has no \"uri\""))
        .and_then(|u| string_from_json(u, "uri"))?;
    let data_kind = match map
        .get("data")
        .ok_or_else(|| format_err(format!("type \"{uri}\" has no \"data\" kind")))
        .and_then(|d| string_from_json(d, "data"))?
        .as_str()
    {
        "simple" => DataKind::Simple,
        "composite_value" => DataKind::CompositeValue,
        "composite_identity" => DataKind::CompositeIdentity,
        other => {
            return Err(HolonError::Config(format!(
                "unexpected data kind \"{other}\" for type \"{uri}\""
            )));
        }
    };

    let mut type_def = TypeDef::new(uri.as_str(), data_kind);
    if let Some(defs) = map.get("defs") {
        let defs = defs
            .as_array()
            .ok_or_else(|| format_err(format!("\"defs\" of type \"{uri}\" is not an array")))?;
        for def_json in defs {
            type_def = type_def.with_def(assoc_def_from_json(&uri, def_json)?)?;
        }
    }
    Ok(type_def)
}

fn assoc_def_from_json(parent_type: &str, json: &Json) -> Result<AssocDef> {
    let map = json
        .as_object()
        .ok_or_else(|| format_err(format!("expected a definition object, got {json}")))?;
    let name = map
        .get("name")
        .ok_or_else(|| format_err(format!("definition of \"{parent_type}\" has no \"name\"")))
        .and_then(|n| string_from_json(n, "name"))?;
    let kind = map
        .get("kind")
        .ok_or_else(|| format_err(format!("definition \"{name}\" has no \"kind\"")))
        .and_then(|k| string_from_json(k, "kind"))
        .and_then(|k| DefKind::from_tag(&k))?;
    let child_type = map
        .get("child_type")
        .map(|c| string_from_json(c, "child_type"))
        .transpose()?
        .unwrap_or_else(|| name.clone());
    let cardinality = match map.get("cardinality") {
        Some(c) => match string_from_json(c, "cardinality")?.as_str() {
            "one" => Cardinality::One,
            "many" => Cardinality::Many,
            other => {
                return Err(HolonError::Config(format!(
                    "unexpected cardinality \"{other}\" in definition \"{name}\""
                )));
            }
        },
        None if kind == DefKind::Composition => Cardinality::One,
        None => {
            return Err(HolonError::Config(format!(
                "definition \"{name}\" has no \"cardinality\""
            )));
        }
    };

    let mut def = AssocDef::new(name.as_str(), kind, parent_type, child_type.as_str(), cardinality);
    if map.get("identity").and_then(Json::as_bool) == Some(true) {
        def = def.identity();
    }
    if let (Some(parent_role), Some(child_role)) = (map.get("parent_role"), map.get("child_role")) {
        def = def.with_roles(
            string_from_json(parent_role, "parent_role")?,
            string_from_json(child_role, "child_role")?,
        );
    }
    if let Some(view_json) = map.get("view_config") {
        let view_map = view_json
            .as_object()
            .ok_or_else(|| format_err(format!("\"view_config\" of \"{name}\" is not an object")))?;
        let mut view_config = ViewConfig::new();
        for (key, value) in view_map {
            view_config = view_config.set(key.as_str(), string_from_json(value, key)?);
        }
        def = def.with_view_config(view_config);
    }
    Ok(def)
}

// =============================================================================
// MIGRATIONS
// =============================================================================

/// Parse a migration file: register its types, return its objects.
pub fn parse_migration(registry: &mut TypeRegistry, json: &Json) -> Result<Vec<UpdateModel>> {
    let map = json
        .as_object()
        .ok_or_else(|| format_err(format!("expected a migration object, got {json}")))?;
    if let Some(types) = map.get("types") {
        let types = types
            .as_array()
            .ok_or_else(|| format_err("\"types\" is not an array"))?;
        for type_json in types {
            registry.register(type_def_from_json(type_json)?)?;
        }
    }
    let mut objects = Vec::new();
    if let Some(trees) = map.get("objects") {
        let trees = trees
            .as_array()
            .ok_or_else(|| format_err("\"objects\" is not an array"))?;
        for tree in trees {
            objects.push(value_tree_from_json(registry, tree)?);
        }
    }
    Ok(objects)
}

/// Parse and apply a migration file. Each top-level object is one atomic
/// unification call.
pub fn run_migration<S: GraphStore>(
    store: &mut S,
    registry: &mut TypeRegistry,
    json: &Json,
) -> Result<Vec<UnifiedValue>> {
    let objects = parse_migration(registry, json)?;
    let mut unified = Vec::with_capacity(objects.len());
    let mut engine = ValueEngine::new(store, registry);
    for model in &objects {
        unified.push(engine.unify(model, None)?);
    }
    Ok(unified)
}

// =============================================================================
// READ-SIDE RENDERING
// =============================================================================

/// Render a stored object with its children as JSON, recursing up to
/// `depth` levels of composite nesting.
pub fn object_to_json(
    store: &dyn GraphStore,
    registry: &TypeRegistry,
    object: &DbObject,
    depth: usize,
) -> Result<Json> {
    let mut map = Map::new();
    map.insert("id".to_string(), Json::from(object.id().0));
    match object {
        DbObject::Node(node) => {
            if let Some(uri) = &node.uri {
                map.insert("uri".to_string(), Json::String(uri.as_str().to_string()));
            }
        }
        DbObject::Edge(edge) => {
            if let Some(uri) = &edge.uri {
                map.insert("uri".to_string(), Json::String(uri.as_str().to_string()));
            }
        }
    }
    map.insert(
        "type".to_string(),
        Json::String(object.type_uri().as_str().to_string()),
    );
    if !object.value().is_empty() {
        map.insert("value".to_string(), simple_value_to_json(object.value()));
    }

    if depth > 0 {
        if let Ok(type_def) = registry.type_def(object.type_uri()) {
            for def in type_def.defs() {
                let children = store.related_nodes(
                    object.player_ref(),
                    &RelatedFilter::any()
                        .edge_type(def.instance_edge_type())
                        .my_role(def.parent_role.clone())
                        .other_role(def.child_role.clone())
                        .other_type(def.child_type.clone()),
                )?;
                if children.is_empty() {
                    continue;
                }
                let mut rendered = Vec::with_capacity(children.len());
                for child in &children {
                    rendered.push(object_to_json(
                        store,
                        registry,
                        &DbObject::Node(child.node.clone()),
                        depth - 1,
                    )?);
                }
                let value = if def.is_one() {
                    rendered.remove(0)
                } else {
                    Json::Array(rendered)
                };
                map.insert(def.name.as_str().to_string(), value);
            }
        }
    }
    Ok(Json::Object(map))
}

fn simple_value_to_json(value: &SimpleValue) -> Json {
    match value {
        SimpleValue::Text(s) => Json::String(s.clone()),
        SimpleValue::Int(i) => Json::from(*i),
        SimpleValue::Bool(b) => Json::Bool(*b),
    }
}

// =============================================================================
// TESTS
// =============================================================================
