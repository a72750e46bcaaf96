//! # Unification Acceptance Tests
//!
//! End-to-end properties of the value-unification engine, exercised through
//! the public API against both storage backends.

use holon_core::{
    AssocDef, Cardinality, ChildValues, DataKind, DbObject, DefKind, GraphStore, HolonError,
    MemGraph, ObjectId, PlayerRef, RedbGraph, RelatedFilter, RoleModel, SimpleValue, TypeDef,
    TypeRegistry, UpdateModel, Uri, ValueEngine,
};

// =============================================================================
// FIXTURES
// =============================================================================

fn simple_type(uri: &str) -> TypeDef {
    TypeDef::new(uri, DataKind::Simple)
}

/// `ex.person`: identity attribute `ex.email`, plain child `ex.name`.
fn person_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register(
            TypeDef::new("ex.person", DataKind::CompositeIdentity)
                .with_def(
                    AssocDef::new(
                        "ex.email",
                        DefKind::Composition,
                        "ex.person",
                        "ex.email",
                        Cardinality::One,
                    )
                    .identity(),
                )
                .expect("def")
                .with_def(AssocDef::new(
                    "ex.name",
                    DefKind::Composition,
                    "ex.person",
                    "ex.name",
                    Cardinality::One,
                ))
                .expect("def"),
        )
        .expect("register");
    registry.register(simple_type("ex.email")).expect("register");
    registry.register(simple_type("ex.name")).expect("register");
    registry
}

fn person(email: &str, name: &str) -> UpdateModel {
    UpdateModel::composite(
        "ex.person",
        ChildValues::new()
            .set("ex.email", UpdateModel::simple("ex.email", email))
            .set("ex.name", UpdateModel::simple("ex.name", name)),
    )
}

/// Children of `parent` under a definition, as (node id, edge id) pairs.
fn children_under(
    store: &impl GraphStore,
    parent: ObjectId,
    def_kind: DefKind,
    child_type: &str,
) -> Vec<(ObjectId, ObjectId)> {
    store
        .related_nodes(
            PlayerRef::Node(parent),
            &RelatedFilter::any()
                .edge_type(def_kind.instance_edge_type())
                .my_role("holon.role.whole")
                .other_role("holon.role.part")
                .other_type(child_type),
        )
        .expect("related")
        .into_iter()
        .map(|r| (r.node.id, r.edge.id))
        .collect()
}

// =============================================================================
// FIND-OR-CREATE PROPERTIES
// =============================================================================

#[test]
fn idempotence_second_call_creates_nothing() {
    let mut store = MemGraph::new();
    let registry = person_registry();
    let mut engine = ValueEngine::new(&mut store, &registry);

    let model = person("a@b.com", "Ada");
    let first = engine.unify(&model, None).expect("unify");
    let nodes_after_first = store.node_count().expect("count");
    let edges_after_first = store.edge_count().expect("count");

    let mut engine = ValueEngine::new(&mut store, &registry);
    let second = engine.unify(&model, None).expect("unify");

    assert_eq!(first.id(), second.id());
    assert_eq!(store.node_count().expect("count"), nodes_after_first);
    assert_eq!(store.edge_count().expect("count"), edges_after_first);
}

#[test]
fn round_trip_identity_resolves_to_same_id() {
    let mut store = MemGraph::new();
    let registry = person_registry();
    let mut engine = ValueEngine::new(&mut store, &registry);

    let created = engine
        .unify(&person("a@b.com", "Ada"), None)
        .expect("unify");

    // Unifying on the identity attribute alone finds the same node.
    let looked_up = engine
        .unify(
            &UpdateModel::composite(
                "ex.person",
                ChildValues::new().set("ex.email", UpdateModel::simple("ex.email", "a@b.com")),
            ),
            None,
        )
        .expect("unify");
    assert_eq!(created.id(), looked_up.id());
}

#[test]
fn no_identity_type_never_deduplicates() {
    let mut store = MemGraph::new();
    let mut registry = TypeRegistry::new();
    registry
        .register(
            TypeDef::new("ex.note", DataKind::CompositeIdentity)
                .with_def(AssocDef::new(
                    "ex.text",
                    DefKind::Composition,
                    "ex.note",
                    "ex.text",
                    Cardinality::One,
                ))
                .expect("def"),
        )
        .expect("register");
    registry.register(simple_type("ex.text")).expect("register");

    let model = UpdateModel::composite(
        "ex.note",
        ChildValues::new().set("ex.text", UpdateModel::simple("ex.text", "same")),
    );
    let mut engine = ValueEngine::new(&mut store, &registry);
    let first = engine.unify(&model, None).expect("unify");
    let second = engine.unify(&model, None).expect("unify");

    // Two structurally identical composites, two distinct nodes.
    assert_ne!(first.id(), second.id());
    // The simple child is still shared.
    assert_eq!(
        store
            .nodes_by_value(&Uri::new("ex.text"), &SimpleValue::text("same"))
            .expect("lookup")
            .len(),
        1
    );
}

#[test]
fn identity_reuse_updates_name_in_place() {
    let mut store = MemGraph::new();
    let registry = person_registry();
    let mut engine = ValueEngine::new(&mut store, &registry);

    let first = engine.unify(&person("a@b.com", "X"), None).expect("unify");
    let second = engine.unify(&person("a@b.com", "Y"), None).expect("unify");
    assert_eq!(first.id(), second.id());

    let person_id = first.id().expect("id");
    let names = children_under(&store, person_id, DefKind::Composition, "ex.name");
    // Exactly one name relationship, pointing at "Y".
    assert_eq!(names.len(), 1);
    let name_node = store.node(names[0].0).expect("fetch");
    assert_eq!(name_node.value, SimpleValue::text("Y"));
}

#[test]
fn ambiguity_when_candidates_cannot_be_narrowed() {
    let mut store = MemGraph::new();
    let mut registry = TypeRegistry::new();
    registry
        .register(
            TypeDef::new("ex.pair", DataKind::CompositeValue)
                .with_def(AssocDef::new(
                    "ex.a",
                    DefKind::Aggregation,
                    "ex.pair",
                    "ex.a",
                    Cardinality::One,
                ))
                .expect("def")
                .with_def(AssocDef::new(
                    "ex.b",
                    DefKind::Aggregation,
                    "ex.pair",
                    "ex.b",
                    Cardinality::One,
                ))
                .expect("def"),
        )
        .expect("register");
    registry.register(simple_type("ex.a")).expect("register");
    registry.register(simple_type("ex.b")).expect("register");

    // Two existing parents share identical children under both definitions.
    let child_a = store
        .create_node(None, Uri::new("ex.a"), SimpleValue::text("va"))
        .expect("create");
    let child_b = store
        .create_node(None, Uri::new("ex.b"), SimpleValue::text("vb"))
        .expect("create");
    for _ in 0..2 {
        let parent = store
            .create_node(None, Uri::new("ex.pair"), SimpleValue::empty())
            .expect("create");
        for child in [&child_a, &child_b] {
            store
                .create_edge(
                    None,
                    Uri::new("holon.assoc.aggregation"),
                    SimpleValue::empty(),
                    RoleModel::new(PlayerRef::Node(parent.id), "holon.role.whole"),
                    RoleModel::new(PlayerRef::Node(child.id), "holon.role.part"),
                )
                .expect("edge");
        }
    }

    // Unifying on ex.a alone cannot tell the parents apart.
    let mut engine = ValueEngine::new(&mut store, &registry);
    let result = engine.unify(
        &UpdateModel::composite(
            "ex.pair",
            ChildValues::new().set("ex.a", UpdateModel::simple("ex.a", "va")),
        ),
        None,
    );
    match result {
        Err(HolonError::Ambiguity { candidates, .. }) => assert_eq!(candidates.len(), 2),
        other => unreachable!("expected ambiguity, got {other:?}"),
    }
}

#[test]
fn many_cardinality_diff_is_stable() {
    let mut store = MemGraph::new();
    let mut registry = TypeRegistry::new();
    registry
        .register(
            TypeDef::new("ex.list", DataKind::CompositeIdentity)
                .with_def(
                    AssocDef::new(
                        "ex.title",
                        DefKind::Composition,
                        "ex.list",
                        "ex.title",
                        Cardinality::One,
                    )
                    .identity(),
                )
                .expect("def")
                .with_def(AssocDef::new(
                    "ex.item",
                    DefKind::Aggregation,
                    "ex.list",
                    "ex.item",
                    Cardinality::Many,
                ))
                .expect("def"),
        )
        .expect("register");
    registry.register(simple_type("ex.title")).expect("register");
    registry.register(simple_type("ex.item")).expect("register");

    let mut engine = ValueEngine::new(&mut store, &registry);
    let created = engine
        .unify(
            &UpdateModel::composite(
                "ex.list",
                ChildValues::new()
                    .set("ex.title", UpdateModel::simple("ex.title", "todo"))
                    .add("ex.item", UpdateModel::simple("ex.item", "one"))
                    .add("ex.item", UpdateModel::simple("ex.item", "two"))
                    .add("ex.item", UpdateModel::simple("ex.item", "three")),
            ),
            None,
        )
        .expect("unify");
    let list = created.value.expect("resolved");

    let before = children_under(&store, list.id(), DefKind::Aggregation, "ex.item");
    assert_eq!(before.len(), 3);
    let two_value = SimpleValue::text("two");
    let (kept, dropped): (Vec<(ObjectId, ObjectId)>, Vec<(ObjectId, ObjectId)>) =
        before.iter().copied().partition(|(node_id, _)| {
            store.node(*node_id).expect("fetch").value != two_value
        });
    assert_eq!(dropped.len(), 1);

    // Keep "one" and "three" by their pre-update ids, add a new element.
    let mut engine = ValueEngine::new(&mut store, &registry);
    let update = UpdateModel::composite(
        "ex.list",
        ChildValues::new()
            .add("ex.item", UpdateModel::ref_by_id(kept[0].0))
            .add("ex.item", UpdateModel::ref_by_id(kept[1].0))
            .add("ex.item", UpdateModel::simple("ex.item", "four")),
    );
    engine.unify(&update, Some(&list)).expect("unify");

    let after = children_under(&store, list.id(), DefKind::Aggregation, "ex.item");
    assert_eq!(after.len(), 3);
    // The kept elements' relationships were not deleted and recreated.
    for kept_pair in &kept {
        assert!(after.contains(kept_pair));
    }
    // The dropped element's relationship is gone.
    assert!(!after.iter().any(|(node_id, _)| *node_id == dropped[0].0));
    assert!(!after.iter().any(|(_, edge_id)| *edge_id == dropped[0].1));
    // One new relationship exists.
    let four = store
        .node_by_value(&Uri::new("ex.item"), &SimpleValue::text("four"))
        .expect("lookup")
        .expect("created");
    assert!(after.iter().any(|(node_id, _)| *node_id == four.id));
}

#[test]
fn simple_values_are_shared_between_parents() {
    let mut store = MemGraph::new();
    let mut registry = TypeRegistry::new();
    registry
        .register(
            TypeDef::new("ex.shape", DataKind::CompositeIdentity)
                .with_def(AssocDef::new(
                    "ex.color",
                    DefKind::Aggregation,
                    "ex.shape",
                    "ex.color",
                    Cardinality::One,
                ))
                .expect("def"),
        )
        .expect("register");
    registry.register(simple_type("ex.color")).expect("register");

    let model = UpdateModel::composite(
        "ex.shape",
        ChildValues::new().set("ex.color", UpdateModel::simple("ex.color", "red")),
    );
    let mut engine = ValueEngine::new(&mut store, &registry);
    let first = engine.unify(&model, None).expect("unify");
    let second = engine.unify(&model, None).expect("unify");
    // No identity attributes: two distinct shapes...
    assert_ne!(first.id(), second.id());

    // ...but exactly one "red" node, referenced by both.
    let reds = store
        .nodes_by_value(&Uri::new("ex.color"), &SimpleValue::text("red"))
        .expect("lookup");
    assert_eq!(reds.len(), 1);
    let parents = store
        .related_nodes(
            PlayerRef::Node(reds[0].id),
            &RelatedFilter::any()
                .my_role("holon.role.part")
                .other_role("holon.role.whole")
                .other_type("ex.shape"),
        )
        .expect("related");
    assert_eq!(parents.len(), 2);
}

// =============================================================================
// DELETION & RELATING-EDGE BEHAVIOR
// =============================================================================

#[test]
fn deletion_marker_removes_one_cardinality_child() {
    let mut store = MemGraph::new();
    let registry = person_registry();
    let mut engine = ValueEngine::new(&mut store, &registry);

    let created = engine
        .unify(&person("a@b.com", "Ada"), None)
        .expect("unify");
    let person_id = created.id().expect("id");
    let names = children_under(&store, person_id, DefKind::Composition, "ex.name");
    assert_eq!(names.len(), 1);

    let mut engine = ValueEngine::new(&mut store, &registry);
    engine
        .unify(
            &UpdateModel::composite(
                "ex.person",
                ChildValues::new()
                    .set("ex.email", UpdateModel::simple("ex.email", "a@b.com"))
                    .set("ex.name", UpdateModel::deletion(names[0].0)),
            ),
            None,
        )
        .expect("unify");

    let names = children_under(&store, person_id, DefKind::Composition, "ex.name");
    assert!(names.is_empty());
    // The name node itself is untouched; only the relationship is gone.
    assert_eq!(
        store
            .nodes_by_value(&Uri::new("ex.name"), &SimpleValue::text("Ada"))
            .expect("lookup")
            .len(),
        1
    );
}

#[test]
fn relating_edge_value_updates_without_rewriting_roles() {
    let mut store = MemGraph::new();
    let registry = person_registry();

    let tagged_name = |name: &str, edge_value: &str| {
        UpdateModel::composite(
            "ex.person",
            ChildValues::new()
                .set("ex.email", UpdateModel::simple("ex.email", "a@b.com"))
                .set(
                    "ex.name",
                    holon_core::ChildModel::new(UpdateModel::simple("ex.name", name))
                        .with_edge_value(UpdateModel::simple(
                            "holon.assoc.composition",
                            edge_value,
                        )),
                ),
        )
    };

    let mut engine = ValueEngine::new(&mut store, &registry);
    let created = engine.unify(&tagged_name("Ada", "maiden"), None).expect("unify");
    let person_id = created.id().expect("id");

    let names = children_under(&store, person_id, DefKind::Composition, "ex.name");
    let first_edge = store.edge(names[0].1).expect("fetch");
    assert_eq!(first_edge.value, SimpleValue::text("maiden"));

    // Same child, new edge value: the relationship is retained and its own
    // value updated in place.
    let mut engine = ValueEngine::new(&mut store, &registry);
    engine.unify(&tagged_name("Ada", "legal"), None).expect("unify");

    let names = children_under(&store, person_id, DefKind::Composition, "ex.name");
    assert_eq!(names[0].1, first_edge.id);
    let updated_edge = store.edge(first_edge.id).expect("fetch");
    assert_eq!(updated_edge.value, SimpleValue::text("legal"));
    assert_eq!(updated_edge.role1, first_edge.role1);
    assert_eq!(updated_edge.role2, first_edge.role2);
}

// =============================================================================
// TRANSACTIONS & PERSISTENCE
// =============================================================================

#[test]
fn failure_after_writes_leaves_no_partial_state() {
    let mut store = MemGraph::new();
    let mut registry = TypeRegistry::new();
    registry
        .register(
            TypeDef::new("ex.holder", DataKind::CompositeIdentity)
                .with_def(AssocDef::new(
                    "ex.color",
                    DefKind::Composition,
                    "ex.holder",
                    "ex.color",
                    Cardinality::One,
                ))
                .expect("def")
                .with_def(AssocDef::new(
                    "ex.sub",
                    DefKind::Composition,
                    "ex.holder",
                    "ex.sub",
                    Cardinality::One,
                ))
                .expect("def"),
        )
        .expect("register");
    registry.register(simple_type("ex.color")).expect("register");
    // Note: "ex.sub" is deliberately not registered.

    let model = UpdateModel::composite(
        "ex.holder",
        ChildValues::new()
            // Unified first: creates a node before the failure hits.
            .set("ex.color", UpdateModel::simple("ex.color", "red"))
            .set("ex.sub", UpdateModel::composite("ex.sub", ChildValues::new())),
    );
    let mut engine = ValueEngine::new(&mut store, &registry);
    assert!(matches!(
        engine.unify(&model, None),
        Err(HolonError::UnknownType(_))
    ));

    // The whole call rolled back; the "red" node never materialized.
    assert_eq!(store.node_count().expect("count"), 0);
    assert_eq!(store.edge_count().expect("count"), 0);
}

#[test]
fn identity_reuse_works_on_the_persistent_backend() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("graph.redb");
    let registry = person_registry();

    let person_id = {
        let mut store = RedbGraph::open(&path).expect("open");
        let mut engine = ValueEngine::new(&mut store, &registry);
        let first = engine.unify(&person("a@b.com", "X"), None).expect("unify");
        let second = engine.unify(&person("a@b.com", "Y"), None).expect("unify");
        assert_eq!(first.id(), second.id());
        first.id().expect("id")
    };

    // Everything survived the reopen, including the reconciled name.
    let store = RedbGraph::open(&path).expect("reopen");
    let names = children_under(&store, person_id, DefKind::Composition, "ex.name");
    assert_eq!(names.len(), 1);
    assert_eq!(
        store.node(names[0].0).expect("fetch").value,
        SimpleValue::text("Y")
    );

    // And a third unify on the reopened store still resolves the same node.
    let mut store = RedbGraph::open(&path).expect("reopen");
    let mut engine = ValueEngine::new(&mut store, &registry);
    let third = engine.unify(&person("a@b.com", "Z"), None).expect("unify");
    assert_eq!(third.id(), Some(person_id));
}

#[test]
fn labels_follow_the_first_nonempty_child() {
    let mut store = MemGraph::new();
    let registry = person_registry();
    let mut engine = ValueEngine::new(&mut store, &registry);

    let created = engine
        .unify(&person("a@b.com", "Ada"), None)
        .expect("unify");
    let person_id = created.id().expect("id");

    // Labels come from definition order: the email is first.
    assert_eq!(
        store
            .property(person_id, &Uri::new(holon_core::label::LABEL_PROPERTY))
            .expect("read"),
        Some(SimpleValue::text("a@b.com"))
    );
}

#[test]
fn update_against_wrong_typed_target_is_rejected() {
    let mut store = MemGraph::new();
    let registry = person_registry();

    let other = store
        .create_node(None, Uri::new("ex.name"), SimpleValue::text("stray"))
        .expect("create");
    let mut engine = ValueEngine::new(&mut store, &registry);
    let result = engine.unify(
        &person("a@b.com", "Ada"),
        Some(&DbObject::Node(other)),
    );
    assert!(matches!(result, Err(HolonError::TypeMismatch { .. })));
    // Sanity-check failure rolled everything back.
    assert_eq!(store.node_count().expect("count"), 1);
}
