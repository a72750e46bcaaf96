//! # redb-backed Graph Storage
//!
//! A disk-backed storage port using the redb embedded database, providing
//! ACID durability and crash safety (copy-on-write B-trees) with zero
//! configuration.
//!
//! The full graph state is mirrored in memory (loaded once at open) and
//! every mutation is journaled as a row write. Outside a scoped transaction
//! each mutation is its own redb write transaction; inside one, the journal
//! is applied as a single redb transaction at `commit()`, so a rollback
//! never touches the disk.

use crate::error::{HolonError, Result};
use crate::model::{EdgeModel, NodeModel, ObjectId, PlayerRef, RoleModel, SimpleValue, Uri};
use crate::storage::state::{GraphState, PropEntry};
use crate::storage::{GraphStore, RelatedFilter, RelatedNode};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Table for nodes: id -> serialized NodeModel bytes.
const NODES: TableDefinition<u64, &[u8]> = TableDefinition::new("nodes");

/// Table for edges: id -> serialized EdgeModel bytes.
const EDGES: TableDefinition<u64, &[u8]> = TableDefinition::new("edges");

/// Table for properties: (object id, key) -> serialized entry bytes.
const PROPS: TableDefinition<(u64, &str), &[u8]> = TableDefinition::new("props");

/// Table for metadata: key string -> value u64.
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

fn storage_err(e: impl std::fmt::Display) -> HolonError {
    HolonError::Storage(e.to_string())
}

/// One journaled row write.
enum Pending {
    PutNode(NodeModel),
    PutEdge(EdgeModel),
    RemoveEdge(ObjectId),
    PutProp(ObjectId, Uri, PropEntry),
    RemoveProp(ObjectId, Uri),
}

/// A disk-backed graph store using redb.
pub struct RedbGraph {
    /// The redb database handle.
    db: Database,
    /// In-memory mirror of the persisted state.
    state: GraphState,
    /// Snapshot taken at `begin()`; present while a transaction is open.
    snapshot: Option<Box<GraphState>>,
    /// Row writes pending since `begin()`.
    journal: Vec<Pending>,
}

impl std::fmt::Debug for RedbGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbGraph")
            .field("nodes", &self.state.node_count())
            .field("edges", &self.state.edge_count())
            .field("in_transaction", &self.snapshot.is_some())
            .finish_non_exhaustive()
    }
}

impl RedbGraph {
    /// Open or create a graph database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            let _ = write_txn.open_table(NODES).map_err(storage_err)?;
            let _ = write_txn.open_table(EDGES).map_err(storage_err)?;
            let _ = write_txn.open_table(PROPS).map_err(storage_err)?;
            let _ = write_txn.open_table(METADATA).map_err(storage_err)?;
            write_txn.commit().map_err(storage_err)?;
        }

        // Load the mirror
        let read_txn = db.begin_read().map_err(storage_err)?;
        let mut state = GraphState::default();
        {
            let table = read_txn.open_table(NODES).map_err(storage_err)?;
            for entry in table.iter().map_err(storage_err)? {
                let (_, bytes) = entry.map_err(storage_err)?;
                let node: NodeModel =
                    postcard::from_bytes(bytes.value()).map_err(storage_err)?;
                state.load_node(node);
            }
        }
        {
            let table = read_txn.open_table(EDGES).map_err(storage_err)?;
            for entry in table.iter().map_err(storage_err)? {
                let (_, bytes) = entry.map_err(storage_err)?;
                let edge: EdgeModel =
                    postcard::from_bytes(bytes.value()).map_err(storage_err)?;
                state.load_edge(edge);
            }
        }
        {
            let table = read_txn.open_table(PROPS).map_err(storage_err)?;
            for entry in table.iter().map_err(storage_err)? {
                let (key, bytes) = entry.map_err(storage_err)?;
                let (id, prop_key) = key.value();
                let prop: PropEntry =
                    postcard::from_bytes(bytes.value()).map_err(storage_err)?;
                state.load_prop(ObjectId(id), Uri::new(prop_key), prop);
            }
        }
        {
            let table = read_txn.open_table(METADATA).map_err(storage_err)?;
            if let Some(next_id) = table.get("next_id").map_err(storage_err)? {
                state.set_next_id(next_id.value());
            }
        }

        Ok(Self {
            db,
            state,
            snapshot: None,
            journal: Vec::new(),
        })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<()> {
        self.db.compact().map_err(storage_err)?;
        Ok(())
    }

    /// Journal row writes, or apply them immediately outside a transaction.
    fn record(&mut self, ops: Vec<Pending>) -> Result<()> {
        if self.snapshot.is_some() {
            self.journal.extend(ops);
            Ok(())
        } else {
            self.apply(&ops)
        }
    }

    /// Apply row writes as one redb write transaction.
    fn apply(&self, ops: &[Pending]) -> Result<()> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut nodes = write_txn.open_table(NODES).map_err(storage_err)?;
            let mut edges = write_txn.open_table(EDGES).map_err(storage_err)?;
            let mut props = write_txn.open_table(PROPS).map_err(storage_err)?;
            let mut meta = write_txn.open_table(METADATA).map_err(storage_err)?;
            for op in ops {
                match op {
                    Pending::PutNode(node) => {
                        let bytes = postcard::to_allocvec(node).map_err(storage_err)?;
                        nodes
                            .insert(node.id.0, bytes.as_slice())
                            .map_err(storage_err)?;
                    }
                    Pending::PutEdge(edge) => {
                        let bytes = postcard::to_allocvec(edge).map_err(storage_err)?;
                        edges
                            .insert(edge.id.0, bytes.as_slice())
                            .map_err(storage_err)?;
                    }
                    Pending::RemoveEdge(id) => {
                        edges.remove(id.0).map_err(storage_err)?;
                    }
                    Pending::PutProp(id, key, entry) => {
                        let bytes = postcard::to_allocvec(entry).map_err(storage_err)?;
                        props
                            .insert((id.0, key.as_str()), bytes.as_slice())
                            .map_err(storage_err)?;
                    }
                    Pending::RemoveProp(id, key) => {
                        props.remove((id.0, key.as_str())).map_err(storage_err)?;
                    }
                }
            }
            meta.insert("next_id", self.state.next_id())
                .map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)
    }
}

impl GraphStore for RedbGraph {
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
        let node = self.state.create_node(uri, type_uri, value)?;
        self.record(vec![Pending::PutNode(node.clone())])?;
        Ok(node)
    }

    fn create_edge(
        &mut self,
        uri: Option<Uri>,
        type_uri: Uri,
        value: SimpleValue,
        role1: RoleModel,
        role2: RoleModel,
    ) -> Result<EdgeModel> {
        let edge = self.state.create_edge(uri, type_uri, value, role1, role2)?;
        self.record(vec![Pending::PutEdge(edge.clone())])?;
        Ok(edge)
    }

    fn delete_edge(&mut self, id: ObjectId) -> Result<()> {
        let prop_keys = self.state.prop_keys(id);
        self.state.delete_edge(id)?;
        let mut ops = vec![Pending::RemoveEdge(id)];
        ops.extend(prop_keys.into_iter().map(|key| Pending::RemoveProp(id, key)));
        self.record(ops)
    }

    fn update_node_value(&mut self, id: ObjectId, value: SimpleValue) -> Result<()> {
        let node = self.state.update_node_value(id, value)?;
        self.record(vec![Pending::PutNode(node)])
    }

    fn update_edge_value(&mut self, id: ObjectId, value: SimpleValue) -> Result<()> {
        let edge = self.state.update_edge_value(id, value)?;
        self.record(vec![Pending::PutEdge(edge)])
    }

    fn store_property(
        &mut self,
        id: ObjectId,
        key: &Uri,
        value: SimpleValue,
        index: bool,
    ) -> Result<()> {
        let entry = self.state.store_property(id, key, value, index)?;
        self.record(vec![Pending::PutProp(id, key.clone(), entry)])
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
        self.journal.clear();
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| HolonError::Storage("no active transaction".to_string()))?;
        let ops = std::mem::take(&mut self.journal);
        if let Err(err) = self.apply(&ops) {
            // Keep the mirror consistent with the disk.
            self.state = *snapshot;
            return Err(err);
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| HolonError::Storage("no active transaction".to_string()))?;
        self.state = *snapshot;
        self.journal.clear();
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
