//! # redb-backed Graph Store
//!
//! A disk-backed store using the redb embedded database, providing:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Every mutation is a single write transaction, so cascades are atomic:
//! no reader ever observes a node without its image, or an edge whose
//! endpoint is gone. Cascading deletes are an explicit traversal plus batch
//! delete inside the transaction, never an implicit framework behavior.
//!
//! ## Integrity contract
//!
//! - `create_edge` checks, in order: both endpoints exist, both share one
//!   graph, the ordered pair is new. Each check short-circuits.
//! - `delete_node` removes the node, every edge touching it, and its owned
//!   image.
//! - `delete_graph` is the only multi-hop cascade: graph → nodes →
//!   edges/images.
//!
//! Only the identical ordered pair counts as a duplicate edge; the reverse
//! pair and self-loops are accepted.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{
    Edge, Graph, GraphContents, GraphId, Image, ImageId, NewNode, Node, NodeId, NodePatch,
    WatchGraphError, WatchStatus,
};

/// Table for graphs: GraphId(u64) -> serialized GraphRecord bytes
const GRAPHS: TableDefinition<u64, &[u8]> = TableDefinition::new("graphs");

/// Table for nodes: NodeId(u64) -> serialized NodeRecord bytes
const NODES: TableDefinition<u64, &[u8]> = TableDefinition::new("nodes");

/// Table for images: ImageId(u64) -> serialized ImageRecord bytes
const IMAGES: TableDefinition<u64, &[u8]> = TableDefinition::new("images");

/// Table for edges, keyed solely by the ordered pair: (source, target) -> ()
const EDGES: TableDefinition<(u64, u64), ()> = TableDefinition::new("edges");

/// Reverse edge index for incoming lookups: (target, source) -> ()
const EDGES_REV: TableDefinition<(u64, u64), ()> = TableDefinition::new("edges_rev");

/// Node-per-graph index for contents and cascades: (graph, node) -> ()
const NODES_BY_GRAPH: TableDefinition<(u64, u64), ()> = TableDefinition::new("nodes_by_graph");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_GRAPH_ID: &str = "next_graph_id";
const NEXT_NODE_ID: &str = "next_node_id";
const NEXT_IMAGE_ID: &str = "next_image_id";

// =============================================================================
// STORED RECORDS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphRecord {
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeRecord {
    graph_id: u64,
    name: String,
    image_id: u64,
    status: WatchStatus,
    duration_secs: Option<u32>,
    where_to_watch: Option<String>,
}

impl NodeRecord {
    fn into_node(self, id: NodeId) -> Node {
        Node {
            id,
            graph_id: GraphId(self.graph_id),
            name: self.name,
            image_id: ImageId(self.image_id),
            status: self.status,
            duration_secs: self.duration_secs,
            where_to_watch: self.where_to_watch,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImageRecord {
    name: String,
    data: Vec<u8>,
    last_modified: u64,
}

// =============================================================================
// HELPERS
// =============================================================================

fn db_err(err: impl std::fmt::Display) -> WatchGraphError {
    WatchGraphError::Storage(err.to_string())
}

fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, WatchGraphError> {
    postcard::to_allocvec(value).map_err(|e| WatchGraphError::Serialization(e.to_string()))
}

fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WatchGraphError> {
    postcard::from_bytes(bytes).map_err(|e| WatchGraphError::Serialization(e.to_string()))
}

fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// STORE
// =============================================================================

/// Entity counts, as reported by [`GraphStore::counts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub graphs: u64,
    pub nodes: u64,
    pub edges: u64,
    pub images: u64,
}

/// The disk-backed watch graph store.
///
/// Surrogate ids are monotonically assigned u64s, persisted in the metadata
/// table so they survive restarts and are never reused.
pub struct GraphStore {
    db: Database,
    next_graph_id: u64,
    next_node_id: u64,
    next_image_id: u64,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("next_graph_id", &self.next_graph_id)
            .field("next_node_id", &self.next_node_id)
            .field("next_image_id", &self.next_image_id)
            .finish_non_exhaustive()
    }
}

impl GraphStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WatchGraphError> {
        let db = Database::create(path.as_ref()).map_err(db_err)?;

        // Initialize tables if they don't exist
        {
            let txn = db.begin_write().map_err(db_err)?;
            let _ = txn.open_table(GRAPHS).map_err(db_err)?;
            let _ = txn.open_table(NODES).map_err(db_err)?;
            let _ = txn.open_table(IMAGES).map_err(db_err)?;
            let _ = txn.open_table(EDGES).map_err(db_err)?;
            let _ = txn.open_table(EDGES_REV).map_err(db_err)?;
            let _ = txn.open_table(NODES_BY_GRAPH).map_err(db_err)?;
            let _ = txn.open_table(METADATA).map_err(db_err)?;
            txn.commit().map_err(db_err)?;
        }

        let txn = db.begin_read().map_err(db_err)?;
        let meta = txn.open_table(METADATA).map_err(db_err)?;
        let counter = |key: &str| -> Result<u64, WatchGraphError> {
            Ok(meta.get(key).map_err(db_err)?.map(|v| v.value()).unwrap_or(1))
        };
        let next_graph_id = counter(NEXT_GRAPH_ID)?;
        let next_node_id = counter(NEXT_NODE_ID)?;
        let next_image_id = counter(NEXT_IMAGE_ID)?;

        Ok(Self { db, next_graph_id, next_node_id, next_image_id })
    }

    // -------------------------------------------------------------------------
    // Graphs
    // -------------------------------------------------------------------------

    pub fn create_graph(&mut self, name: &str) -> Result<Graph, WatchGraphError> {
        let id = self.next_graph_id;
        let record = GraphRecord { name: name.to_string() };
        let bytes = to_bytes(&record)?;

        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut graphs = txn.open_table(GRAPHS).map_err(db_err)?;
            graphs.insert(id, bytes.as_slice()).map_err(db_err)?;
            let mut meta = txn.open_table(METADATA).map_err(db_err)?;
            meta.insert(NEXT_GRAPH_ID, id + 1).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;

        self.next_graph_id = id + 1;
        Ok(Graph { id: GraphId(id), name: record.name })
    }

    pub fn graph(&self, id: GraphId) -> Result<Graph, WatchGraphError> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let graphs = txn.open_table(GRAPHS).map_err(db_err)?;
        let record: GraphRecord = match graphs.get(id.0).map_err(db_err)? {
            Some(guard) => from_bytes(guard.value())?,
            None => return Err(WatchGraphError::GraphNotFound(id)),
        };
        Ok(Graph { id, name: record.name })
    }

    /// The graph with all of its nodes and edges. Edges are gathered per
    /// node from the outgoing table; since both endpoints always share the
    /// graph, this yields every graph edge exactly once.
    pub fn graph_contents(&self, id: GraphId) -> Result<GraphContents, WatchGraphError> {
        let txn = self.db.begin_read().map_err(db_err)?;

        let graphs = txn.open_table(GRAPHS).map_err(db_err)?;
        let record: GraphRecord = match graphs.get(id.0).map_err(db_err)? {
            Some(guard) => from_bytes(guard.value())?,
            None => return Err(WatchGraphError::GraphNotFound(id)),
        };

        let by_graph = txn.open_table(NODES_BY_GRAPH).map_err(db_err)?;
        let mut node_ids = Vec::new();
        for entry in by_graph.range((id.0, 0)..=(id.0, u64::MAX)).map_err(db_err)? {
            let (key, _) = entry.map_err(db_err)?;
            node_ids.push(key.value().1);
        }

        let nodes_table = txn.open_table(NODES).map_err(db_err)?;
        let mut nodes = Vec::with_capacity(node_ids.len());
        for node_id in &node_ids {
            let guard = nodes_table
                .get(*node_id)
                .map_err(db_err)?
                .ok_or_else(|| WatchGraphError::Storage("node index out of sync".to_string()))?;
            let record: NodeRecord = from_bytes(guard.value())?;
            nodes.push(record.into_node(NodeId(*node_id)));
        }

        let edges_table = txn.open_table(EDGES).map_err(db_err)?;
        let mut edges = Vec::new();
        for node_id in &node_ids {
            for entry in edges_table
                .range((*node_id, 0)..=(*node_id, u64::MAX))
                .map_err(db_err)?
            {
                let (key, _) = entry.map_err(db_err)?;
                let (source, target) = key.value();
                edges.push(Edge { source: NodeId(source), target: NodeId(target) });
            }
        }

        Ok(GraphContents { graph: Graph { id, name: record.name }, nodes, edges })
    }

    pub fn rename_graph(&mut self, id: GraphId, name: &str) -> Result<Graph, WatchGraphError> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut graphs = txn.open_table(GRAPHS).map_err(db_err)?;
            if graphs.get(id.0).map_err(db_err)?.is_none() {
                return Err(WatchGraphError::GraphNotFound(id));
            }
            let bytes = to_bytes(&GraphRecord { name: name.to_string() })?;
            graphs.insert(id.0, bytes.as_slice()).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(Graph { id, name: name.to_string() })
    }

    /// Delete a graph and, transitively, its nodes with their edges and
    /// images. The whole cascade commits or aborts as one transaction.
    pub fn delete_graph(&mut self, id: GraphId) -> Result<(), WatchGraphError> {
        let txn = self.db.begin_write().map_err(db_err)?;

        {
            let mut graphs = txn.open_table(GRAPHS).map_err(db_err)?;
            if graphs.remove(id.0).map_err(db_err)?.is_none() {
                return Err(WatchGraphError::GraphNotFound(id));
            }
        }

        let node_ids: Vec<u64> = {
            let by_graph = txn.open_table(NODES_BY_GRAPH).map_err(db_err)?;
            let mut ids = Vec::new();
            for entry in by_graph.range((id.0, 0)..=(id.0, u64::MAX)).map_err(db_err)? {
                let (key, _) = entry.map_err(db_err)?;
                ids.push(key.value().1);
            }
            ids
        };

        for node_id in node_ids {
            delete_node_in_txn(&txn, node_id)?;
        }

        txn.commit().map_err(db_err)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------------

    /// Create a node and its owned image in one transaction.
    pub fn create_node(&mut self, graph_id: GraphId, new: NewNode) -> Result<Node, WatchGraphError> {
        let node_id = self.next_node_id;
        let image_id = self.next_image_id;

        let image_bytes = to_bytes(&ImageRecord {
            name: new.name.clone(),
            data: new.image,
            last_modified: unix_now_secs(),
        })?;
        let record = NodeRecord {
            graph_id: graph_id.0,
            name: new.name,
            image_id,
            status: new.status,
            duration_secs: new.duration_secs,
            where_to_watch: new.where_to_watch,
        };
        let node_bytes = to_bytes(&record)?;

        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let graphs = txn.open_table(GRAPHS).map_err(db_err)?;
            if graphs.get(graph_id.0).map_err(db_err)?.is_none() {
                return Err(WatchGraphError::GraphNotFound(graph_id));
            }

            let mut images = txn.open_table(IMAGES).map_err(db_err)?;
            images.insert(image_id, image_bytes.as_slice()).map_err(db_err)?;
            let mut nodes = txn.open_table(NODES).map_err(db_err)?;
            nodes.insert(node_id, node_bytes.as_slice()).map_err(db_err)?;
            let mut by_graph = txn.open_table(NODES_BY_GRAPH).map_err(db_err)?;
            by_graph.insert((graph_id.0, node_id), ()).map_err(db_err)?;
            let mut meta = txn.open_table(METADATA).map_err(db_err)?;
            meta.insert(NEXT_NODE_ID, node_id + 1).map_err(db_err)?;
            meta.insert(NEXT_IMAGE_ID, image_id + 1).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;

        self.next_node_id = node_id + 1;
        self.next_image_id = image_id + 1;
        Ok(record.into_node(NodeId(node_id)))
    }

    pub fn node(&self, id: NodeId) -> Result<Node, WatchGraphError> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let nodes = txn.open_table(NODES).map_err(db_err)?;
        let record: NodeRecord = match nodes.get(id.0).map_err(db_err)? {
            Some(guard) => from_bytes(guard.value())?,
            None => return Err(WatchGraphError::NodeNotFound(id)),
        };
        Ok(record.into_node(id))
    }

    /// Apply a partial update. Fields absent from the patch are untouched;
    /// renaming renames the owned image, and replacing the image bytes
    /// refreshes its `last_modified`.
    pub fn update_node(&mut self, id: NodeId, patch: &NodePatch) -> Result<Node, WatchGraphError> {
        let txn = self.db.begin_write().map_err(db_err)?;

        let record: NodeRecord = {
            let mut nodes = txn.open_table(NODES).map_err(db_err)?;
            let mut record: NodeRecord = {
                let Some(guard) = nodes.get(id.0).map_err(db_err)? else {
                    return Err(WatchGraphError::NodeNotFound(id));
                };
                from_bytes(guard.value())?
            };

            if let Some(name) = &patch.name {
                record.name = name.clone();
            }
            if let Some(status) = patch.status {
                record.status = status;
            }
            if let Some(duration) = patch.duration_secs {
                record.duration_secs = duration;
            }
            if let Some(where_to_watch) = &patch.where_to_watch {
                record.where_to_watch = where_to_watch.clone();
            }

            let bytes = to_bytes(&record)?;
            nodes.insert(id.0, bytes.as_slice()).map_err(db_err)?;
            record
        };

        if patch.name.is_some() || patch.image.is_some() {
            let mut images = txn.open_table(IMAGES).map_err(db_err)?;
            let mut image: ImageRecord = {
                let Some(guard) = images.get(record.image_id).map_err(db_err)? else {
                    return Err(WatchGraphError::ImageNotFound(ImageId(record.image_id)));
                };
                from_bytes(guard.value())?
            };

            if let Some(name) = &patch.name {
                image.name = name.clone();
            }
            if let Some(data) = &patch.image {
                image.data = data.clone();
                image.last_modified = unix_now_secs();
            }

            let bytes = to_bytes(&image)?;
            images.insert(record.image_id, bytes.as_slice()).map_err(db_err)?;
        }

        txn.commit().map_err(db_err)?;
        Ok(record.into_node(id))
    }

    /// Delete a node, every edge touching it, and its owned image, in one
    /// transaction.
    pub fn delete_node(&mut self, id: NodeId) -> Result<(), WatchGraphError> {
        let txn = self.db.begin_write().map_err(db_err)?;
        delete_node_in_txn(&txn, id.0)?;
        txn.commit().map_err(db_err)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Edges
    // -------------------------------------------------------------------------

    /// Create an edge. Checks run in order, each short-circuiting:
    /// endpoints exist, endpoints share a graph, the pair is new.
    pub fn create_edge(&mut self, source: NodeId, target: NodeId) -> Result<Edge, WatchGraphError> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let nodes = txn.open_table(NODES).map_err(db_err)?;
            let source_graph = match nodes.get(source.0).map_err(db_err)? {
                Some(guard) => from_bytes::<NodeRecord>(guard.value())?.graph_id,
                None => return Err(WatchGraphError::NodeNotFound(source)),
            };
            let target_graph = match nodes.get(target.0).map_err(db_err)? {
                Some(guard) => from_bytes::<NodeRecord>(guard.value())?.graph_id,
                None => return Err(WatchGraphError::NodeNotFound(target)),
            };
            if source_graph != target_graph {
                return Err(WatchGraphError::CrossGraphEdge(source, target));
            }

            let mut edges = txn.open_table(EDGES).map_err(db_err)?;
            if edges.get((source.0, target.0)).map_err(db_err)?.is_some() {
                return Err(WatchGraphError::DuplicateEdge(source, target));
            }
            edges.insert((source.0, target.0), ()).map_err(db_err)?;
            let mut rev = txn.open_table(EDGES_REV).map_err(db_err)?;
            rev.insert((target.0, source.0), ()).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(Edge { source, target })
    }

    pub fn delete_edge(&mut self, source: NodeId, target: NodeId) -> Result<(), WatchGraphError> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut edges = txn.open_table(EDGES).map_err(db_err)?;
            if edges.remove((source.0, target.0)).map_err(db_err)?.is_none() {
                return Err(WatchGraphError::EdgeNotFound(source, target));
            }
            let mut rev = txn.open_table(EDGES_REV).map_err(db_err)?;
            rev.remove((target.0, source.0)).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }

    /// All edges whose target is `node`, in source order.
    pub fn incoming_edges(&self, node: NodeId) -> Result<Vec<Edge>, WatchGraphError> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let nodes = txn.open_table(NODES).map_err(db_err)?;
        if nodes.get(node.0).map_err(db_err)?.is_none() {
            return Err(WatchGraphError::NodeNotFound(node));
        }

        let rev = txn.open_table(EDGES_REV).map_err(db_err)?;
        let mut edges = Vec::new();
        for entry in rev.range((node.0, 0)..=(node.0, u64::MAX)).map_err(db_err)? {
            let (key, _) = entry.map_err(db_err)?;
            edges.push(Edge { source: NodeId(key.value().1), target: node });
        }
        Ok(edges)
    }

    // -------------------------------------------------------------------------
    // Images
    // -------------------------------------------------------------------------

    pub fn image(&self, id: ImageId) -> Result<Image, WatchGraphError> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let images = txn.open_table(IMAGES).map_err(db_err)?;
        let record: ImageRecord = match images.get(id.0).map_err(db_err)? {
            Some(guard) => from_bytes(guard.value())?,
            None => return Err(WatchGraphError::ImageNotFound(id)),
        };
        Ok(Image { id, name: record.name, data: record.data, last_modified: record.last_modified })
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    pub fn counts(&self) -> Result<StoreCounts, WatchGraphError> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let graphs = txn.open_table(GRAPHS).map_err(db_err)?.len().map_err(db_err)?;
        let nodes = txn.open_table(NODES).map_err(db_err)?.len().map_err(db_err)?;
        let edges = txn.open_table(EDGES).map_err(db_err)?.len().map_err(db_err)?;
        let images = txn.open_table(IMAGES).map_err(db_err)?.len().map_err(db_err)?;
        Ok(StoreCounts { graphs, nodes, edges, images })
    }
}

/// Remove one node with its edges and owned image inside an open write
/// transaction. Shared by the node delete and the graph cascade.
fn delete_node_in_txn(txn: &WriteTransaction, node_id: u64) -> Result<(), WatchGraphError> {
    let record: NodeRecord = {
        let mut nodes = txn.open_table(NODES).map_err(db_err)?;
        let Some(guard) = nodes.remove(node_id).map_err(db_err)? else {
            return Err(WatchGraphError::NodeNotFound(NodeId(node_id)));
        };
        from_bytes(guard.value())?
    };

    {
        let mut images = txn.open_table(IMAGES).map_err(db_err)?;
        images.remove(record.image_id).map_err(db_err)?;
    }
    {
        let mut by_graph = txn.open_table(NODES_BY_GRAPH).map_err(db_err)?;
        by_graph.remove((record.graph_id, node_id)).map_err(db_err)?;
    }

    let mut edges = txn.open_table(EDGES).map_err(db_err)?;
    let mut rev = txn.open_table(EDGES_REV).map_err(db_err)?;

    let outgoing: Vec<u64> = {
        let mut targets = Vec::new();
        for entry in edges.range((node_id, 0)..=(node_id, u64::MAX)).map_err(db_err)? {
            let (key, _) = entry.map_err(db_err)?;
            targets.push(key.value().1);
        }
        targets
    };
    for target in outgoing {
        edges.remove((node_id, target)).map_err(db_err)?;
        rev.remove((target, node_id)).map_err(db_err)?;
    }

    let incoming: Vec<u64> = {
        let mut sources = Vec::new();
        for entry in rev.range((node_id, 0)..=(node_id, u64::MAX)).map_err(db_err)? {
            let (key, _) = entry.map_err(db_err)?;
            sources.push(key.value().1);
        }
        sources
    };
    for source in incoming {
        rev.remove((node_id, source)).map_err(db_err)?;
        edges.remove((source, node_id)).map_err(db_err)?;
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> GraphStore {
        GraphStore::open(dir.path().join("store.redb")).unwrap()
    }

    fn new_node(name: &str) -> NewNode {
        NewNode {
            name: name.to_string(),
            image: b"\x89PNG\r\n\x1a\nfake".to_vec(),
            status: WatchStatus::default(),
            duration_secs: None,
            where_to_watch: None,
        }
    }

    #[test]
    fn creates_and_fetches_graphs() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);

        let graph = store.create_graph("Film universe").unwrap();
        assert_eq!(store.graph(graph.id).unwrap().name, "Film universe");

        let contents = store.graph_contents(graph.id).unwrap();
        assert!(contents.nodes.is_empty());
        assert!(contents.edges.is_empty());

        assert!(matches!(
            store.graph(GraphId(999)),
            Err(WatchGraphError::GraphNotFound(_))
        ));
    }

    #[test]
    fn node_creation_assigns_an_owned_image() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let graph = store.create_graph("g").unwrap();

        let node = store.create_node(graph.id, new_node("First film")).unwrap();
        assert_eq!(node.graph_id, graph.id);
        assert_eq!(node.status, WatchStatus::Unwatched);

        let image = store.image(node.image_id).unwrap();
        assert_eq!(image.name, "First film");
        assert!(image.data.starts_with(b"\x89PNG"));
        assert!(image.last_modified > 0);
    }

    #[test]
    fn create_node_requires_the_graph() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        assert!(matches!(
            store.create_node(GraphId(1), new_node("n")),
            Err(WatchGraphError::GraphNotFound(_))
        ));
    }

    #[test]
    fn edge_checks_run_in_order() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let left = store.create_graph("left").unwrap();
        let right = store.create_graph("right").unwrap();
        let a = store.create_node(left.id, new_node("a")).unwrap();
        let b = store.create_node(left.id, new_node("b")).unwrap();
        let c = store.create_node(right.id, new_node("c")).unwrap();

        // Missing endpoint wins over everything else.
        assert!(matches!(
            store.create_edge(NodeId(999), a.id),
            Err(WatchGraphError::NodeNotFound(NodeId(999)))
        ));
        assert!(matches!(
            store.create_edge(a.id, NodeId(999)),
            Err(WatchGraphError::NodeNotFound(NodeId(999)))
        ));

        // Cross-graph references are rejected and create nothing.
        assert!(matches!(
            store.create_edge(a.id, c.id),
            Err(WatchGraphError::CrossGraphEdge(_, _))
        ));
        assert!(store.graph_contents(left.id).unwrap().edges.is_empty());

        // A valid pair succeeds once and conflicts the second time.
        store.create_edge(a.id, b.id).unwrap();
        assert!(matches!(
            store.create_edge(a.id, b.id),
            Err(WatchGraphError::DuplicateEdge(_, _))
        ));
        assert_eq!(store.graph_contents(left.id).unwrap().edges.len(), 1);
    }

    #[test]
    fn reverse_edges_and_self_loops_are_allowed() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let graph = store.create_graph("g").unwrap();
        let a = store.create_node(graph.id, new_node("a")).unwrap();
        let b = store.create_node(graph.id, new_node("b")).unwrap();

        store.create_edge(a.id, b.id).unwrap();
        store.create_edge(b.id, a.id).unwrap();
        store.create_edge(a.id, a.id).unwrap();
        assert_eq!(store.graph_contents(graph.id).unwrap().edges.len(), 3);
    }

    #[test]
    fn deleting_a_node_cascades_to_edges_and_image() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let graph = store.create_graph("g").unwrap();
        let a = store.create_node(graph.id, new_node("a")).unwrap();
        let b = store.create_node(graph.id, new_node("b")).unwrap();
        let c = store.create_node(graph.id, new_node("c")).unwrap();

        store.create_edge(a.id, b.id).unwrap();
        store.create_edge(b.id, c.id).unwrap();
        store.create_edge(c.id, a.id).unwrap();

        store.delete_node(b.id).unwrap();

        assert!(matches!(store.node(b.id), Err(WatchGraphError::NodeNotFound(_))));
        assert!(matches!(store.image(b.image_id), Err(WatchGraphError::ImageNotFound(_))));

        let contents = store.graph_contents(graph.id).unwrap();
        assert_eq!(contents.nodes.len(), 2);
        assert_eq!(contents.edges, vec![Edge { source: c.id, target: a.id }]);

        // The cascaded edges are gone for delete_edge too.
        assert!(matches!(
            store.delete_edge(a.id, b.id),
            Err(WatchGraphError::EdgeNotFound(_, _))
        ));
    }

    #[test]
    fn deleting_a_graph_cascades_two_hops() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let doomed = store.create_graph("doomed").unwrap();
        let kept = store.create_graph("kept").unwrap();
        let a = store.create_node(doomed.id, new_node("a")).unwrap();
        let b = store.create_node(doomed.id, new_node("b")).unwrap();
        let other = store.create_node(kept.id, new_node("other")).unwrap();
        store.create_edge(a.id, b.id).unwrap();

        store.delete_graph(doomed.id).unwrap();

        assert!(matches!(store.graph(doomed.id), Err(WatchGraphError::GraphNotFound(_))));
        assert!(matches!(store.node(a.id), Err(WatchGraphError::NodeNotFound(_))));
        assert!(matches!(store.image(a.image_id), Err(WatchGraphError::ImageNotFound(_))));
        assert!(matches!(store.image(b.image_id), Err(WatchGraphError::ImageNotFound(_))));

        // The other graph is untouched.
        assert_eq!(store.node(other.id).unwrap().name, "other");
        let counts = store.counts().unwrap();
        assert_eq!(counts.graphs, 1);
        assert_eq!(counts.nodes, 1);
        assert_eq!(counts.edges, 0);
        assert_eq!(counts.images, 1);
    }

    #[test]
    fn node_updates_are_partial() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let graph = store.create_graph("g").unwrap();
        let node = store
            .create_node(
                graph.id,
                NewNode {
                    name: "Original".to_string(),
                    image: b"\x89PNG\r\n\x1a\nfirst".to_vec(),
                    status: WatchStatus::Unwatched,
                    duration_secs: Some(5400),
                    where_to_watch: Some("cinema".to_string()),
                },
            )
            .unwrap();

        // Absent fields stay untouched.
        let updated = store
            .update_node(
                node.id,
                &NodePatch { status: Some(WatchStatus::Watched), ..NodePatch::default() },
            )
            .unwrap();
        assert_eq!(updated.name, "Original");
        assert_eq!(updated.status, WatchStatus::Watched);
        assert_eq!(updated.duration_secs, Some(5400));
        assert_eq!(updated.where_to_watch.as_deref(), Some("cinema"));

        // Explicit null clears, distinct from absent.
        let cleared = store
            .update_node(
                node.id,
                &NodePatch {
                    duration_secs: Some(None),
                    where_to_watch: Some(None),
                    ..NodePatch::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.duration_secs, None);
        assert_eq!(cleared.where_to_watch, None);
        assert_eq!(cleared.status, WatchStatus::Watched);

        // Renaming renames the owned image.
        store
            .update_node(
                node.id,
                &NodePatch { name: Some("Renamed".to_string()), ..NodePatch::default() },
            )
            .unwrap();
        assert_eq!(store.image(node.image_id).unwrap().name, "Renamed");

        // Replacing the image keeps the id and swaps the bytes.
        store
            .update_node(
                node.id,
                &NodePatch {
                    image: Some(b"\x89PNG\r\n\x1a\nsecond".to_vec()),
                    ..NodePatch::default()
                },
            )
            .unwrap();
        let image = store.image(node.image_id).unwrap();
        assert!(image.data.ends_with(b"second"));
    }

    #[test]
    fn incoming_edges_lists_sources_in_order() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let graph = store.create_graph("g").unwrap();
        let a = store.create_node(graph.id, new_node("a")).unwrap();
        let b = store.create_node(graph.id, new_node("b")).unwrap();
        let x = store.create_node(graph.id, new_node("x")).unwrap();

        store.create_edge(b.id, x.id).unwrap();
        store.create_edge(a.id, x.id).unwrap();

        let incoming = store.incoming_edges(x.id).unwrap();
        assert_eq!(
            incoming,
            vec![Edge { source: a.id, target: x.id }, Edge { source: b.id, target: x.id }]
        );
        assert!(matches!(
            store.incoming_edges(NodeId(999)),
            Err(WatchGraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn id_counters_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let first_graph;
        {
            let mut store = open_store(&dir);
            first_graph = store.create_graph("one").unwrap();
            store.create_node(first_graph.id, new_node("n")).unwrap();
        }

        let mut store = open_store(&dir);
        let second_graph = store.create_graph("two").unwrap();
        assert!(second_graph.id.0 > first_graph.id.0);
        assert_eq!(store.graph(first_graph.id).unwrap().name, "one");
    }
}
