//! # Core Type Definitions
//!
//! This module contains all core types for the watch graph substrate:
//! - Entity identifiers (`GraphId`, `NodeId`, `ImageId`)
//! - Stored records (`Graph`, `Node`, `Edge`, `Image`)
//! - Mutation inputs (`NewNode`, `NodePatch`)
//! - Error types (`WatchGraphError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// ENTITY IDENTIFIERS
// =============================================================================

/// Unique identifier for a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphId(pub u64);

/// Unique identifier for a node within the store.
/// Nodes belong to exactly one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Unique identifier for an image. Every image is owned by exactly one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageId(pub u64);

// =============================================================================
// WATCH STATUS
// =============================================================================

/// Viewing state of a node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum WatchStatus {
    #[default]
    Unwatched,
    Watching,
    Watched,
    Ignored,
}

impl WatchStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            WatchStatus::Unwatched => "unwatched",
            WatchStatus::Watching => "watching",
            WatchStatus::Watched => "watched",
            WatchStatus::Ignored => "ignored",
        }
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// A graph: a named collection of nodes and the edges between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub id: GraphId,
    pub name: String,
}

/// A trackable entity (movie or show) belonging to exactly one graph.
///
/// `duration_secs` is a length in whole seconds. `image_id` references the
/// exclusively-owned image; it is never shared between nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub graph_id: GraphId,
    pub name: String,
    pub image_id: ImageId,
    pub status: WatchStatus,
    pub duration_secs: Option<u32>,
    pub where_to_watch: Option<String>,
}

/// A directed "depends on" (watch-before) relation.
///
/// Identity is the ordered `(source, target)` pair itself; there is no
/// surrogate edge id and no update operation. Edges are created or
/// destroyed only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

/// Raw image bytes plus the metadata served alongside them.
/// `last_modified` is Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub name: String,
    pub data: Vec<u8>,
    pub last_modified: u64,
}

/// A graph together with its nodes and edges, as returned by
/// [`crate::storage::GraphStore::graph_contents`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphContents {
    pub graph: Graph,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

// =============================================================================
// MUTATION INPUTS
// =============================================================================

/// Input for node creation. The image bytes must already have passed
/// [`crate::sniff::validate`]; the store does not re-classify them.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub name: String,
    pub image: Vec<u8>,
    pub status: WatchStatus,
    pub duration_secs: Option<u32>,
    pub where_to_watch: Option<String>,
}

/// Partial node update.
///
/// The outer `Option` distinguishes "leave untouched" (`None`) from "apply
/// this change" (`Some`). For the nullable fields the inner `Option`
/// additionally distinguishes "set" from "clear".
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    pub name: Option<String>,
    pub image: Option<Vec<u8>>,
    pub status: Option<WatchStatus>,
    pub duration_secs: Option<Option<u32>>,
    pub where_to_watch: Option<Option<String>>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors surfaced by the watch graph core.
///
/// All of these are expected, recoverable conditions: the boundary layer
/// maps each variant to a stable status code. The core never panics.
#[derive(Debug, Error)]
pub enum WatchGraphError {
    /// The requested graph does not exist.
    #[error("graph not found: {0:?}")]
    GraphNotFound(GraphId),

    /// The requested node does not exist.
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// The requested image does not exist.
    #[error("image not found: {0:?}")]
    ImageNotFound(ImageId),

    /// The requested edge does not exist.
    #[error("edge not found: {0:?} -> {1:?}")]
    EdgeNotFound(NodeId, NodeId),

    /// Both endpoints of an edge must belong to the same graph.
    #[error("nodes {0:?} and {1:?} are in different graphs")]
    CrossGraphEdge(NodeId, NodeId),

    /// The ordered `(source, target)` pair already exists.
    #[error("edge already exists: {0:?} -> {1:?}")]
    DuplicateEdge(NodeId, NodeId),

    /// An opaque identifier failed to decode to exactly one integer.
    #[error("invalid identifier")]
    InvalidIdentifier,

    /// The uploaded bytes match none of the supported image signatures.
    #[error("unsupported image format")]
    UnsupportedImageFormat,

    /// The uploaded bytes exceed the upload bound.
    #[error("image exceeds {} bytes", crate::sniff::MAX_IMAGE_BYTES)]
    ImageTooLarge,

    /// The underlying database failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A record failed to serialize or deserialize.
    #[error("serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn watch_status_defaults_to_unwatched() {
        assert_eq!(WatchStatus::default(), WatchStatus::Unwatched);
    }

    #[test]
    fn edges_order_by_source_then_target() {
        let mut edges = vec![
            Edge { source: NodeId(2), target: NodeId(1) },
            Edge { source: NodeId(1), target: NodeId(3) },
            Edge { source: NodeId(1), target: NodeId(2) },
        ];
        edges.sort();
        assert_eq!(edges[0], Edge { source: NodeId(1), target: NodeId(2) });
        assert_eq!(edges[2], Edge { source: NodeId(2), target: NodeId(1) });
    }
}
