//! # API Request/Response Types
//!
//! JSON wire structures. Identifiers are opaque strings produced by the
//! namespace codecs; raw storage keys never appear on the wire. Field
//! names are camelCase to match the SPA client.

use serde::{Deserialize, Deserializer, Serialize};
use watchgraph_core::{Edge, Graph, GraphContents, IdCodecs, Node, WatchStatus};

use crate::reconcile::ReconcileOutcome;

// =============================================================================
// RESPONSES
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self { status: "ok".to_string(), version: env!("CARGO_PKG_VERSION").to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGraph {
    pub id: String,
    pub name: String,
    pub nodes: Vec<ApiNode>,
    pub edges: Vec<ApiEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNode {
    pub id: String,
    pub name: String,
    pub image_url: String,
    pub status: WatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub where_to_watch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEdge {
    pub source_node_id: String,
    pub target_node_id: String,
}

/// The applied subset of a dependency reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EdgeChanges {
    pub added: Vec<ApiEdge>,
    pub removed: Vec<ApiEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphResponse {
    pub graph: ApiGraph,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResponse {
    pub node: ApiNode,
    pub edges: EdgeChanges,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeResponse {
    pub edge: ApiEdge,
}

/// Error payload: a stable message for the client; detail stays in the logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// =============================================================================
// REQUESTS
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGraphRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGraphRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeRequest {
    pub name: String,
    /// Base64-encoded image bytes.
    pub image: String,
    /// Opaque node ids that should have a watch-before edge to this node.
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub status: WatchStatus,
    pub duration_seconds: Option<u32>,
    pub where_to_watch: Option<String>,
}

/// Partial node update. Absent fields are untouched; for
/// `durationSeconds`/`whereToWatch` an explicit `null` clears the value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodeRequest {
    pub name: Option<String>,
    /// Base64-encoded replacement image bytes.
    pub image: Option<String>,
    pub status: Option<WatchStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub duration_seconds: Option<Option<u32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub where_to_watch: Option<Option<String>>,
    pub depends_on: Option<Vec<String>>,
}

/// Keeps `null` distinguishable from an absent field: absent stays `None`
/// via `default`, while `null` becomes `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

// =============================================================================
// MAPPING
// =============================================================================

impl ApiNode {
    pub fn from_node(node: &Node, ids: &IdCodecs) -> Self {
        Self {
            id: ids.node().encode(node.id.0),
            name: node.name.clone(),
            image_url: format!("/images/{}", ids.image().encode(node.image_id.0)),
            status: node.status,
            duration_seconds: node.duration_secs,
            where_to_watch: node.where_to_watch.clone(),
        }
    }
}

impl ApiEdge {
    pub fn from_edge(edge: &Edge, ids: &IdCodecs) -> Self {
        Self {
            source_node_id: ids.node().encode(edge.source.0),
            target_node_id: ids.node().encode(edge.target.0),
        }
    }
}

impl ApiGraph {
    /// A freshly created graph: no nodes, no edges.
    pub fn from_empty_graph(graph: &Graph, ids: &IdCodecs) -> Self {
        Self {
            id: ids.graph().encode(graph.id.0),
            name: graph.name.clone(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn from_contents(contents: &GraphContents, ids: &IdCodecs) -> Self {
        Self {
            id: ids.graph().encode(contents.graph.id.0),
            name: contents.graph.name.clone(),
            nodes: contents.nodes.iter().map(|n| ApiNode::from_node(n, ids)).collect(),
            edges: contents.edges.iter().map(|e| ApiEdge::from_edge(e, ids)).collect(),
        }
    }
}

impl EdgeChanges {
    pub fn from_outcome(outcome: &ReconcileOutcome, ids: &IdCodecs) -> Self {
        Self {
            added: outcome.added.iter().map(|e| ApiEdge::from_edge(e, ids)).collect(),
            removed: outcome.removed.iter().map(|e| ApiEdge::from_edge(e, ids)).collect(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn update_request_distinguishes_null_from_absent() {
        let absent: UpdateNodeRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.duration_seconds, None);
        assert_eq!(absent.where_to_watch, None);

        let nulled: UpdateNodeRequest =
            serde_json::from_str(r#"{"durationSeconds": null, "whereToWatch": null}"#).unwrap();
        assert_eq!(nulled.duration_seconds, Some(None));
        assert_eq!(nulled.where_to_watch, Some(None));

        let set: UpdateNodeRequest =
            serde_json::from_str(r#"{"durationSeconds": 5400, "whereToWatch": "cinema"}"#).unwrap();
        assert_eq!(set.duration_seconds, Some(Some(5400)));
        assert_eq!(set.where_to_watch, Some(Some("cinema".to_string())));
    }

    #[test]
    fn create_node_request_defaults() {
        let request: CreateNodeRequest =
            serde_json::from_str(r#"{"name": "n", "image": "aGk="}"#).unwrap();
        assert!(request.depends_on.is_empty());
        assert_eq!(request.status, WatchStatus::Unwatched);
        assert_eq!(request.duration_seconds, None);
    }
}
