//! # API Endpoint Handlers
//!
//! Every handler decodes its opaque identifiers first, then talks to the
//! store. Node create/update finish by reconciling the declared dependency
//! set and reporting the applied subset alongside the node.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use watchgraph_core::{
    GraphId, IdCodecs, ImageId, NewNode, NodeId, NodePatch, edge_delta, sniff,
};

use super::types::{
    ApiEdge, ApiGraph, ApiNode, CreateGraphRequest, CreateNodeRequest, EdgeChanges, EdgeResponse,
    GraphResponse, HealthResponse, NodeResponse, UpdateGraphRequest, UpdateNodeRequest,
};
use super::{ApiError, AppState};
use crate::reconcile::{ReconcileOutcome, apply_edge_delta};

// =============================================================================
// HEALTH
// =============================================================================

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// GRAPHS
// =============================================================================

pub async fn create_graph(
    State(state): State<AppState>,
    Json(request): Json<CreateGraphRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = require_name(&request.name)?;

    let graph = state.store.write().await.create_graph(&name)?;
    tracing::info!(name = %graph.name, "graph created");

    Ok((
        StatusCode::CREATED,
        Json(GraphResponse { graph: ApiGraph::from_empty_graph(&graph, &state.ids) }),
    ))
}

pub async fn get_graph(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = GraphId(state.ids.graph().decode(&graph_id)?);
    let contents = state.store.read().await.graph_contents(id)?;
    Ok(Json(GraphResponse { graph: ApiGraph::from_contents(&contents, &state.ids) }))
}

pub async fn update_graph(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
    Json(request): Json<UpdateGraphRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = GraphId(state.ids.graph().decode(&graph_id)?);

    if let Some(name) = &request.name {
        let name = require_name(name)?;
        state.store.write().await.rename_graph(id, &name)?;
    }

    let contents = state.store.read().await.graph_contents(id)?;
    Ok(Json(GraphResponse { graph: ApiGraph::from_contents(&contents, &state.ids) }))
}

pub async fn delete_graph(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = GraphId(state.ids.graph().decode(&graph_id)?);
    state.store.write().await.delete_graph(id)?;
    tracing::info!(graph_id = id.0, "graph deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// NODES
// =============================================================================

pub async fn create_node(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
    Json(request): Json<CreateNodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let graph = GraphId(state.ids.graph().decode(&graph_id)?);
    let name = require_name(&request.name)?;
    let image = decode_image(&request.image)?;
    let desired = decode_sources(&request.depends_on, &state.ids)?;

    let node = state.store.write().await.create_node(
        graph,
        NewNode {
            name,
            image,
            status: request.status,
            duration_secs: request.duration_seconds,
            where_to_watch: request.where_to_watch,
        },
    )?;
    tracing::info!(name = %node.name, graph_id = graph.0, "node created");

    let outcome = reconcile_dependencies(&state, node.id, desired).await?;
    Ok((
        StatusCode::CREATED,
        Json(NodeResponse {
            node: ApiNode::from_node(&node, &state.ids),
            edges: EdgeChanges::from_outcome(&outcome, &state.ids),
        }),
    ))
}

pub async fn update_node(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
    Json(request): Json<UpdateNodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = NodeId(state.ids.node().decode(&node_id)?);

    let name = request.name.as_deref().map(require_name).transpose()?;
    let image = request.image.as_deref().map(decode_image).transpose()?;
    let desired = request
        .depends_on
        .as_ref()
        .map(|sources| decode_sources(sources, &state.ids))
        .transpose()?;

    let patch = NodePatch {
        name,
        image,
        status: request.status,
        duration_secs: request.duration_seconds,
        where_to_watch: request.where_to_watch,
    };
    let node = state.store.write().await.update_node(id, &patch)?;

    let outcome = match desired {
        Some(desired) => reconcile_dependencies(&state, id, desired).await?,
        None => ReconcileOutcome::default(),
    };
    Ok(Json(NodeResponse {
        node: ApiNode::from_node(&node, &state.ids),
        edges: EdgeChanges::from_outcome(&outcome, &state.ids),
    }))
}

pub async fn delete_node(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = NodeId(state.ids.node().decode(&node_id)?);
    state.store.write().await.delete_node(id)?;
    tracing::info!(node_id = id.0, "node deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// EDGES
// =============================================================================

pub async fn create_edge(
    State(state): State<AppState>,
    Path((source_node_id, target_node_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let source = NodeId(state.ids.node().decode(&source_node_id)?);
    let target = NodeId(state.ids.node().decode(&target_node_id)?);

    let edge = state.store.write().await.create_edge(source, target)?;
    Ok((
        StatusCode::CREATED,
        Json(EdgeResponse { edge: ApiEdge::from_edge(&edge, &state.ids) }),
    ))
}

pub async fn delete_edge(
    State(state): State<AppState>,
    Path((source_node_id, target_node_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let source = NodeId(state.ids.node().decode(&source_node_id)?);
    let target = NodeId(state.ids.node().decode(&target_node_id)?);

    state.store.write().await.delete_edge(source, target)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// IMAGES
// =============================================================================

pub async fn download_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = ImageId(state.ids.image().decode(&image_id)?);
    let image = state.store.read().await.image(id)?;
    let format = sniff::sniff(&image.data);

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(format.content_type()));
    let disposition =
        format!("attachment; filename=\"image-{image_id}{}\"", format.file_extension());
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Some(last_modified) = http_date(image.last_modified) {
        if let Ok(value) = HeaderValue::from_str(&last_modified) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }

    Ok((headers, image.data))
}

fn http_date(unix_secs: u64) -> Option<String> {
    chrono::DateTime::from_timestamp(unix_secs as i64, 0)
        .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

fn require_name(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::validation("'name' must not be empty."));
    }
    Ok(name.to_string())
}

fn decode_image(encoded: &str) -> Result<Vec<u8>, ApiError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|_| ApiError::validation("'image' must be valid base64."))?;
    sniff::validate(&bytes)?;
    Ok(bytes)
}

fn decode_sources(sources: &[String], ids: &IdCodecs) -> Result<BTreeSet<NodeId>, ApiError> {
    sources
        .iter()
        .map(|source| Ok(NodeId(ids.node().decode(source)?)))
        .collect()
}

/// Diff the node's incoming edges against the desired sources and apply
/// the delta. The outcome is the applied subset, partial or not.
async fn reconcile_dependencies(
    state: &AppState,
    node: NodeId,
    desired: BTreeSet<NodeId>,
) -> Result<ReconcileOutcome, ApiError> {
    let current = state.store.read().await.incoming_edges(node)?;
    let delta = edge_delta(&current, node, &desired);
    if delta.is_empty() {
        return Ok(ReconcileOutcome::default());
    }
    Ok(apply_edge_delta(Arc::clone(&state.store), delta).await)
}
