//! # Watchgraph HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET    /health` - Health check
//! - `POST   /graphs` - Create a graph
//! - `GET    /graphs/{graphId}` - Graph with nodes and edges
//! - `PATCH  /graphs/{graphId}` - Rename a graph
//! - `DELETE /graphs/{graphId}` - Delete a graph (cascade)
//! - `POST   /graphs/{graphId}/nodes` - Create a node + reconcile dependencies
//! - `PATCH  /graphs/nodes/{nodeId}` - Partial node update + reconcile
//! - `DELETE /graphs/nodes/{nodeId}` - Delete a node (cascade)
//! - `POST   /graphs/edges/{sourceNodeId}/{targetNodeId}` - Create an edge
//! - `DELETE /graphs/edges/{sourceNodeId}/{targetNodeId}` - Delete an edge
//! - `GET    /images/{imageId}` - Download image bytes
//!
//! Every path and body identifier is an opaque string; it is decoded with
//! the matching namespace codec before any store call, and a failed decode
//! maps to a 400 without touching the store.
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `WATCHGRAPH_CORS_ORIGINS`: Comma-separated list of allowed origins,
//!   or "*" for all (default: localhost only)

mod handlers;
mod types;

#[allow(unused_imports)]
pub use types::{
    ApiEdge, ApiGraph, ApiNode, CreateGraphRequest, CreateNodeRequest, EdgeChanges, EdgeResponse,
    ErrorResponse, GraphResponse, HealthResponse, NodeResponse, UpdateGraphRequest,
    UpdateNodeRequest,
};

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use watchgraph_core::{GraphStore, IdCodecs, WatchGraphError};

use crate::error::AppError;
use crate::reconcile::SharedStore;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the store behind an async lock, and the codec
/// family built once at startup and immutable thereafter.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub ids: Arc<IdCodecs>,
}

impl AppState {
    #[must_use]
    pub fn new(store: GraphStore, ids: IdCodecs) -> Self {
        Self { store: Arc::new(RwLock::new(store)), ids: Arc::new(ids) }
    }
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// HTTP-facing error: a stable status code plus a client-safe message.
///
/// Raw storage keys never reach the response body; the detailed core error
/// goes to the log instead.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    pub fn validation(message: &'static str) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message }
    }
}

impl From<WatchGraphError> for ApiError {
    fn from(err: WatchGraphError) -> Self {
        let (status, message) = match &err {
            WatchGraphError::GraphNotFound(_) => {
                (StatusCode::NOT_FOUND, "The graph does not exist.")
            }
            WatchGraphError::NodeNotFound(_) => (StatusCode::NOT_FOUND, "The node does not exist."),
            WatchGraphError::ImageNotFound(_) => {
                (StatusCode::NOT_FOUND, "The image does not exist.")
            }
            WatchGraphError::EdgeNotFound(_, _) => {
                (StatusCode::NOT_FOUND, "The edge does not exist.")
            }
            WatchGraphError::CrossGraphEdge(_, _) => {
                (StatusCode::BAD_REQUEST, "The nodes are in different graphs.")
            }
            WatchGraphError::DuplicateEdge(_, _) => {
                (StatusCode::CONFLICT, "The edge already exists.")
            }
            WatchGraphError::InvalidIdentifier => (StatusCode::BAD_REQUEST, "Invalid id."),
            WatchGraphError::UnsupportedImageFormat => (
                StatusCode::BAD_REQUEST,
                "The image must be one of the following file types: JPEG, BMP, GIF, PNG, SVG, TIF.",
            ),
            WatchGraphError::ImageTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, "The image must be at most 1 MB.")
            }
            WatchGraphError::Storage(_) | WatchGraphError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "The request failed.")
            }
        };

        if status.is_server_error() {
            tracing::error!(%err, "graph api request failed");
        } else {
            tracing::warn!(%err, "graph api request rejected");
        }
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message.to_string() })).into_response()
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads the `WATCHGRAPH_CORS_ORIGINS` environment variable:
/// - If "*": allows all origins (development mode - use with caution!)
/// - If not set: defaults to localhost only (restrictive default)
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("WATCHGRAPH_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (WATCHGRAPH_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in WATCHGRAPH_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                cors_with_origins(allowed_origins)
            }
        }
        None => {
            tracing::info!("CORS: No WATCHGRAPH_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = vec![
        "http://localhost:4200".parse::<HeaderValue>().ok(),
        "http://localhost:8080".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:4200".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:8080".parse::<HeaderValue>().ok(),
    ];
    cors_with_origins(localhost_origins.into_iter().flatten().collect())
}

fn cors_with_origins(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit. The body
/// limit leaves headroom above the 1 MiB image bound for base64 overhead
/// and the surrounding JSON.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/graphs", post(handlers::create_graph))
        .route(
            "/graphs/{graph_id}",
            get(handlers::get_graph)
                .patch(handlers::update_graph)
                .delete(handlers::delete_graph),
        )
        .route("/graphs/{graph_id}/nodes", post(handlers::create_node))
        .route(
            "/graphs/nodes/{node_id}",
            axum::routing::patch(handlers::update_node).delete(handlers::delete_node),
        )
        .route(
            "/graphs/edges/{source_node_id}/{target_node_id}",
            post(handlers::create_edge).delete(handlers::delete_edge),
        )
        .route("/images/{image_id}", get(handlers::download_image))
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), AppError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Io(format!("bind failed: {e}")))?;

    tracing::info!("watchgraph HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::Io(format!("server error: {e}")))
}
