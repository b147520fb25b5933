//! # watchgraph-core
//!
//! The deterministic engine for the watch graph - THE LOGIC.
//!
//! This crate implements the substrate behind a personal "watch graph":
//! movies and shows as nodes in a directed graph whose edges encode
//! watch-before dependencies.
//!
//! ## Components
//!
//! - `sniff` — classifies uploaded image bytes by magic numbers
//! - `ident` — reversible, seeded opaque-identifier codecs, one per
//!   entity namespace
//! - `storage` — redb-backed store enforcing referential integrity
//!   (same-graph edges, unique ordered pairs, atomic cascades)
//! - `reconcile` — minimal add/remove edge delta against the current
//!   edge view
//!
//! ## Architectural Constraints
//!
//! The core:
//! - Has NO async, NO network dependencies (pure Rust)
//! - Is deterministic: identical inputs and seeds yield identical outputs
//! - Never panics; every expected condition is a typed `Result`

// =============================================================================
// MODULES
// =============================================================================

pub mod ident;
pub mod reconcile;
pub mod sniff;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Edge, Graph, GraphContents, GraphId, Image, ImageId, NewNode, Node, NodeId, NodePatch,
    WatchGraphError, WatchStatus,
};

// =============================================================================
// RE-EXPORTS: Components
// =============================================================================

pub use ident::{IdCodec, IdCodecs, Namespace};
pub use reconcile::{EdgeDelta, edge_delta};
pub use sniff::{ImageFormat, MAX_IMAGE_BYTES, sniff};
pub use storage::{GraphStore, StoreCounts};
