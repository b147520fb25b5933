//! # Graph Storage
//!
//! redb-backed persistence for graphs, nodes, edges, and images, enforcing
//! the referential-integrity contract of the watch graph.

mod redb_store;

pub use redb_store::{GraphStore, StoreCounts};
