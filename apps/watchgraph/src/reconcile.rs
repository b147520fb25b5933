//! # Edge Delta Dispatch
//!
//! Applies an [`EdgeDelta`] against the shared store: one task per
//! operation, both batches in flight together. The operations target
//! distinct ordered pairs, so no ordering is required between them and a
//! failure never rolls back its siblings.
//!
//! The outcome carries exactly the succeeded subset per batch. Callers must
//! reconcile their local view to that ground truth rather than assume the
//! full requested delta applied. Dropping the future abandons in-flight
//! operations; already-committed ones stay committed.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinSet;
use watchgraph_core::{Edge, EdgeDelta, GraphStore};

/// The store handle shared between the HTTP state and dispatched tasks.
pub type SharedStore = Arc<RwLock<GraphStore>>;

/// The applied subset of a requested delta.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub added: Vec<Edge>,
    pub removed: Vec<Edge>,
    pub failed: usize,
}

impl ReconcileOutcome {
    pub fn is_partial(&self) -> bool {
        self.failed > 0
    }
}

enum Applied {
    Added(Edge),
    Removed(Edge),
}

/// Dispatch every add and remove concurrently and collect the successes.
pub async fn apply_edge_delta(store: SharedStore, delta: EdgeDelta) -> ReconcileOutcome {
    let mut tasks: JoinSet<Result<Applied, Edge>> = JoinSet::new();

    for edge in delta.to_add {
        let store = Arc::clone(&store);
        tasks.spawn(async move {
            match store.write().await.create_edge(edge.source, edge.target) {
                Ok(created) => Ok(Applied::Added(created)),
                Err(err) => {
                    tracing::warn!(?edge, %err, "edge create failed during reconciliation");
                    Err(edge)
                }
            }
        });
    }
    for edge in delta.to_remove {
        let store = Arc::clone(&store);
        tasks.spawn(async move {
            match store.write().await.delete_edge(edge.source, edge.target) {
                Ok(()) => Ok(Applied::Removed(edge)),
                Err(err) => {
                    tracing::warn!(?edge, %err, "edge delete failed during reconciliation");
                    Err(edge)
                }
            }
        });
    }

    let mut outcome = ReconcileOutcome::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(Applied::Added(edge))) => outcome.added.push(edge),
            Ok(Ok(Applied::Removed(edge))) => outcome.removed.push(edge),
            Ok(Err(_)) => outcome.failed += 1,
            Err(join_err) => {
                tracing::warn!(%join_err, "reconciliation task did not complete");
                outcome.failed += 1;
            }
        }
    }

    // Join order is nondeterministic; report stable output.
    outcome.added.sort();
    outcome.removed.sort();

    if outcome.is_partial() {
        tracing::warn!(
            failed = outcome.failed,
            added = outcome.added.len(),
            removed = outcome.removed.len(),
            "partial edge reconciliation"
        );
    }
    outcome
}

// =============================================================================
// TESTS
// =============================================================================
