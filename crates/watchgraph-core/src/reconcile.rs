//! # Edge Reconciliation
//!
//! Converts a node's declared dependency set (the source nodes that should
//! have a watch-before edge targeting it) into the minimal add/remove delta
//! against the current edge view.
//!
//! The diff is pure; dispatching the resulting operations against the store
//! is the caller's concern. `to_add` and `to_remove` are disjoint by
//! construction — they target distinct ordered pairs — so both batches can
//! be applied concurrently, each operation succeeding or failing on its own.

use std::collections::BTreeSet;

use crate::types::{Edge, NodeId};

/// Minimal set of edge mutations bringing a node's incoming edges in line
/// with a desired dependency set. Edges already matching a desired entry
/// appear in neither list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeDelta {
    pub to_add: Vec<Edge>,
    pub to_remove: Vec<Edge>,
}

impl EdgeDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Diff the edges currently targeting `node` against `desired_sources`.
///
/// Output order is deterministic: `to_add` follows the set order of the
/// desired sources, `to_remove` the order of `current`.
pub fn edge_delta(current: &[Edge], node: NodeId, desired_sources: &BTreeSet<NodeId>) -> EdgeDelta {
    let incoming: Vec<Edge> = current.iter().copied().filter(|e| e.target == node).collect();
    let current_sources: BTreeSet<NodeId> = incoming.iter().map(|e| e.source).collect();

    let to_add = desired_sources
        .iter()
        .filter(|source| !current_sources.contains(source))
        .map(|&source| Edge { source, target: node })
        .collect();
    let to_remove = incoming
        .into_iter()
        .filter(|e| !desired_sources.contains(&e.source))
        .collect();

    EdgeDelta { to_add, to_remove }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: u64, target: u64) -> Edge {
        Edge { source: NodeId(source), target: NodeId(target) }
    }

    #[test]
    fn computes_minimal_delta() {
        // Current incoming: A→X, B→X. Desired: {B, C}.
        let current = [edge(1, 10), edge(2, 10)];
        let desired = BTreeSet::from([NodeId(2), NodeId(3)]);

        let delta = edge_delta(&current, NodeId(10), &desired);

        assert_eq!(delta.to_add, vec![edge(3, 10)]);
        assert_eq!(delta.to_remove, vec![edge(1, 10)]);
    }

    #[test]
    fn matching_edges_are_untouched() {
        let current = [edge(1, 10), edge(2, 10)];
        let desired = BTreeSet::from([NodeId(1), NodeId(2)]);

        let delta = edge_delta(&current, NodeId(10), &desired);
        assert!(delta.is_empty());
    }

    #[test]
    fn reapplication_is_idempotent() {
        let current = [edge(1, 10), edge(2, 10)];
        let desired = BTreeSet::from([NodeId(2), NodeId(3)]);
        let first = edge_delta(&current, NodeId(10), &desired);

        // Apply the first delta to the edge view, then diff again.
        let mut applied: Vec<Edge> = current
            .iter()
            .copied()
            .filter(|e| !first.to_remove.contains(e))
            .collect();
        applied.extend(first.to_add.iter().copied());

        let second = edge_delta(&applied, NodeId(10), &desired);
        assert!(second.is_empty());
    }

    #[test]
    fn batches_are_disjoint() {
        let current = [edge(1, 10), edge(2, 10), edge(3, 10)];
        let desired = BTreeSet::from([NodeId(3), NodeId(4), NodeId(5)]);

        let delta = edge_delta(&current, NodeId(10), &desired);
        for added in &delta.to_add {
            assert!(!delta.to_remove.contains(added));
        }
    }

    #[test]
    fn ignores_edges_targeting_other_nodes() {
        let current = [edge(1, 10), edge(1, 11), edge(11, 1)];
        let desired = BTreeSet::new();

        let delta = edge_delta(&current, NodeId(10), &desired);
        assert_eq!(delta.to_remove, vec![edge(1, 10)]);
        assert!(delta.to_add.is_empty());
    }

    #[test]
    fn empty_current_adds_every_desired_source() {
        let desired = BTreeSet::from([NodeId(7), NodeId(3)]);
        let delta = edge_delta(&[], NodeId(10), &desired);

        // BTreeSet order: 3 before 7.
        assert_eq!(delta.to_add, vec![edge(3, 10), edge(7, 10)]);
        assert!(delta.to_remove.is_empty());
    }
}
