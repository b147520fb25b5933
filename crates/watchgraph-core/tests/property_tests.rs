//! # Property-Based Tests
//!
//! These tests ensure determinism and correctness invariants across the
//! sniffer, the identifier codecs, and the edge reconciler.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use proptest::collection::vec;
use proptest::prelude::*;
use watchgraph_core::{Edge, IdCodecs, Namespace, NodeId, edge_delta, sniff};

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Every u64 round-trips through every namespace codec.
    #[test]
    fn codec_round_trips_any_value(value in any::<u64>()) {
        let family = IdCodecs::from_seed("property-seed");
        for namespace in Namespace::ORDER {
            let codec = family.codec(namespace);
            let encoded = codec.encode(value);
            prop_assert!(encoded.len() >= 8);
            prop_assert_eq!(codec.decode(&encoded).unwrap(), value);
        }
    }

    /// Two families built from the same seed encode identically.
    #[test]
    fn codec_families_are_deterministic(value in any::<u64>(), seed in "[a-z]{1,16}") {
        let left = IdCodecs::from_seed(&seed);
        let right = IdCodecs::from_seed(&seed);
        for namespace in Namespace::ORDER {
            prop_assert_eq!(
                left.codec(namespace).encode(value),
                right.codec(namespace).encode(value)
            );
        }
    }

    /// Decoding arbitrary strings never panics; it returns a value or a
    /// typed failure.
    #[test]
    fn codec_decode_is_total(id in "\\PC{0,24}") {
        let family = IdCodecs::from_seed("property-seed");
        let _ = family.node().decode(&id);
    }

    /// Sniffing is total and deterministic over arbitrary buffers.
    #[test]
    fn sniff_is_total_and_deterministic(data in vec(any::<u8>(), 0..2048)) {
        prop_assert_eq!(sniff(&data), sniff(&data));
    }

    /// Applying a delta and rediffing yields the empty delta.
    #[test]
    fn reconciliation_converges(
        current_sources in vec(1u64..200, 0..24),
        desired_sources in vec(1u64..200, 0..24),
    ) {
        let node = NodeId(1000);
        let current: Vec<Edge> = current_sources
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|&source| Edge { source: NodeId(source), target: node })
            .collect();
        let desired: BTreeSet<NodeId> = desired_sources.iter().map(|&s| NodeId(s)).collect();

        let delta = edge_delta(&current, node, &desired);

        // to_add and to_remove never overlap.
        for added in &delta.to_add {
            prop_assert!(!delta.to_remove.contains(added));
        }

        let mut applied: Vec<Edge> = current
            .iter()
            .copied()
            .filter(|e| !delta.to_remove.contains(e))
            .collect();
        applied.extend(delta.to_add.iter().copied());

        let rediff = edge_delta(&applied, node, &desired);
        prop_assert!(rediff.is_empty());

        // The applied view's sources are exactly the desired set.
        let sources: BTreeSet<NodeId> = applied.iter().map(|e| e.source).collect();
        prop_assert_eq!(sources, desired);
    }
}
