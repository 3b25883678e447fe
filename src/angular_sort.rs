// SPDX-License-Identifier: AGPL-3.0-or-later

//! Angular sorting, coincident-segment merging and face relinking.
//!
//! After graph construction every cluster holds its outgoing half-edges in
//! input order. This pass sorts them counter-clockwise, collapses coincident
//! duplicates into one pair carrying the combined parentage, and wires the
//! `next`/`prev` links so that every face of the subdivision is bounded by
//! one closed chain of half-edges, the face lying to the LEFT of each of
//! them.
//!
//! Because the input is noded, two segments out of the same cluster in the
//! same direction necessarily share both endpoints, so coincident duplicates
//! are exactly the ties of the angular order.

use itertools::Itertools;
use tracing::debug;

use iron_shapes::point::Point;
use iron_shapes::CoordinateType;

use crate::compare_segments::cmp_ccw;
use crate::error::{CancelPoll, CancelToken, TopologyError};
use crate::relate_ops::NonSimpleReason;
use crate::topo_graph::{HalfEdgeId, HalfEdgeTable, TopoGraph};

/// Sort all clusters, merge coincident pairs and relink faces.
pub(crate) fn sort_and_merge<T: CoordinateType>(
    graph: &mut TopoGraph<T>,
    token: &dyn CancelToken,
) -> Result<(), TopologyError> {
    let merged = merge_pass(graph, token, false)?;
    debug_assert!(merged.is_none());
    link_pass(graph, token)
}

/// Merge pass only, watching for self-intersection evidence: coincident
/// duplicates within one geometry, or more than two live edges meeting at a
/// cluster. Returns the first anomaly instead of linking faces.
pub(crate) fn find_non_simple<T: CoordinateType>(
    graph: &mut TopoGraph<T>,
    token: &dyn CancelToken,
) -> Result<Option<(NonSimpleReason, Point<T>)>, TopologyError> {
    if let Some(spot) = merge_pass(graph, token, true)? {
        return Ok(Some(spot));
    }
    let mut poll = CancelPoll::new(token);
    for c in 0..graph.clusters.len() {
        poll.tick()?;
        let live = graph.clusters.out_edges[c]
            .iter()
            .filter(|&&e| graph.is_alive(e))
            .count();
        if live > 2 {
            return Ok(Some((NonSimpleReason::CrossOver, graph.clusters.pos[c])));
        }
    }
    Ok(None)
}

/// Sort each cluster's outgoing edges counter-clockwise and merge adjacent
/// coincident duplicates. A pair killed here stays in the out-lists of both
/// endpoints and is skipped through its liveness flag.
fn merge_pass<T: CoordinateType>(
    graph: &mut TopoGraph<T>,
    token: &dyn CancelToken,
    detect: bool,
) -> Result<Option<(NonSimpleReason, Point<T>)>, TopologyError> {
    let mut poll = CancelPoll::new(token);
    let mut merged_pairs = 0usize;

    for c in 0..graph.clusters.len() {
        poll.tick()?;
        let mut out: Vec<HalfEdgeId> = graph.clusters.out_edges[c]
            .iter()
            .copied()
            .filter(|&e| graph.is_alive(e))
            .collect();
        out.sort_unstable_by(|&a, &b| cmp_ccw(graph.direction(a), graph.direction(b)));

        // Same origin, same destination: the segments are identical, and
        // the angular sort has made them adjacent.
        let groups: Vec<Vec<HalfEdgeId>> = {
            let grouped = out.iter().group_by(|&&e| graph.dest(e));
            (&grouped)
                .into_iter()
                .map(|(_, g)| g.copied().collect())
                .collect()
        };

        for group in &groups {
            if group.len() < 2 {
                continue;
            }
            if detect {
                return Ok(Some((
                    NonSimpleReason::OverlappingSegments,
                    graph.clusters.pos[c],
                )));
            }
            let survivor = group[0];
            for &dupe in &group[1..] {
                debug_assert_eq!(graph.origin(survivor), graph.origin(dupe));
                debug_assert_eq!(graph.dest(survivor), graph.dest(dupe));
                merge_into(&mut graph.edges, survivor, dupe);
                merged_pairs += 1;
            }
        }

        graph.clusters.out_edges[c] = groups.into_iter().map(|g| g[0]).collect();
    }

    if merged_pairs > 0 {
        debug!(merged_pairs, "coincident segments merged");
    }
    Ok(None)
}

/// Fold a coincident duplicate into its survivor: parentage ORs, polygon
/// crossing parity XORs, winding contributions add. The duplicate's pair is
/// dead afterwards.
fn merge_into(edges: &mut HalfEdgeTable, survivor: HalfEdgeId, dupe: HalfEdgeId) {
    let (s, d) = (survivor.pair(), dupe.pair());
    debug_assert!(edges.alive[s] && edges.alive[d]);

    let bits = edges.edge_bits[d];
    edges.edge_bits[s].insert(bits);
    let toggles = edges.toggle_bits[d];
    edges.toggle_bits[s].toggle(toggles);
    let w = edges.winding[d];
    edges.winding[s][0] += w[0];
    edges.winding[s][1] += w[1];
    edges.alive[d] = false;
}

/// Wire `next`/`prev` so each face is bounded by one chain, face to the
/// left: in the counter-clockwise out-list `[e_0 .. e_{k-1}]` of a cluster,
/// the edge arriving along `e_i` continues to `e_{i-1}` (its clockwise
/// neighbor), which keeps the traversal hugging the same face.
fn link_pass<T: CoordinateType>(
    graph: &mut TopoGraph<T>,
    token: &dyn CancelToken,
) -> Result<(), TopologyError> {
    let mut poll = CancelPoll::new(token);

    for c in 0..graph.clusters.len() {
        poll.tick()?;
        // Out-lists were rewritten to live survivors by the merge pass, but
        // a pair can still die when its other endpoint merges later.
        let out: Vec<HalfEdgeId> = graph.clusters.out_edges[c]
            .iter()
            .copied()
            .filter(|&e| graph.is_alive(e))
            .collect();

        let k = out.len();
        for i in 0..k {
            let incoming = out[i].twin();
            let continuation = out[(i + k - 1) % k];
            graph.edges.next[incoming.index()] = continuation;
            graph.edges.prev[continuation.index()] = incoming;
        }
    }
    Ok(())
}
