// SPDX-License-Identifier: AGPL-3.0-or-later

//! Plane-sweep propagation of face values.
//!
//! A sweep line moves bottom to top over the clusters (ascending `(y, x)`,
//! which is ascending cluster id, so no priority queue is needed). The
//! active set holds the non-horizontal pairs currently crossing the sweep
//! line, ordered west to east by the exact comparator from
//! [`crate::compare_segments`]. Every face value is derived from the value
//! of the unbounded face by crossing pairs west to east: when a pair enters
//! the sweep at its bottom endpoint, the value west of it is read off its
//! left neighbor and the value east of it follows from the pair's own
//! attributes. Both chains of the pair are thereby known and recorded.
//!
//! What "crossing a pair" does to the value is the only part that differs
//! between use cases, so it is factored into a [`Propagator`]: even-odd
//! parentage parity for relate queries, or a signed winding count per
//! operand for orientation-aware callers.
//!
//! Horizontal pairs never enter the active set. A chain consisting solely
//! of horizontal edges (a degenerate, zero-area walk whose two sides face
//! the same region) and a cluster with no live edges at all are located
//! with a probe: a degenerate active-set entry ordering east of everything
//! through its point.

use libreda_splay::SplaySet;
use tracing::debug;

use iron_shapes::CoordinateType;

use crate::compare_segments::{compare_active, ActiveSeg};
use crate::connect_chains::Chains;
use crate::error::{CancelPoll, CancelToken, TopologyError};
use crate::geometry::Parentage;
use crate::topo_graph::{ChainId, ClusterId, HalfEdgeId, HalfEdgeTable, TopoGraph};

/// How a face-describing value changes when stepping east across a pair.
pub(crate) trait Propagator {
    /// The per-face value.
    type Acc: Copy + PartialEq + std::fmt::Debug;

    /// Value of the unbounded face.
    const UNIVERSE: Self::Acc;

    /// Value just east of `pair`, given the value just west of it.
    fn cross(edges: &HalfEdgeTable, west: Self::Acc, pair: usize) -> Self::Acc;
}

/// Even-odd parentage: an operand covers a face iff its polygon boundary
/// separates the face from the universe an odd number of times. This is the
/// mode relate queries run.
pub(crate) struct FaceParity;

impl Propagator for FaceParity {
    type Acc = Parentage;
    const UNIVERSE: Parentage = Parentage::EMPTY;

    fn cross(edges: &HalfEdgeTable, west: Parentage, pair: usize) -> Parentage {
        west ^ edges.toggle_bits[pair]
    }
}

/// Signed winding number per operand, respecting input ring orientation.
/// Relate queries do not need it; it shares the sweep skeleton with the
/// even-odd mode and is kept exercised by the tests below.
#[allow(unused)]
pub(crate) struct WindingCount;

impl Propagator for WindingCount {
    type Acc = [i32; 2];
    const UNIVERSE: [i32; 2] = [0, 0];

    fn cross(edges: &HalfEdgeTable, west: [i32; 2], pair: usize) -> [i32; 2] {
        let w = edges.winding[pair];
        [west[0] + w[0], west[1] + w[1]]
    }
}

/// Run the sweep: compute one face value per chain, assign every chain its
/// nesting parent, and locate every edge-free cluster. Returns the face
/// values indexed by chain.
pub(crate) fn propagate<P, T>(
    graph: &mut TopoGraph<T>,
    chains: &mut Chains<T>,
    token: &dyn CancelToken,
) -> Result<Vec<P::Acc>, TopologyError>
where
    P: Propagator,
    T: CoordinateType,
{
    let mut poll = CancelPoll::new(token);
    let n_chains = chains.len();
    let mut face: Vec<Option<P::Acc>> = vec![None; n_chains];
    let mut parent: Vec<ChainId> = vec![ChainId::NONE; n_chains];
    face[ChainId::UNIVERSE.index()] = Some(P::UNIVERSE);
    parent[ChainId::UNIVERSE.index()] = ChainId::UNIVERSE;

    // Value west of each pair while it is active.
    let mut west: Vec<P::Acc> = vec![P::UNIVERSE; graph.edges.pair_count()];

    let mut active = SplaySet::new(compare_active::<T>);

    // The active-set entry of a pair, rebuilt on demand.
    let seg_of = |graph: &TopoGraph<T>, pair: usize| -> ActiveSeg<T> {
        let up = graph.up_half(HalfEdgeId(2 * pair as u32));
        ActiveSeg {
            bottom: graph.point(graph.origin(up)),
            top: graph.point(graph.dest(up)),
            seq: pair as u32,
        }
    };

    // Chain bounding the face just east of an active entry.
    let east_chain = |graph: &TopoGraph<T>, seg: &ActiveSeg<T>| -> ChainId {
        let up = graph.up_half(HalfEdgeId(2 * seg.seq));
        graph.edges.chain[up.twin().index()]
    };

    let record = |chain: ChainId,
                      value: P::Acc,
                      par: ChainId,
                      face: &mut Vec<Option<P::Acc>>,
                      parent: &mut Vec<ChainId>|
     -> Result<(), TopologyError> {
        match face[chain.index()] {
            None => {
                face[chain.index()] = Some(value);
                parent[chain.index()] = par;
                Ok(())
            }
            Some(prev) if prev == value => Ok(()),
            Some(_) => Err(TopologyError::Internal(
                "conflicting face values reached one chain",
            )),
        }
    };

    for c in 0..graph.clusters.len() {
        poll.tick()?;
        let c = ClusterId(c as u32);
        let here = graph.point(c);

        // Pairs ending at this cluster leave the sweep.
        let mut starting: Vec<HalfEdgeId> = Vec::new();
        let mut any_live = false;
        let mut horizontal_chains: Vec<ChainId> = Vec::new();
        for e in graph.live_out(c) {
            any_live = true;
            if graph.is_horizontal(e) {
                if graph.dest(e) > c {
                    horizontal_chains.push(graph.edges.chain[e.index()]);
                    horizontal_chains.push(graph.edges.chain[e.twin().index()]);
                }
            } else if graph.dest(e) < c {
                let removed = active.remove(&seg_of(graph, e.pair()));
                debug_assert!(removed, "Ending pair was not active.");
            } else {
                starting.push(e);
            }
        }

        // Pairs starting here enter west to east, so a pair's left neighbor
        // is fully set up before the pair reads it.
        starting.sort_unstable_by(|&a, &b| {
            compare_active(&seg_of(graph, a.pair()), &seg_of(graph, b.pair()))
        });
        for &e in &starting {
            let pair = e.pair();
            let seg = seg_of(graph, pair);
            active.insert(seg);

            let (w, west_parent) = match active.prev(&seg).copied() {
                Some(l) => (
                    P::cross(&graph.edges, west[l.seq as usize], l.seq as usize),
                    east_chain(graph, &l),
                ),
                None => (P::UNIVERSE, ChainId::UNIVERSE),
            };
            west[pair] = w;
            let e_val = P::cross(&graph.edges, w, pair);

            // `e` starts at the bottom endpoint, so it is the up half; the
            // face on its left is the west one.
            debug_assert_eq!(graph.up_half(e), e);
            let chain_w = graph.edges.chain[e.index()];
            let chain_e = graph.edges.chain[e.twin().index()];
            record(chain_w, w, west_parent, &mut face, &mut parent)?;
            record(chain_e, e_val, chain_w, &mut face, &mut parent)?;
        }

        // Probe the region east of everything passing through this point.
        let locate = |active: &mut SplaySet<ActiveSeg<T>, _>,
                          graph: &TopoGraph<T>|
         -> (P::Acc, ChainId) {
            let probe = ActiveSeg::probe(here);
            active.insert(probe);
            let left = active.prev(&probe).copied();
            active.remove(&probe);
            match left {
                Some(l) => (
                    P::cross(&graph.edges, west[l.seq as usize], l.seq as usize),
                    east_chain(graph, &l),
                ),
                None => (P::UNIVERSE, ChainId::UNIVERSE),
            }
        };

        // Chains that this event's insertions already reached must not be
        // probed: the probe's region is only one of their two sides.
        horizontal_chains.retain(|ch| face[ch.index()].is_none());
        if !horizontal_chains.is_empty() {
            // A chain still unassigned here is the one-sided wrap of a
            // degenerate walk, so both of its sides face the probed region.
            let (value, par) = locate(&mut active, graph);
            for ch in horizontal_chains {
                record(ch, value, par, &mut face, &mut parent)?;
            }
        }

        if !any_live {
            let (_, par) = locate(&mut active, graph);
            graph.clusters.enclosing[c.index()] = Some(par);
        }
    }

    debug_assert!(active.len() == 0, "Pairs left active after the sweep.");

    let mut values = Vec::with_capacity(n_chains);
    for (i, v) in face.into_iter().enumerate() {
        match v {
            Some(v) => values.push(v),
            None => return Err(TopologyError::Internal("chain untouched by the sweep")),
        }
        chains.parent[i] = parent[i];
        chains.assigned[i] = true;
    }
    debug_assert!(chains.parent.iter().all(|&p| p != ChainId::NONE));
    debug!(chains = n_chains, "face values propagated");
    Ok(values)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::angular_sort::sort_and_merge;
    use crate::error::NeverCancel;
    use crate::geometry::{Geometry, Operand};
    use iron_shapes::point::Point;

    fn pipeline(
        a: &Geometry<f64>,
        b: Option<&Geometry<f64>>,
    ) -> (TopoGraph<f64>, Chains<f64>) {
        let mut graph = match b {
            Some(b) => TopoGraph::build_pair(a, b, &NeverCancel).unwrap(),
            None => TopoGraph::build_single(a, &NeverCancel).unwrap(),
        };
        sort_and_merge(&mut graph, &NeverCancel).unwrap();
        let mut chains = crate::connect_chains::connect_chains(&mut graph, &NeverCancel).unwrap();
        let values = propagate::<FaceParity, f64>(&mut graph, &mut chains, &NeverCancel).unwrap();
        chains.face_bits = values;
        (graph, chains)
    }

    fn chain_with_area(chains: &Chains<f64>, area: f64) -> ChainId {
        let i = chains.area.iter().position(|&a| a == area).unwrap();
        ChainId(i as u32)
    }

    #[test]
    fn square_faces_and_parents() {
        let g = Geometry::ring(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let (_, chains) = pipeline(&g, None);

        let inner = chain_with_area(&chains, 16.0);
        let outer = chain_with_area(&chains, -16.0);
        assert_eq!(chains.face_bits[inner.index()], Operand::A.mask());
        assert!(chains.face_bits[outer.index()].is_empty());
        assert_eq!(chains.parent[outer.index()], ChainId::UNIVERSE);
        assert_eq!(chains.parent[inner.index()], outer);
    }

    #[test]
    fn hole_face_is_outside_again() {
        let ring = |pts: Vec<(f64, f64)>| pts.into_iter().map(Point::from).collect();
        let g = Geometry::Polygon(vec![
            ring(vec![(0.0, 0.0), (6.0, 0.0), (6.0, 6.0), (0.0, 6.0)]),
            ring(vec![(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 4.0)]),
        ]);
        let (_, chains) = pipeline(&g, None);

        // The annulus is covered; the hole is not.
        let annulus_side = chain_with_area(&chains, 36.0);
        let hole_inner = chain_with_area(&chains, 4.0);
        let hole_outer = chain_with_area(&chains, -4.0);
        assert_eq!(chains.face_bits[annulus_side.index()], Operand::A.mask());
        assert_eq!(chains.face_bits[hole_outer.index()], Operand::A.mask());
        assert!(chains.face_bits[hole_inner.index()].is_empty());
        assert_eq!(chains.parent[hole_outer.index()], annulus_side);
        assert_eq!(chains.parent[hole_inner.index()], hole_outer);
    }

    #[test]
    fn overlap_region_carries_both_operands() {
        // Pre-noded overlapping squares sharing the region [2,4]x[0,4].
        let a = Geometry::Polygon(vec![vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(2.0, 4.0),
            Point::new(0.0, 4.0),
        ]]);
        let b = Geometry::Polygon(vec![vec![
            Point::new(2.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(6.0, 0.0),
            Point::new(6.0, 4.0),
            Point::new(4.0, 4.0),
            Point::new(2.0, 4.0),
        ]]);
        let (_, chains) = pipeline(&a, Some(&b));

        let both = Parentage(3);
        assert!(chains.face_bits.iter().any(|&f| f == both));
        assert!(chains.face_bits.iter().any(|&f| f == Operand::A.mask()));
        assert!(chains.face_bits.iter().any(|&f| f == Operand::B.mask()));
    }

    #[test]
    fn dangling_line_inside_polygon() {
        let a = Geometry::ring(vec![(0.0, 0.0), (8.0, 0.0), (8.0, 8.0), (0.0, 8.0)]);
        let b = Geometry::line(vec![(2.0, 2.0), (5.0, 3.0), (6.0, 6.0)]);
        let (_, chains) = pipeline(&a, Some(&b));

        // The line chain has zero area and sits in A's interior.
        let line_chain = (1..chains.len())
            .find(|&i| chains.area[i] == 0.0)
            .map(|i| ChainId(i as u32))
            .unwrap();
        assert_eq!(chains.face_bits[line_chain.index()], Operand::A.mask());
        let parent = chains.parent[line_chain.index()];
        assert_eq!(chains.area[parent.index()], 64.0);
    }

    #[test]
    fn horizontal_segment_located_by_probe() {
        let a = Geometry::ring(vec![(0.0, 0.0), (8.0, 0.0), (8.0, 8.0), (0.0, 8.0)]);
        let b = Geometry::line(vec![(2.0, 4.0), (6.0, 4.0)]);
        let (_, chains) = pipeline(&a, Some(&b));

        let line_chain = (1..chains.len())
            .find(|&i| chains.area[i] == 0.0)
            .map(|i| ChainId(i as u32))
            .unwrap();
        assert_eq!(chains.face_bits[line_chain.index()], Operand::A.mask());
    }

    #[test]
    fn isolated_cluster_gets_enclosing_chain() {
        let a = Geometry::ring(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let b = Geometry::point(2.0, 2.0);
        let (graph, chains) = pipeline(&a, Some(&b));

        let c = graph
            .clusters
            .pos
            .iter()
            .position(|&p| p == Point::new(2.0, 2.0))
            .unwrap();
        let enclosing = graph.clusters.enclosing[c].unwrap();
        assert_eq!(chains.face_bits[enclosing.index()], Operand::A.mask());

        let outside = Geometry::point(9.0, 9.0);
        let (graph, _) = pipeline(&a, Some(&outside));
        let c = graph
            .clusters
            .pos
            .iter()
            .position(|&p| p == Point::new(9.0, 9.0))
            .unwrap();
        assert_eq!(graph.clusters.enclosing[c], Some(ChainId::UNIVERSE));
    }

    #[test]
    fn winding_respects_orientation() {
        let ccw = Geometry::ring(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let cw = Geometry::ring(vec![(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)]);

        for (g, expected) in [(ccw, 1), (cw, -1)] {
            let mut graph = TopoGraph::build_single(&g, &NeverCancel).unwrap();
            sort_and_merge(&mut graph, &NeverCancel).unwrap();
            let mut chains =
                crate::connect_chains::connect_chains(&mut graph, &NeverCancel).unwrap();
            let winding =
                propagate::<WindingCount, f64>(&mut graph, &mut chains, &NeverCancel).unwrap();
            let interior = (1..chains.len())
                .find(|&i| chains.area[i].abs() == 16.0 && winding[i][0] != 0)
                .unwrap();
            assert_eq!(winding[interior], [expected, 0]);
        }
    }

    #[test]
    fn lines_never_split_faces() {
        // A polyline bounds no area; both of its sides are the same face,
        // in either propagation mode.
        let g = Geometry::line(vec![(0.0, 0.0), (0.0, 4.0)]);
        let mut graph = TopoGraph::build_single(&g, &NeverCancel).unwrap();
        sort_and_merge(&mut graph, &NeverCancel).unwrap();
        let mut chains = crate::connect_chains::connect_chains(&mut graph, &NeverCancel).unwrap();

        let even_odd = propagate::<FaceParity, f64>(&mut graph, &mut chains, &NeverCancel).unwrap();
        assert_eq!(even_odd[1], Parentage::EMPTY);
        let winding =
            propagate::<WindingCount, f64>(&mut graph, &mut chains, &NeverCancel).unwrap();
        assert_eq!(winding[1], [0, 0]);
    }
}
