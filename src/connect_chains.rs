// SPDX-License-Identifier: AGPL-3.0-or-later

//! Chain extraction.
//!
//! Once the angular sorter has wired `next`/`prev`, every face of the
//! subdivision is bounded by one closed walk of half-edges. This pass labels
//! those walks as chains, computing per chain the signed area (shoelace;
//! positive for the counter-clockwise interior loops, since faces lie left
//! of their boundary) and the perimeter.
//!
//! Chain 0 is reserved for the universe: the conceptual boundary of the
//! unbounded face. It has no half-edges, signed area negative infinity and
//! infinite perimeter, so area-based comparisons treat it as "outermost"
//! without a special case.

use num_traits::Float;
use tracing::debug;

use iron_shapes::CoordinateType;

use crate::error::{CancelPoll, CancelToken, TopologyError};
use crate::geometry::Parentage;
use crate::topo_graph::{ChainId, HalfEdgeId, TopoGraph};

/// Per-chain columns, indexed by [`ChainId`].
#[derive(Debug)]
pub(crate) struct Chains<T> {
    /// Parentage of the face the chain bounds; filled by the sweep.
    pub(crate) face_bits: Vec<Parentage>,
    /// Chain bounding the face this chain is nested in; filled by the
    /// sweep. The universe is its own parent.
    pub(crate) parent: Vec<ChainId>,
    /// Whether the sweep has reached and recorded the chain.
    pub(crate) assigned: Vec<bool>,
    /// Signed shoelace area of the walk.
    pub(crate) area: Vec<T>,
    /// Total edge length of the walk.
    pub(crate) perimeter: Vec<T>,
}

impl<T> Chains<T> {
    pub(crate) fn len(&self) -> usize {
        self.face_bits.len()
    }
}

/// Label every live half-edge with its chain and build the chain table.
pub(crate) fn connect_chains<T>(
    graph: &mut TopoGraph<T>,
    token: &dyn CancelToken,
) -> Result<Chains<T>, TopologyError>
where
    T: CoordinateType + Float,
{
    let mut poll = CancelPoll::new(token);
    let mut chains = Chains {
        face_bits: vec![Parentage::EMPTY],
        parent: vec![ChainId::UNIVERSE],
        assigned: vec![true],
        area: vec![T::neg_infinity()],
        perimeter: vec![T::infinity()],
    };

    let half = T::one() / (T::one() + T::one());
    let n = graph.edges.len();
    for start in 0..n {
        let start = HalfEdgeId(start as u32);
        if !graph.is_alive(start) || graph.edges.chain[start.index()] != ChainId::NONE {
            continue;
        }

        let id = ChainId(chains.len() as u32);
        let mut twice_area = T::zero();
        let mut perimeter = T::zero();
        let mut steps = 0usize;
        let mut e = start;
        loop {
            poll.tick()?;
            steps += 1;
            if steps > n {
                return Err(TopologyError::Internal("half-edge walk does not close"));
            }
            debug_assert!(graph.is_alive(e));
            debug_assert_eq!(graph.edges.chain[e.index()], ChainId::NONE);
            graph.edges.chain[e.index()] = id;

            let o = graph.point(graph.origin(e));
            let d = graph.point(graph.dest(e));
            twice_area = twice_area + (o.x * d.y - d.x * o.y);
            let (dx, dy) = (d.x - o.x, d.y - o.y);
            perimeter = perimeter + (dx * dx + dy * dy).sqrt();

            let next = graph.edges.next[e.index()];
            debug_assert_eq!(graph.edges.prev[next.index()], e);
            e = next;
            if e == start {
                break;
            }
        }

        chains.face_bits.push(Parentage::EMPTY);
        chains.parent.push(ChainId::NONE);
        chains.assigned.push(false);
        chains.area.push(twice_area * half);
        chains.perimeter.push(perimeter);
    }

    debug_assert!(
        chains.perimeter[1..].iter().all(|&p| p > T::zero()),
        "Every chain walks at least one edge."
    );
    let ccw = chains.area[1..].iter().filter(|&&a| a > T::zero()).count();
    debug!(
        chains = chains.len() - 1,
        ccw_loops = ccw,
        "chains connected"
    );
    Ok(chains)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::angular_sort::sort_and_merge;
    use crate::error::NeverCancel;
    use crate::geometry::Geometry;

    fn chained(g: &Geometry<f64>) -> (TopoGraph<f64>, Chains<f64>) {
        let mut graph = TopoGraph::build_single(g, &NeverCancel).unwrap();
        sort_and_merge(&mut graph, &NeverCancel).unwrap();
        let chains = connect_chains(&mut graph, &NeverCancel).unwrap();
        (graph, chains)
    }

    #[test]
    fn square_ring_yields_interior_and_exterior_chains() {
        let g = Geometry::ring(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let (graph, chains) = chained(&g);

        // Universe plus the two sides of the ring.
        assert_eq!(chains.len(), 3);
        let mut areas: Vec<f64> = chains.area[1..].to_vec();
        areas.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(areas, vec![-16.0, 16.0]);
        assert_eq!(chains.perimeter[1], 16.0);
        assert_eq!(chains.perimeter[2], 16.0);

        for e in 0..graph.edges.len() {
            assert_ne!(graph.edges.chain[e], ChainId::NONE);
        }
        // The two halves of a pair bound different faces.
        for p in 0..graph.edges.pair_count() {
            assert_ne!(graph.edges.chain[2 * p], graph.edges.chain[2 * p + 1]);
        }
    }

    #[test]
    fn universe_chain_sentinels() {
        let g = Geometry::line(vec![(0.0, 0.0), (1.0, 0.0)]);
        let (_, chains) = chained(&g);
        assert_eq!(chains.area[0], f64::NEG_INFINITY);
        assert_eq!(chains.perimeter[0], f64::INFINITY);
        assert!(chains.assigned[0]);
    }

    #[test]
    fn open_path_is_one_zero_area_chain() {
        let g = Geometry::line(vec![(0.0, 0.0), (3.0, 0.0), (3.0, 4.0)]);
        let (_, chains) = chained(&g);

        // Both sides of a dangling path belong to the same walk.
        assert_eq!(chains.len(), 2);
        assert_eq!(chains.area[1], 0.0);
        // The walk covers each segment twice.
        assert_eq!(chains.perimeter[1], 2.0 * (3.0 + 4.0));
    }

    #[test]
    fn polygon_with_hole_has_four_chains() {
        let g = Geometry::Polygon(vec![
            vec![(0.0, 0.0), (6.0, 0.0), (6.0, 6.0), (0.0, 6.0)]
                .into_iter()
                .map(|(x, y)| iron_shapes::point::Point::new(x, y))
                .collect(),
            vec![(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 4.0)]
                .into_iter()
                .map(|(x, y)| iron_shapes::point::Point::new(x, y))
                .collect(),
        ]);
        let (_, chains) = chained(&g);

        // Universe, outer ring both sides, hole ring both sides.
        assert_eq!(chains.len(), 5);
        let mut areas: Vec<f64> = chains.area[1..].to_vec();
        areas.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(areas, vec![-36.0, -4.0, 4.0, 36.0]);
    }
}
