// SPDX-License-Identifier: AGPL-3.0-or-later

//! Planar topology graph: clusters and half-edges.
//!
//! The graph is built from one or two *noded* geometries: every segment
//! endpoint and every crossing is a shared vertex, and no segment passes
//! through the interior of another. Under that precondition construction is
//! purely combinatorial. Vertices collapse into *clusters* (identical
//! coordinates, any operand), each input segment becomes a twinned pair of
//! half-edges, and coincident segments are merged later by the angular
//! sorter so that every remaining pair carries the combined parentage of all
//! segments on it.
//!
//! Storage is struct-of-arrays with newtype indices. Cluster ids are
//! assigned in ascending `(y, x)` order, so the sweep can process clusters
//! by id without a priority queue, and the lexicographically smaller
//! endpoint of a pair is simply the one with the smaller cluster id.

use iron_shapes::point::Point;
use iron_shapes::CoordinateType;
use tracing::debug;

use crate::compare_segments::lex_cmp;
use crate::error::{CancelPoll, CancelToken, TopologyError};
use crate::geometry::{Geometry, Operand, Parentage};

/// Index of a cluster (a distinct vertex position). Ids ascend in `(y, x)`
/// sweep order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct ClusterId(pub(crate) u32);

/// Index of a half-edge. The two halves of a pair are adjacent, so the twin
/// is found by flipping the lowest bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct HalfEdgeId(pub(crate) u32);

/// Index of a chain (a closed loop of half-edges bounding a face).
///
/// `ChainId(0)` is the universe chain: the implicit boundary of the
/// unbounded face. It has no half-edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct ChainId(pub(crate) u32);

impl ClusterId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl HalfEdgeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    /// The oppositely directed half of the same pair.
    pub(crate) fn twin(self) -> HalfEdgeId {
        HalfEdgeId(self.0 ^ 1)
    }

    /// Index of the pair this half belongs to; per-pair attributes
    /// (parentage, parity, liveness) are stored once per pair.
    pub(crate) fn pair(self) -> usize {
        (self.0 >> 1) as usize
    }
}

impl ChainId {
    /// The chain of the unbounded face.
    pub(crate) const UNIVERSE: ChainId = ChainId(0);

    /// Sentinel for "not yet assigned".
    pub(crate) const NONE: ChainId = ChainId(u32::MAX);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Per-cluster columns.
#[derive(Debug)]
pub(crate) struct ClusterTable<T> {
    /// Vertex position, ascending in `(y, x)`.
    pub(crate) pos: Vec<Point<T>>,
    /// Operands with any vertex at this cluster.
    pub(crate) bits: Vec<Parentage>,
    /// Operands with an odd number of polyline segment-ends here; for a
    /// line operand this is exactly its topological boundary.
    pub(crate) line_bd: Vec<Parentage>,
    /// Outgoing half-edges; sorted counter-clockwise by the angular sorter.
    pub(crate) out_edges: Vec<Vec<HalfEdgeId>>,
    /// For clusters left with no live edges after merging: the chain of the
    /// face they sit in, filled by the sweep.
    pub(crate) enclosing: Vec<Option<ChainId>>,
}

impl<T> ClusterTable<T> {
    pub(crate) fn len(&self) -> usize {
        self.pos.len()
    }
}

/// Per-half-edge and per-pair columns.
#[derive(Debug)]
pub(crate) struct HalfEdgeTable {
    /// Cluster this half starts at (indexed per half).
    pub(crate) origin: Vec<ClusterId>,
    /// Next half-edge of the same chain (indexed per half).
    pub(crate) next: Vec<HalfEdgeId>,
    /// Inverse of `next` (indexed per half).
    pub(crate) prev: Vec<HalfEdgeId>,
    /// Chain this half belongs to (indexed per half).
    pub(crate) chain: Vec<ChainId>,
    /// Operands with a segment on this pair (indexed per pair, OR-combined
    /// on merge).
    pub(crate) edge_bits: Vec<Parentage>,
    /// Operands whose polygon boundary crosses here an odd number of times
    /// (indexed per pair, XOR-combined on merge). Polyline segments never
    /// toggle face parity.
    pub(crate) toggle_bits: Vec<Parentage>,
    /// Signed winding contribution per operand when crossing the pair
    /// west to east: input travel direction upward counts -1, downward +1
    /// (indexed per pair, summed on merge).
    pub(crate) winding: Vec<[i32; 2]>,
    /// Cleared when the angular sorter merges this pair into a coincident
    /// one (indexed per pair).
    pub(crate) alive: Vec<bool>,
}

impl HalfEdgeTable {
    /// Number of half-edges (always even).
    pub(crate) fn len(&self) -> usize {
        self.origin.len()
    }

    pub(crate) fn pair_count(&self) -> usize {
        self.edge_bits.len()
    }
}

/// The planar subdivision induced by the input segments.
#[derive(Debug)]
pub(crate) struct TopoGraph<T> {
    pub(crate) clusters: ClusterTable<T>,
    pub(crate) edges: HalfEdgeTable,
}

impl<T: CoordinateType> TopoGraph<T> {
    /// Build the graph for a relate query over two operands.
    pub(crate) fn build_pair(
        a: &Geometry<T>,
        b: &Geometry<T>,
        token: &dyn CancelToken,
    ) -> Result<Self, TopologyError> {
        Self::build(&[(a, Operand::A), (b, Operand::B)], token)
    }

    /// Build the graph of a single geometry (simplicity checking).
    pub(crate) fn build_single(
        g: &Geometry<T>,
        token: &dyn CancelToken,
    ) -> Result<Self, TopologyError> {
        Self::build(&[(g, Operand::A)], token)
    }

    fn build(
        operands: &[(&Geometry<T>, Operand)],
        token: &dyn CancelToken,
    ) -> Result<Self, TopologyError> {
        let mut poll = CancelPoll::new(token);

        // Gather tagged segments and lone vertices. Zero-length segments
        // are dropped here; a path that consists only of them degrades to
        // a lone vertex.
        struct Seg<T> {
            p: Point<T>,
            q: Point<T>,
            op: Operand,
            ring: bool,
        }
        let mut segs: Vec<Seg<T>> = Vec::new();
        let mut lone: Vec<(Point<T>, Operand)> = Vec::new();

        for &(geometry, op) in operands {
            let flat = geometry.flattened();
            for (path, ring) in flat.paths() {
                let mut emitted = false;
                let n = path.len();
                let seg_count = if ring { n } else { n.saturating_sub(1) };
                for i in 0..seg_count {
                    let p = path[i];
                    let q = path[(i + 1) % n];
                    if p == q {
                        continue;
                    }
                    segs.push(Seg { p, q, op, ring });
                    emitted = true;
                    poll.tick()?;
                }
                if !emitted {
                    lone.push((path[0], op));
                }
            }
        }

        // Identical coordinates collapse into one cluster; cluster ids are
        // assigned in ascending (y, x) order.
        let mut points: Vec<Point<T>> = Vec::with_capacity(2 * segs.len() + lone.len());
        for s in &segs {
            points.push(s.p);
            points.push(s.q);
        }
        points.extend(lone.iter().map(|&(p, _)| p));
        points.sort_unstable_by(|a, b| lex_cmp(*a, *b));
        points.dedup();

        let find = |p: Point<T>| -> Result<ClusterId, TopologyError> {
            points
                .binary_search_by(|q| lex_cmp(*q, p))
                .map(|i| ClusterId(i as u32))
                .map_err(|_| TopologyError::Internal("vertex missing from cluster table"))
        };

        let n_clusters = points.len();
        let mut clusters = ClusterTable {
            pos: points.clone(),
            bits: vec![Parentage::EMPTY; n_clusters],
            line_bd: vec![Parentage::EMPTY; n_clusters],
            out_edges: vec![Vec::new(); n_clusters],
            enclosing: vec![None; n_clusters],
        };

        let n_halves = 2 * segs.len();
        let mut edges = HalfEdgeTable {
            origin: Vec::with_capacity(n_halves),
            next: Vec::with_capacity(n_halves),
            prev: Vec::with_capacity(n_halves),
            chain: vec![ChainId::NONE; n_halves],
            edge_bits: Vec::with_capacity(segs.len()),
            toggle_bits: Vec::with_capacity(segs.len()),
            winding: Vec::with_capacity(segs.len()),
            alive: vec![true; segs.len()],
        };

        for s in &segs {
            let cp = find(s.p)?;
            let cq = find(s.q)?;
            debug_assert_ne!(cp, cq, "Zero-length segments were skipped.");

            let fwd = HalfEdgeId(edges.origin.len() as u32);
            let rev = fwd.twin();
            edges.origin.push(cp);
            edges.origin.push(cq);
            // Links become real once the angular sorter runs; a pair starts
            // as its own two-edge loop.
            edges.next.push(rev);
            edges.next.push(fwd);
            edges.prev.push(rev);
            edges.prev.push(fwd);

            edges.edge_bits.push(s.op.mask());
            edges.toggle_bits.push(if s.ring { s.op.mask() } else { Parentage::EMPTY });
            // Only ring segments separate faces; a polyline segment must
            // leave every face value unchanged across it.
            let mut w = [0i32; 2];
            if s.ring {
                w[s.op.index()] = if cp < cq { -1 } else { 1 };
            }
            edges.winding.push(w);

            clusters.bits[cp.index()].insert(s.op.mask());
            clusters.bits[cq.index()].insert(s.op.mask());
            clusters.out_edges[cp.index()].push(fwd);
            clusters.out_edges[cq.index()].push(rev);
            if !s.ring {
                clusters.line_bd[cp.index()].toggle(s.op.mask());
                clusters.line_bd[cq.index()].toggle(s.op.mask());
            }
            poll.tick()?;
        }

        for &(p, op) in &lone {
            clusters.bits[find(p)?.index()].insert(op.mask());
        }

        debug!(
            clusters = clusters.len(),
            pairs = edges.pair_count(),
            "topology graph built"
        );
        Ok(TopoGraph { clusters, edges })
    }
}

impl<T: CoordinateType> TopoGraph<T> {
    pub(crate) fn point(&self, c: ClusterId) -> Point<T> {
        self.clusters.pos[c.index()]
    }

    pub(crate) fn origin(&self, e: HalfEdgeId) -> ClusterId {
        self.edges.origin[e.index()]
    }

    pub(crate) fn dest(&self, e: HalfEdgeId) -> ClusterId {
        self.edges.origin[e.twin().index()]
    }

    /// Direction vector of the half-edge, origin to destination.
    pub(crate) fn direction(&self, e: HalfEdgeId) -> (T, T) {
        let o = self.point(self.origin(e));
        let d = self.point(self.dest(e));
        (d.x - o.x, d.y - o.y)
    }

    pub(crate) fn is_alive(&self, e: HalfEdgeId) -> bool {
        self.edges.alive[e.pair()]
    }

    /// The half of the pair whose origin is the lexicographically smaller
    /// endpoint. Cluster ids ascend in sweep order, so this is an id
    /// comparison.
    pub(crate) fn up_half(&self, e: HalfEdgeId) -> HalfEdgeId {
        if self.origin(e) < self.dest(e) {
            e
        } else {
            e.twin()
        }
    }

    pub(crate) fn is_horizontal(&self, e: HalfEdgeId) -> bool {
        let o = self.point(self.origin(e));
        let d = self.point(self.dest(e));
        o.y == d.y
    }

    /// Live outgoing half-edges of a cluster.
    pub(crate) fn live_out(&self, c: ClusterId) -> impl Iterator<Item = HalfEdgeId> + '_ {
        self.clusters.out_edges[c.index()]
            .iter()
            .copied()
            .filter(move |&e| self.is_alive(e))
    }
}
