// SPDX-License-Identifier: AGPL-3.0-or-later

//! Matrix evaluation rules.
//!
//! With face parentage propagated, every cell of the relation matrix is
//! decided by local evidence: a face covered by some operands, a half-edge
//! pair carried by some operands, a cluster hosting vertices, line
//! boundaries or lone points. Which cell a piece of evidence feeds depends
//! only on the pair of operand types, so the evaluator is a fixed rule
//! table per type pair, applied in three passes (chains, then edge pairs,
//! then clusters).
//!
//! The evaluator expects the canonical operand order: the first operand's
//! dimension is at least the second's. Callers swap and transpose.
//!
//! Passes run under a monotonic accumulator; when a target pattern is
//! given, evaluation stops the moment the pattern is decided.

use tracing::trace;

use iron_shapes::CoordinateType;

use crate::connect_chains::Chains;
use crate::error::{CancelPoll, CancelToken, TopologyError};
use crate::geometry::{GeometryClass, Operand, Parentage};
use crate::relation_matrix::{ceilings, MatrixAcc, MatrixCell, Pattern, RelationMatrix};
use crate::topo_graph::{ClusterId, HalfEdgeId, TopoGraph};

/// The six canonical type pairs, first operand dimension >= second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Family {
    AreaArea,
    AreaLine,
    AreaPoint,
    LineLine,
    LinePoint,
    PointPoint,
}

impl Family {
    pub(crate) fn of(a: GeometryClass, b: GeometryClass) -> Family {
        use GeometryClass::*;
        debug_assert!(a >= b, "Canonical order puts the higher dimension first.");
        match (a, b) {
            (Area, Area) => Family::AreaArea,
            (Area, Line) => Family::AreaLine,
            (Area, Point) => Family::AreaPoint,
            (Line, Line) => Family::LineLine,
            (Line, Point) => Family::LinePoint,
            (Point, Point) => Family::PointPoint,
            _ => unreachable!("non-canonical operand order"),
        }
    }

    fn classes(self) -> (GeometryClass, GeometryClass) {
        use GeometryClass::*;
        match self {
            Family::AreaArea => (Area, Area),
            Family::AreaLine => (Area, Line),
            Family::AreaPoint => (Area, Point),
            Family::LineLine => (Line, Line),
            Family::LinePoint => (Line, Point),
            Family::PointPoint => (Point, Point),
        }
    }
}

/// Result of a rule run.
pub(crate) enum Evaluation {
    /// The target pattern was decided before the traversal finished.
    Decided(bool),
    /// The traversal completed; the full matrix is available.
    Matrix(RelationMatrix),
}

/// Evaluate the full matrix.
pub(crate) fn evaluate_matrix<T: CoordinateType>(
    family: Family,
    graph: &TopoGraph<T>,
    chains: &Chains<T>,
    token: &dyn CancelToken,
) -> Result<RelationMatrix, TopologyError> {
    match run(family, graph, chains, None, token)? {
        Evaluation::Matrix(m) => Ok(m),
        Evaluation::Decided(_) => Err(TopologyError::Internal(
            "pattern decision without a target pattern",
        )),
    }
}

/// Evaluate just far enough to decide the pattern.
pub(crate) fn evaluate_pattern<T: CoordinateType>(
    family: Family,
    graph: &TopoGraph<T>,
    chains: &Chains<T>,
    pattern: &Pattern,
    token: &dyn CancelToken,
) -> Result<bool, TopologyError> {
    match run(family, graph, chains, Some(pattern), token)? {
        Evaluation::Decided(hit) => {
            trace!(hit, "pattern decided early");
            Ok(hit)
        }
        Evaluation::Matrix(m) => Ok(pattern.matches(&m)),
    }
}

fn run<T: CoordinateType>(
    family: Family,
    graph: &TopoGraph<T>,
    chains: &Chains<T>,
    pattern: Option<&Pattern>,
    token: &dyn CancelToken,
) -> Result<Evaluation, TopologyError> {
    debug_assert!(
        chains.assigned.iter().all(|&done| done),
        "Evaluation requires fully propagated chains."
    );
    let (ca, cb) = family.classes();
    let mut acc = MatrixAcc::new(ceilings(ca, cb));
    let mut poll = CancelPoll::new(token);
    let a = Operand::A;
    let b = Operand::B;

    // Cells the type pair alone forces: both operands are bounded, so both
    // exteriors share the unbounded plane, and a higher-dimensional first
    // operand always reaches into the second's exterior.
    acc.bump(MatrixCell::EE, 2);
    match family {
        Family::AreaLine => acc.bump(MatrixCell::IE, 2),
        Family::AreaPoint => {
            acc.bump(MatrixCell::IE, 2);
            acc.bump(MatrixCell::BE, 1);
        }
        Family::LinePoint => acc.bump(MatrixCell::IE, 1),
        Family::AreaArea | Family::LineLine | Family::PointPoint => {}
    }
    if let Some(p) = pattern {
        if let Some(hit) = acc.decide(p) {
            return Ok(Evaluation::Decided(hit));
        }
    }

    macro_rules! step {
        () => {
            poll.tick()?;
            if let Some(p) = pattern {
                if let Some(hit) = acc.decide(p) {
                    return Ok(Evaluation::Decided(hit));
                }
            }
        };
    }

    // Faces: only area operands cover faces.
    if family == Family::AreaArea {
        for face in &chains.face_bits {
            if face.contains(a) && face.contains(b) {
                acc.bump(MatrixCell::II, 2);
            } else if face.contains(a) {
                acc.bump(MatrixCell::IE, 2);
            } else if face.contains(b) {
                acc.bump(MatrixCell::EI, 2);
            }
            step!();
        }
    }

    // Half-edge pairs: 1-dimensional evidence.
    if matches!(family, Family::AreaArea | Family::AreaLine | Family::LineLine) {
        for pair in 0..graph.edges.pair_count() {
            if !graph.edges.alive[pair] {
                continue;
            }
            let eb = graph.edges.edge_bits[pair];
            let half = HalfEdgeId(2 * pair as u32);
            let sides = chains.face_bits[graph.edges.chain[half.index()].index()]
                | chains.face_bits[graph.edges.chain[half.twin().index()].index()];

            match family {
                Family::AreaArea => {
                    if eb.contains(a) && eb.contains(b) {
                        acc.bump(MatrixCell::BB, 1);
                    } else if eb.contains(a) {
                        // A boundary edge not on B's boundary lies entirely
                        // inside or entirely outside B.
                        if sides.contains(b) {
                            acc.bump(MatrixCell::BI, 1);
                        } else {
                            acc.bump(MatrixCell::BE, 1);
                        }
                    } else if sides.contains(a) {
                        acc.bump(MatrixCell::IB, 1);
                    } else {
                        acc.bump(MatrixCell::EB, 1);
                    }
                }
                Family::AreaLine => {
                    if eb.contains(b) {
                        if eb.contains(a) {
                            acc.bump(MatrixCell::BI, 1);
                        } else if sides.contains(a) {
                            acc.bump(MatrixCell::II, 1);
                        } else {
                            acc.bump(MatrixCell::EI, 1);
                        }
                    } else {
                        acc.bump(MatrixCell::BE, 1);
                    }
                }
                Family::LineLine => {
                    if eb.contains(a) && eb.contains(b) {
                        acc.bump(MatrixCell::II, 1);
                    } else if eb.contains(a) {
                        acc.bump(MatrixCell::IE, 1);
                    } else {
                        acc.bump(MatrixCell::EI, 1);
                    }
                }
                _ => unreachable!(),
            }
            step!();
        }
    }

    // Clusters: 0-dimensional evidence.
    for c in 0..graph.clusters.len() {
        let cb_mask = graph.clusters.bits[c];
        let bd = graph.clusters.line_bd[c];
        let c = ClusterId(c as u32);
        // Interior of a line operand: on the line but not a path endpoint.
        let a_interior = cb_mask.contains(a) && !bd.contains(a);
        let b_interior = cb_mask.contains(b) && !bd.contains(b);

        match family {
            Family::AreaArea => {
                if cb_mask.contains(a) && cb_mask.contains(b) {
                    acc.bump(MatrixCell::BB, 0);
                }
            }
            Family::AreaLine => {
                if cb_mask.contains(a) {
                    if b_interior {
                        acc.bump(MatrixCell::BI, 0);
                    }
                    if bd.contains(b) {
                        acc.bump(MatrixCell::BB, 0);
                    }
                } else if bd.contains(b) {
                    if face_at(graph, chains, c)?.contains(a) {
                        acc.bump(MatrixCell::IB, 0);
                    } else {
                        acc.bump(MatrixCell::EB, 0);
                    }
                }
            }
            Family::AreaPoint => {
                if cb_mask.contains(b) {
                    if cb_mask.contains(a) {
                        acc.bump(MatrixCell::BI, 0);
                    } else if face_at(graph, chains, c)?.contains(a) {
                        acc.bump(MatrixCell::II, 0);
                    } else {
                        acc.bump(MatrixCell::EI, 0);
                    }
                }
            }
            Family::LineLine => {
                if a_interior && b_interior {
                    acc.bump(MatrixCell::II, 0);
                }
                if a_interior && bd.contains(b) {
                    acc.bump(MatrixCell::IB, 0);
                }
                if b_interior && bd.contains(a) {
                    acc.bump(MatrixCell::BI, 0);
                }
                if bd.contains(a) && bd.contains(b) {
                    acc.bump(MatrixCell::BB, 0);
                }
                if bd.contains(a) && !cb_mask.contains(b) {
                    acc.bump(MatrixCell::BE, 0);
                }
                if bd.contains(b) && !cb_mask.contains(a) {
                    acc.bump(MatrixCell::EB, 0);
                }
            }
            Family::LinePoint => {
                if cb_mask.contains(b) {
                    if a_interior {
                        acc.bump(MatrixCell::II, 0);
                    } else if bd.contains(a) {
                        acc.bump(MatrixCell::BI, 0);
                    } else {
                        acc.bump(MatrixCell::EI, 0);
                    }
                }
                if bd.contains(a) && !cb_mask.contains(b) {
                    acc.bump(MatrixCell::BE, 0);
                }
            }
            Family::PointPoint => {
                if cb_mask.contains(a) && cb_mask.contains(b) {
                    acc.bump(MatrixCell::II, 0);
                } else if cb_mask.contains(a) {
                    acc.bump(MatrixCell::IE, 0);
                } else if cb_mask.contains(b) {
                    acc.bump(MatrixCell::EI, 0);
                }
            }
        }
        step!();
    }

    Ok(Evaluation::Matrix(acc.finish()))
}

/// Parentage of a face adjacent to the cluster. Sound only when the probed
/// operand has no edges through the cluster, in which case every face
/// around the cluster agrees on that operand.
fn face_at<T: CoordinateType>(
    graph: &TopoGraph<T>,
    chains: &Chains<T>,
    c: ClusterId,
) -> Result<Parentage, TopologyError> {
    if let Some(e) = graph.live_out(c).next() {
        let chain = graph.edges.chain[e.index()];
        Ok(chains.face_bits[chain.index()])
    } else {
        let enclosing = graph.clusters.enclosing[c.index()]
            .ok_or(TopologyError::Internal("isolated cluster was not located"))?;
        Ok(chains.face_bits[enclosing.index()])
    }
}
