// SPDX-License-Identifier: AGPL-3.0-or-later

//! Public relate operations.
//!
//! Entry points validate the pattern before touching any geometry, handle
//! empty operands and envelope-disjoint operands without building a graph,
//! put the operands into canonical order (higher dimension first, results
//! transposed back), and only then run the full pipeline: graph build,
//! angular merge, chain extraction, sweep propagation, rule evaluation.

use num_traits::Float;
use tracing::debug;

use iron_shapes::point::Point;
use iron_shapes::CoordinateType;

use crate::angular_sort::{find_non_simple, sort_and_merge};
use crate::connect_chains::connect_chains;
use crate::error::{CancelToken, NeverCancel, TopologyError};
use crate::geometry::{Geometry, GeometryClass};
use crate::relate_rules::{evaluate_matrix, evaluate_pattern, Family};
use crate::relation_matrix::{MatrixCell, Pattern, RelationMatrix};
use crate::sweep_propagate::{propagate, FaceParity};
use crate::topo_graph::TopoGraph;

/// The seven named DE-9IM relations.
const EQUALS: &str = "T*F**FFF*";
const DISJOINT: &str = "FF*FF****";
const CONTAINS: &str = "T*****FF*";
const WITHIN: &str = "T*F**F***";

/// Outcome of a simplicity check. A non-simple geometry is a legitimate
/// answer, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Simplicity<T> {
    /// No self-intersection evidence found.
    Simple,
    /// The geometry intersects itself.
    NonSimple {
        /// What kind of self-intersection.
        reason: NonSimpleReason,
        /// A witness location.
        location: Point<T>,
    },
}

/// Kinds of self-intersection a simplicity check can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonSimpleReason {
    /// Two segments of the geometry coincide.
    OverlappingSegments,
    /// More than two segments of the geometry meet at one point.
    CrossOver,
    /// A multipoint repeats a coordinate.
    DuplicatePoints,
}

/// Test two geometries against a DE-9IM pattern string.
///
/// ```
/// use topo_relate::{relate, Geometry};
///
/// let a = Geometry::ring(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
/// let b = Geometry::point(2.0, 2.0);
/// assert!(relate(&a, &b, "T*****FF*").unwrap());
/// ```
pub fn relate<T>(a: &Geometry<T>, b: &Geometry<T>, pattern: &str) -> Result<bool, TopologyError>
where
    T: CoordinateType + Float,
{
    relate_with_cancel(a, b, pattern, &NeverCancel)
}

/// [`relate`] with a cancellation token, polled during graph construction,
/// the sweep and evaluation.
pub fn relate_with_cancel<T>(
    a: &Geometry<T>,
    b: &Geometry<T>,
    pattern: &str,
    token: &dyn CancelToken,
) -> Result<bool, TopologyError>
where
    T: CoordinateType + Float,
{
    // Malformed patterns are rejected before any geometric work.
    let pattern = Pattern::parse(pattern)?;

    if a.is_empty() || b.is_empty() {
        return Ok(pattern.matches(&empty_relation()));
    }

    // Named-pattern prechecks: cheap envelope or type comparisons that can
    // refute the query outright.
    let (ea, eb) = match (a.envelope(), b.envelope()) {
        (Some(ea), Some(eb)) => (ea, eb),
        _ => return Ok(pattern.matches(&empty_relation())),
    };
    let text = pattern.to_string();
    match text.as_str() {
        EQUALS if a.class() != b.class() || ea != eb => return Ok(false),
        CONTAINS if !ea.contains_envelope(&eb) => return Ok(false),
        WITHIN if !eb.contains_envelope(&ea) => return Ok(false),
        _ => {}
    }

    if !ea.overlaps(&eb) {
        debug!("envelopes disjoint, skipping graph construction");
        return Ok(pattern.matches(&disjoint_relation(a.class(), b.class())));
    }

    if a.class() < b.class() {
        let pipeline = Pipeline::build(b, a, token)?;
        pipeline.matches(&pattern.transposed(), token)
    } else {
        let pipeline = Pipeline::build(a, b, token)?;
        pipeline.matches(&pattern, token)
    }
}

/// Compute the full relation matrix of two geometries.
pub fn relate_matrix<T>(a: &Geometry<T>, b: &Geometry<T>) -> Result<RelationMatrix, TopologyError>
where
    T: CoordinateType + Float,
{
    relate_matrix_with_cancel(a, b, &NeverCancel)
}

/// [`relate_matrix`] with a cancellation token.
pub fn relate_matrix_with_cancel<T>(
    a: &Geometry<T>,
    b: &Geometry<T>,
    token: &dyn CancelToken,
) -> Result<RelationMatrix, TopologyError>
where
    T: CoordinateType + Float,
{
    if a.is_empty() || b.is_empty() {
        return Ok(empty_relation());
    }
    let (ea, eb) = match (a.envelope(), b.envelope()) {
        (Some(ea), Some(eb)) => (ea, eb),
        _ => return Ok(empty_relation()),
    };
    if !ea.overlaps(&eb) {
        return Ok(disjoint_relation(a.class(), b.class()));
    }

    if a.class() < b.class() {
        let pipeline = Pipeline::build(b, a, token)?;
        Ok(pipeline.matrix(token)?.transposed())
    } else {
        let pipeline = Pipeline::build(a, b, token)?;
        pipeline.matrix(token)
    }
}

/// Exact geometric equality of the two point sets.
pub fn equals<T>(a: &Geometry<T>, b: &Geometry<T>) -> Result<bool, TopologyError>
where
    T: CoordinateType + Float,
{
    relate(a, b, EQUALS)
}

/// No shared points at all.
pub fn disjoint<T>(a: &Geometry<T>, b: &Geometry<T>) -> Result<bool, TopologyError>
where
    T: CoordinateType + Float,
{
    relate(a, b, DISJOINT)
}

/// `b` lies in `a`'s closure and touches `a`'s interior.
pub fn contains<T>(a: &Geometry<T>, b: &Geometry<T>) -> Result<bool, TopologyError>
where
    T: CoordinateType + Float,
{
    relate(a, b, CONTAINS)
}

/// `a` lies in `b`'s closure and touches `b`'s interior.
pub fn within<T>(a: &Geometry<T>, b: &Geometry<T>) -> Result<bool, TopologyError>
where
    T: CoordinateType + Float,
{
    relate(a, b, WITHIN)
}

/// The geometries intersect, but only at boundary points.
pub fn touches<T>(a: &Geometry<T>, b: &Geometry<T>) -> Result<bool, TopologyError>
where
    T: CoordinateType + Float,
{
    let m = relate_matrix(a, b)?;
    let intersects_at_boundary = m.get(MatrixCell::IB) >= 0
        || m.get(MatrixCell::BI) >= 0
        || m.get(MatrixCell::BB) >= 0;
    Ok(m.get(MatrixCell::II) == -1 && intersects_at_boundary)
}

/// The interiors intersect in a dimension lower than either operand, and
/// each interior reaches outside the other; for two lines, a point
/// crossing.
pub fn crosses<T>(a: &Geometry<T>, b: &Geometry<T>) -> Result<bool, TopologyError>
where
    T: CoordinateType + Float,
{
    let (da, db) = (a.class(), b.class());
    let m = relate_matrix(a, b)?;
    Ok(match da.cmp(&db) {
        std::cmp::Ordering::Less => m.get(MatrixCell::II) >= 0 && m.get(MatrixCell::IE) >= 0,
        std::cmp::Ordering::Greater => m.get(MatrixCell::II) >= 0 && m.get(MatrixCell::EI) >= 0,
        std::cmp::Ordering::Equal => {
            da == GeometryClass::Line && m.get(MatrixCell::II) == 0
        }
    })
}

/// The interiors intersect in the common dimension, and each operand
/// reaches outside the other. Defined for same-dimension operands only.
pub fn overlaps<T>(a: &Geometry<T>, b: &Geometry<T>) -> Result<bool, TopologyError>
where
    T: CoordinateType + Float,
{
    let (da, db) = (a.class(), b.class());
    if da != db {
        return Ok(false);
    }
    let m = relate_matrix(a, b)?;
    let ii_ok = match da {
        GeometryClass::Line => m.get(MatrixCell::II) == 1,
        _ => m.get(MatrixCell::II) >= 0,
    };
    Ok(ii_ok && m.get(MatrixCell::IE) >= 0 && m.get(MatrixCell::EI) >= 0)
}

/// Check a single geometry for self-intersections.
pub fn check_simple<T>(g: &Geometry<T>) -> Result<Simplicity<T>, TopologyError>
where
    T: CoordinateType + Float,
{
    check_simple_with_cancel(g, &NeverCancel)
}

/// [`check_simple`] with a cancellation token.
pub fn check_simple_with_cancel<T>(
    g: &Geometry<T>,
    token: &dyn CancelToken,
) -> Result<Simplicity<T>, TopologyError>
where
    T: CoordinateType + Float,
{
    if g.is_empty() {
        return Ok(Simplicity::Simple);
    }

    if g.class() == GeometryClass::Point {
        // Duplicates collapse into one cluster during graph construction,
        // so they are found on the raw coordinates.
        let mut points: Vec<Point<T>> = g
            .paths()
            .into_iter()
            .map(|(path, _)| path[0])
            .collect();
        points.sort_unstable_by(|a, b| crate::compare_segments::lex_cmp(*a, *b));
        for w in points.windows(2) {
            if w[0] == w[1] {
                return Ok(Simplicity::NonSimple {
                    reason: NonSimpleReason::DuplicatePoints,
                    location: w[0],
                });
            }
        }
        return Ok(Simplicity::Simple);
    }

    let mut graph = TopoGraph::build_single(g, token)?;
    Ok(match find_non_simple(&mut graph, token)? {
        Some((reason, location)) => Simplicity::NonSimple { reason, location },
        None => Simplicity::Simple,
    })
}

/// Matrix for queries involving an empty operand: nothing intersects, only
/// the exteriors share the unbounded plane.
fn empty_relation() -> RelationMatrix {
    let mut dims = [-1; 9];
    dims[MatrixCell::EE.index()] = 2;
    RelationMatrix::from_dims(dims)
}

/// Matrix of two geometries with disjoint envelopes: each operand falls
/// entirely into the other's exterior.
fn disjoint_relation(a: GeometryClass, b: GeometryClass) -> RelationMatrix {
    let mut dims = [-1; 9];
    dims[MatrixCell::IE.index()] = a.interior_dim();
    dims[MatrixCell::BE.index()] = a.boundary_dim().unwrap_or(-1);
    dims[MatrixCell::EI.index()] = b.interior_dim();
    dims[MatrixCell::EB.index()] = b.boundary_dim().unwrap_or(-1);
    dims[MatrixCell::EE.index()] = 2;
    RelationMatrix::from_dims(dims)
}

/// The prepared topology of one query, canonical operand order.
struct Pipeline<T> {
    family: Family,
    graph: TopoGraph<T>,
    chains: crate::connect_chains::Chains<T>,
}

impl<T: CoordinateType + Float> Pipeline<T> {
    fn build(
        a: &Geometry<T>,
        b: &Geometry<T>,
        token: &dyn CancelToken,
    ) -> Result<Self, TopologyError> {
        let family = Family::of(a.class(), b.class());
        let mut graph = TopoGraph::build_pair(a, b, token)?;
        sort_and_merge(&mut graph, token)?;
        let mut chains = connect_chains(&mut graph, token)?;
        chains.face_bits = propagate::<FaceParity, T>(&mut graph, &mut chains, token)?;
        Ok(Pipeline {
            family,
            graph,
            chains,
        })
    }

    fn matches(&self, pattern: &Pattern, token: &dyn CancelToken) -> Result<bool, TopologyError> {
        evaluate_pattern(self.family, &self.graph, &self.chains, pattern, token)
    }

    fn matrix(&self, token: &dyn CancelToken) -> Result<RelationMatrix, TopologyError> {
        evaluate_matrix(self.family, &self.graph, &self.chains, token)
    }
}
