// SPDX-License-Identifier: AGPL-3.0-or-later

//! Input geometry model.
//!
//! The relate engine compares two geometries at a time. Geometries are flat
//! collections of paths over [`Point`]s; curves are flattened and all mutual
//! intersections noded *before* they reach this crate (see the crate-level
//! documentation for the noding precondition).

use std::borrow::Cow;

use iron_shapes::point::Point;
use iron_shapes::polygon::Polygon;
use iron_shapes::CoordinateType;

/// Identifies one of the two operands of a relate query.
///
/// Operand ids are distinct power-of-two bits so that parentage sets can be
/// stored as bitmasks; the engine only ever compares two geometries at a
/// time.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Ord, PartialOrd)]
pub(crate) enum Operand {
    /// Left operand.
    A,
    /// Right operand.
    B,
}

impl Operand {
    pub(crate) fn mask(self) -> Parentage {
        match self {
            Operand::A => Parentage(1),
            Operand::B => Parentage(2),
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Operand::A => 0,
            Operand::B => 1,
        }
    }
}

/// A set of operand ids, stored as a bitmask.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone, Hash)]
pub(crate) struct Parentage(pub(crate) u8);

impl Parentage {
    pub(crate) const EMPTY: Parentage = Parentage(0);

    pub(crate) fn contains(self, op: Operand) -> bool {
        self.0 & op.mask().0 != 0
    }

    pub(crate) fn insert(&mut self, other: Parentage) {
        self.0 |= other.0;
    }

    /// Symmetric difference; used for crossing-parity accumulation.
    pub(crate) fn toggle(&mut self, other: Parentage) {
        self.0 ^= other.0;
    }

    pub(crate) fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitAnd for Parentage {
    type Output = Parentage;
    fn bitand(self, rhs: Parentage) -> Parentage {
        Parentage(self.0 & rhs.0)
    }
}

impl std::ops::BitOr for Parentage {
    type Output = Parentage;
    fn bitor(self, rhs: Parentage) -> Parentage {
        Parentage(self.0 | rhs.0)
    }
}

impl std::ops::BitXor for Parentage {
    type Output = Parentage;
    fn bitxor(self, rhs: Parentage) -> Parentage {
        Parentage(self.0 ^ rhs.0)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope<T> {
    /// Smallest x coordinate.
    pub x_min: T,
    /// Smallest y coordinate.
    pub y_min: T,
    /// Largest x coordinate.
    pub x_max: T,
    /// Largest y coordinate.
    pub y_max: T,
}

impl<T: CoordinateType> Envelope<T> {
    /// Create an envelope from two opposite corners, in any order.
    pub fn new(x1: T, y1: T, x2: T, y2: T) -> Self {
        let (x_min, x_max) = if x1 < x2 { (x1, x2) } else { (x2, x1) };
        let (y_min, y_max) = if y1 < y2 { (y1, y2) } else { (y2, y1) };
        Envelope {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Smallest envelope containing all the given points, or `None` for an
    /// empty iterator.
    pub fn of_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point<T>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut env = Envelope::new(first.x, first.y, first.x, first.y);
        for p in iter {
            if p.x < env.x_min {
                env.x_min = p.x;
            }
            if p.x > env.x_max {
                env.x_max = p.x;
            }
            if p.y < env.y_min {
                env.y_min = p.y;
            }
            if p.y > env.y_max {
                env.y_max = p.y;
            }
        }
        Some(env)
    }

    /// Do the two closed boxes share at least one point?
    pub fn overlaps(&self, other: &Envelope<T>) -> bool {
        !(self.x_max < other.x_min
            || other.x_max < self.x_min
            || self.y_max < other.y_min
            || other.y_max < self.y_min)
    }

    /// Does this box contain the other entirely?
    pub fn contains_envelope(&self, other: &Envelope<T>) -> bool {
        self.x_min <= other.x_min
            && self.y_min <= other.y_min
            && self.x_max >= other.x_max
            && self.y_max >= other.y_max
    }

    fn is_point(&self) -> bool {
        self.x_min == self.x_max && self.y_min == self.y_max
    }

    fn is_segment(&self) -> bool {
        !self.is_point() && (self.x_min == self.x_max || self.y_min == self.y_max)
    }
}

/// Geometric dimension class of an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GeometryClass {
    /// 0-dimensional: point or multipoint.
    Point,
    /// 1-dimensional: polyline.
    Line,
    /// 2-dimensional: polygon.
    Area,
}

impl GeometryClass {
    /// Dimension of the interior point set.
    pub(crate) fn interior_dim(self) -> i8 {
        match self {
            GeometryClass::Point => 0,
            GeometryClass::Line => 1,
            GeometryClass::Area => 2,
        }
    }

    /// Dimension of the boundary point set, `None` when the boundary is
    /// empty (points have no boundary).
    pub(crate) fn boundary_dim(self) -> Option<i8> {
        match self {
            GeometryClass::Point => None,
            GeometryClass::Line => Some(0),
            GeometryClass::Area => Some(1),
        }
    }
}

/// A 2-D geometry operand.
///
/// Paths are plain vertex lists. Polygon rings close implicitly (an edge is
/// added from the last vertex back to the first); polyline paths do not.
/// Zero-length segments are skipped during graph construction, so repeated
/// consecutive vertices are harmless.
///
/// Coordinates must admit a total order: with floating-point coordinate
/// types, NaN values are not supported and panic inside the comparators.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry<T> {
    /// A single point.
    Point(Point<T>),
    /// A set of points.
    MultiPoint(Vec<Point<T>>),
    /// One or more open paths.
    Polyline(Vec<Vec<Point<T>>>),
    /// One or more rings. Interpretation is even-odd: a face is inside the
    /// polygon when an odd number of ring edges separate it from the
    /// unbounded face, so ring orientation does not affect relate results.
    Polygon(Vec<Vec<Point<T>>>),
    /// An axis-aligned box, treated as a rectangle polygon (or as a segment
    /// or point when degenerate).
    Envelope(Envelope<T>),
}

impl<T: CoordinateType> Geometry<T> {
    /// A single-point geometry.
    pub fn point(x: T, y: T) -> Self {
        Geometry::Point(Point::new(x, y))
    }

    /// A multipoint geometry.
    pub fn multi_point(points: Vec<(T, T)>) -> Self {
        Geometry::MultiPoint(points.into_iter().map(|(x, y)| Point::new(x, y)).collect())
    }

    /// A polyline with a single path.
    pub fn line(path: Vec<(T, T)>) -> Self {
        Geometry::Polyline(vec![path.into_iter().map(|(x, y)| Point::new(x, y)).collect()])
    }

    /// A polygon with a single ring. The closing edge is implicit.
    pub fn ring(ring: Vec<(T, T)>) -> Self {
        Geometry::Polygon(vec![ring.into_iter().map(|(x, y)| Point::new(x, y)).collect()])
    }

    /// Geometric dimension class. Degenerate envelopes collapse to lines or
    /// points.
    pub fn class(&self) -> GeometryClass {
        match self {
            Geometry::Point(_) | Geometry::MultiPoint(_) => GeometryClass::Point,
            Geometry::Polyline(_) => GeometryClass::Line,
            Geometry::Polygon(_) => GeometryClass::Area,
            Geometry::Envelope(e) => {
                if e.is_point() {
                    GeometryClass::Point
                } else if e.is_segment() {
                    GeometryClass::Line
                } else {
                    GeometryClass::Area
                }
            }
        }
    }

    /// `true` when the geometry contains no points at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(_) | Geometry::Envelope(_) => false,
            Geometry::MultiPoint(ps) => ps.is_empty(),
            Geometry::Polyline(paths) => paths.iter().all(|p| p.is_empty()),
            Geometry::Polygon(rings) => rings.iter().all(|r| r.is_empty()),
        }
    }

    /// Bounding box, `None` for an empty geometry.
    pub fn envelope(&self) -> Option<Envelope<T>> {
        match self {
            Geometry::Point(p) => Envelope::of_points([*p]),
            Geometry::MultiPoint(ps) => Envelope::of_points(ps.iter().copied()),
            Geometry::Polyline(paths) | Geometry::Polygon(paths) => {
                Envelope::of_points(paths.iter().flatten().copied())
            }
            Geometry::Envelope(e) => Some(*e),
        }
    }

    /// Replace the `Envelope` variant with its equivalent polygon, segment
    /// or point so the graph builder only ever sees vertex paths.
    pub(crate) fn flattened(&self) -> Cow<'_, Geometry<T>> {
        match self {
            Geometry::Envelope(e) => {
                let g = if e.is_point() {
                    Geometry::Point(Point::new(e.x_min, e.y_min))
                } else if e.is_segment() {
                    Geometry::Polyline(vec![vec![
                        Point::new(e.x_min, e.y_min),
                        Point::new(e.x_max, e.y_max),
                    ]])
                } else {
                    Geometry::Polygon(vec![vec![
                        Point::new(e.x_min, e.y_min),
                        Point::new(e.x_max, e.y_min),
                        Point::new(e.x_max, e.y_max),
                        Point::new(e.x_min, e.y_max),
                    ]])
                };
                Cow::Owned(g)
            }
            other => Cow::Borrowed(other),
        }
    }

    /// Vertex paths of the flattened geometry: `(vertices, is_ring)`.
    /// Point geometries yield one single-vertex "path" per point.
    pub(crate) fn paths(&self) -> Vec<(Vec<Point<T>>, bool)> {
        match self {
            Geometry::Point(p) => vec![(vec![*p], false)],
            Geometry::MultiPoint(ps) => ps.iter().map(|p| (vec![*p], false)).collect(),
            Geometry::Polyline(paths) => {
                paths.iter().filter(|p| !p.is_empty()).map(|p| (p.clone(), false)).collect()
            }
            Geometry::Polygon(rings) => {
                rings.iter().filter(|r| !r.is_empty()).map(|r| (r.clone(), true)).collect()
            }
            Geometry::Envelope(_) => self.flattened().paths(),
        }
    }
}

impl<T: CoordinateType> From<&Polygon<T>> for Geometry<T> {
    /// Convert an `iron_shapes` polygon (exterior plus holes) into a
    /// relate operand.
    fn from(poly: &Polygon<T>) -> Self {
        let ring_points =
            |ring: &iron_shapes::simple_polygon::SimplePolygon<T>| -> Vec<Point<T>> {
                ring.edges().into_iter().map(|e| e.start).collect()
            };
        let mut rings: Vec<Vec<Point<T>>> = Vec::with_capacity(1 + poly.interiors.len());
        rings.push(ring_points(&poly.exterior));
        for hole in &poly.interiors {
            rings.push(ring_points(hole));
        }
        Geometry::Polygon(rings)
    }
}

impl<T: CoordinateType> From<Point<T>> for Geometry<T> {
    fn from(p: Point<T>) -> Self {
        Geometry::Point(p)
    }
}
