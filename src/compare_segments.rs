// SPDX-License-Identifier: AGPL-3.0-or-later

//! Exact sign-based geometric comparators.
//!
//! Every ordering decision in the engine — angular sorting around clusters,
//! the left-to-right order of the sweep's active-edge set, point location
//! probes — reduces to one of the small pure functions in this module. They
//! use cross-product signs only, never trigonometry, and are unit tested in
//! isolation so numerical edge cases stay out of the sweep control flow.
//!
//! Because the input geometries are noded, two co-active segments never
//! cross each other's interiors; their left-right order is therefore
//! invariant for as long as both cross the sweep line, and can be decided
//! exactly from endpoint orientation tests alone. This replaces the
//! sweep-height "nudge" heuristic some implementations use for segments
//! sharing an endpoint.

use std::cmp::Ordering;

use iron_shapes::point::Point;
use iron_shapes::CoordinateType;

/// Which side of the directed line `a -> b` a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Turn {
    /// Counter-clockwise; the point is left of the direction of travel.
    Left,
    /// Collinear.
    Straight,
    /// Clockwise; the point is right of the direction of travel.
    Right,
}

/// Orientation of `p` relative to the directed line `a -> b`,
/// by the sign of the cross product `(b - a) x (p - a)`.
pub(crate) fn turn<T: CoordinateType>(a: Point<T>, b: Point<T>, p: Point<T>) -> Turn {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross > T::zero() {
        Turn::Left
    } else if cross < T::zero() {
        Turn::Right
    } else {
        Turn::Straight
    }
}

/// Lexicographic sweep order: by y, then x. Cluster ids are assigned in
/// this order, so it is also the event order of the sweep.
pub(crate) fn lex_cmp<T: CoordinateType>(p: Point<T>, q: Point<T>) -> Ordering {
    p.y.partial_cmp(&q.y)
        .expect("coordinates must not be NaN")
        .then(p.x.partial_cmp(&q.x).expect("coordinates must not be NaN"))
}

/// Full-circle counter-clockwise order of direction vectors, starting at
/// the positive x axis. Directions must be non-zero. Two directions compare
/// `Equal` exactly when they are positive multiples of each other.
pub(crate) fn cmp_ccw<T: CoordinateType>(d1: (T, T), d2: (T, T)) -> Ordering {
    // Upper half-plane [0, pi) before lower half-plane [pi, 2*pi); within a
    // half-plane the cross-product sign is a consistent total order.
    fn half<T: CoordinateType>(d: (T, T)) -> u8 {
        if d.1 > T::zero() || (d.1 == T::zero() && d.0 > T::zero()) {
            0
        } else {
            1
        }
    }

    half(d1).cmp(&half(d2)).then_with(|| {
        let cross = d1.0 * d2.1 - d1.1 * d2.0;
        if cross > T::zero() {
            Ordering::Less
        } else if cross < T::zero() {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

/// Sequence id marking a point-location probe rather than a real segment.
pub(crate) const PROBE_SEQ: u32 = u32::MAX;

/// An entry of the sweep's active-edge set: an upward, non-horizontal
/// segment currently crossing the sweep line, denormalized so the comparator
/// needs no access to the graph.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ActiveSeg<T> {
    /// Lexicographically smaller endpoint.
    pub bottom: Point<T>,
    /// Lexicographically larger endpoint.
    pub top: Point<T>,
    /// Unique per edge pair; breaks ties for fully coincident entries and
    /// identifies the entry on removal.
    pub seq: u32,
}

impl<T: CoordinateType> ActiveSeg<T> {
    /// A degenerate entry used to locate `p` within the active set.
    ///
    /// A probe orders strictly east of every active segment passing exactly
    /// through `p` (in particular of all segments starting at `p`), so
    /// `prev(probe)` yields the segment bounding the region just right of
    /// `p` from the left.
    pub(crate) fn probe(p: Point<T>) -> Self {
        ActiveSeg {
            bottom: p,
            top: p,
            seq: PROBE_SEQ,
        }
    }

    fn is_probe(&self) -> bool {
        self.seq == PROBE_SEQ
    }
}

/// `Less` when the probe point lies west of the segment at the sweep line.
fn point_vs_seg<T: CoordinateType>(p: Point<T>, s: &ActiveSeg<T>) -> Ordering {
    debug_assert!(
        lex_cmp(s.bottom, s.top) == Ordering::Less,
        "Active segments point upward."
    );
    if p == s.bottom {
        // Probes go east of segments starting at the probe point.
        return Ordering::Greater;
    }
    match turn(s.bottom, s.top, p) {
        Turn::Left => Ordering::Less,
        Turn::Right => Ordering::Greater,
        // On the segment's line: only possible at its top endpoint, whose
        // removal precedes any probe at that event.
        Turn::Straight => Ordering::Greater,
    }
}

/// Left-to-right order of two active-set entries at the sweep line.
///
/// Both entries must currently cross the sweep line; noded input guarantees
/// they do not cross each other's interiors, so the order decided here is
/// stable for the whole co-active lifetime of the pair.
pub(crate) fn compare_active<T: CoordinateType>(a: &ActiveSeg<T>, b: &ActiveSeg<T>) -> Ordering {
    if a.is_probe() && b.is_probe() {
        // Removal of a probe compares it against its stored copy.
        return lex_cmp(a.bottom, b.bottom);
    }
    if a.is_probe() {
        return point_vs_seg(a.bottom, b);
    }
    if b.is_probe() {
        return point_vs_seg(b.bottom, a).reverse();
    }
    if a.seq == b.seq {
        return Ordering::Equal;
    }

    if lex_cmp(a.bottom, b.bottom) != Ordering::Greater {
        // `a` entered the sweep first (or at the same event); evaluate `b`
        // against `a`'s supporting line. A shared bottom endpoint falls
        // through to the top endpoints, i.e. to the upward direction order.
        match turn(a.bottom, a.top, b.bottom) {
            Turn::Left => Ordering::Greater,
            Turn::Right => Ordering::Less,
            Turn::Straight => match turn(a.bottom, a.top, b.top) {
                Turn::Left => Ordering::Greater,
                Turn::Right => Ordering::Less,
                // Fully collinear entries are merged before the sweep; kept
                // as a deterministic guard.
                Turn::Straight => a.seq.cmp(&b.seq),
            },
        }
    } else {
        compare_active(b, a).reverse()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn seg(bottom: (f64, f64), top: (f64, f64), seq: u32) -> ActiveSeg<f64> {
        let s = ActiveSeg {
            bottom: bottom.into(),
            top: top.into(),
            seq,
        };
        assert_eq!(lex_cmp(s.bottom, s.top), Ordering::Less);
        s
    }

    #[test]
    fn turn_signs() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(4.0, 0.0);
        assert_eq!(turn(a, b, Point::new(2.0, 1.0)), Turn::Left);
        assert_eq!(turn(a, b, Point::new(2.0, -1.0)), Turn::Right);
        assert_eq!(turn(a, b, Point::new(9.0, 0.0)), Turn::Straight);
    }

    #[test]
    fn lex_order_is_y_then_x() {
        assert_eq!(lex_cmp(Point::new(5.0, 0.0), Point::new(-5.0, 1.0)), Ordering::Less);
        assert_eq!(lex_cmp(Point::new(1.0, 2.0), Point::new(3.0, 2.0)), Ordering::Less);
        assert_eq!(lex_cmp(Point::new(1.0, 2.0), Point::new(1.0, 2.0)), Ordering::Equal);
    }

    #[test]
    fn ccw_order_full_circle() {
        // East, north-east, north, west, south, south-east.
        let dirs = [
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (-1.0, 0.0),
            (0.0, -1.0),
            (1.0, -1.0),
        ];
        for w in dirs.windows(2) {
            assert_eq!(cmp_ccw(w[0], w[1]), Ordering::Less, "{:?} < {:?}", w[0], w[1]);
            assert_eq!(cmp_ccw(w[1], w[0]), Ordering::Greater);
        }
        // Positive scaling does not change the direction.
        assert_eq!(cmp_ccw((1.0, 2.0), (2.0, 4.0)), Ordering::Equal);
        // Opposite directions are not equal.
        assert_eq!(cmp_ccw((1.0, 1.0), (-1.0, -1.0)), Ordering::Less);
    }

    #[test]
    fn active_order_disjoint_segments() {
        let a = seg((0.0, 0.0), (0.0, 4.0), 0);
        let b = seg((2.0, 1.0), (3.0, 5.0), 1);
        assert_eq!(compare_active(&a, &b), Ordering::Less);
        assert_eq!(compare_active(&b, &a), Ordering::Greater);
    }

    #[test]
    fn active_order_shared_bottom_uses_direction() {
        // Both start at the origin and diverge upward.
        let left = seg((0.0, 0.0), (-1.0, 4.0), 0);
        let right = seg((0.0, 0.0), (1.0, 4.0), 1);
        assert_eq!(compare_active(&left, &right), Ordering::Less);
        assert_eq!(compare_active(&right, &left), Ordering::Greater);
    }

    #[test]
    fn active_order_shared_top_uses_lower_part() {
        // Both end at (0, 4); the one coming from the west is smaller.
        let west = seg((-2.0, 0.0), (0.0, 4.0), 0);
        let east = seg((2.0, 0.0), (0.0, 4.0), 1);
        assert_eq!(compare_active(&west, &east), Ordering::Less);
        assert_eq!(compare_active(&east, &west), Ordering::Greater);
    }

    #[test]
    fn vertical_against_slanted_at_shared_origin() {
        let vertical = seg((0.0, 0.0), (0.0, 4.0), 0);
        let leaning_right = seg((0.0, 0.0), (3.0, 4.0), 1);
        let leaning_left = seg((0.0, 0.0), (-3.0, 4.0), 2);
        assert_eq!(compare_active(&vertical, &leaning_right), Ordering::Less);
        assert_eq!(compare_active(&vertical, &leaning_left), Ordering::Greater);
    }

    #[test]
    fn probe_sits_east_of_segments_through_its_point() {
        let s = seg((1.0, 0.0), (1.0, 4.0), 0);
        let at_bottom = ActiveSeg::probe(Point::new(1.0, 0.0));
        let west = ActiveSeg::probe(Point::new(0.0, 2.0));
        let east = ActiveSeg::probe(Point::new(2.0, 2.0));
        assert_eq!(compare_active(&at_bottom, &s), Ordering::Greater);
        assert_eq!(compare_active(&west, &s), Ordering::Less);
        assert_eq!(compare_active(&east, &s), Ordering::Greater);
        assert_eq!(compare_active(&s, &east), Ordering::Less);
    }

    /// A probe compares `Equal` to itself, so removing it from a set keyed
    /// by `compare_active` finds the stored entry again.
    #[test]
    fn probe_is_equal_to_itself() {
        let p = ActiveSeg::probe(Point::new(1.0, 2.0));
        assert_eq!(compare_active(&p, &p), Ordering::Equal);
        assert_eq!(compare_active(&p, &ActiveSeg::probe(Point::new(1.0, 2.0))), Ordering::Equal);
        assert_eq!(
            compare_active(&p, &ActiveSeg::probe(Point::new(0.0, 2.0))),
            Ordering::Greater
        );
    }

    /// Random co-active vertical segments must sort exactly by x.
    #[test]
    fn random_verticals_sort_by_x() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let mut segs: Vec<ActiveSeg<f64>> = (0..20)
                .map(|i| {
                    let x = rng.gen_range(-100..100) as f64 + i as f64 * 1000.0;
                    seg((x, -1.0), (x, 1.0), i)
                })
                .collect();
            let expected: Vec<u32> = segs.iter().map(|s| s.seq).collect();
            segs.reverse();
            segs.sort_by(compare_active);
            let got: Vec<u32> = segs.iter().map(|s| s.seq).collect();
            assert_eq!(got, expected);
        }
    }

    /// The comparator must be antisymmetric for segments sharing an endpoint.
    #[test]
    fn random_fan_antisymmetry() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let dx1 = rng.gen_range(-5..=5) as f64;
            let dx2 = rng.gen_range(-5..=5) as f64;
            let a = seg((0.0, 0.0), (dx1, 4.0), 1);
            let b = seg((0.0, 0.0), (dx2, 4.0), 2);
            assert_eq!(compare_active(&a, &b), compare_active(&b, &a).reverse());
        }
    }
}
