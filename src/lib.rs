// SPDX-License-Identifier: AGPL-3.0-or-later

#![deny(missing_docs)]

//! Exact DE-9IM topological predicates on 2-dimensional geometries.
//!
//! Given two geometries whose segments are already *noded* — every mutual
//! intersection and touching point is an explicit shared vertex, and no
//! segment passes through the interior of another — this crate builds a
//! planar topology graph of both operands at once, propagates face
//! parentage with a plane sweep, and evaluates the 3x3
//! dimensionally-extended intersection matrix (DE-9IM) between them. All
//! decisions are combinatorial sign tests; no intersection coordinates are
//! ever computed, so results are exact for any coordinate values that
//! survived the upstream noding.
//!
//! The entry points are [`relate`] (match a nine-symbol pattern), the named
//! relations ([`equals`], [`disjoint`], [`contains`], [`within`],
//! [`touches`], [`crosses`], [`overlaps`]), [`relate_matrix`] (the full
//! matrix), and [`check_simple`] (self-intersection evidence for a single
//! geometry). Long queries can be abandoned through a [`CancelToken`].
//!
//! ```
//! use topo_relate::{relate_matrix, Geometry};
//!
//! let square = Geometry::ring(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
//! let diagonal = Geometry::line(vec![(1.0, 1.0), (3.0, 3.0)]);
//! assert_eq!(relate_matrix(&square, &diagonal).unwrap().to_string(), "102FF1FF2");
//! ```

mod angular_sort;
mod compare_segments;
mod connect_chains;
mod error;
mod geometry;
mod relate_ops;
mod relate_rules;
mod relation_matrix;
mod sweep_propagate;
mod topo_graph;

// API exports.
pub use error::{CancelToken, NeverCancel, PatternErrorReason, TopologyError};
pub use geometry::{Envelope, Geometry, GeometryClass};
pub use relate_ops::{
    check_simple, check_simple_with_cancel, contains, crosses, disjoint, equals, overlaps, relate,
    relate_matrix, relate_matrix_with_cancel, relate_with_cancel, touches, within, NonSimpleReason,
    Simplicity,
};
pub use relation_matrix::{MatrixCell, Pattern, RelationMatrix};
