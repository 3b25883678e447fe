// SPDX-License-Identifier: AGPL-3.0-or-later

//! The DE-9IM relation matrix and its pattern language.
//!
//! A relate query answers with a 3x3 matrix: for each combination of
//! interior, boundary and exterior of the two operands, the dimension of the
//! intersection of those point sets (`-1` for empty, else 0, 1 or 2). A
//! pattern is a nine-symbol template matched against the matrix, in the
//! usual row-major `II IB IE BI BB BE EI EB EE` reading order.
//!
//! During evaluation the matrix only ever grows: every piece of topological
//! evidence raises a cell, never lowers one, and each cell has a ceiling
//! determined by the operand types. The [`MatrixAcc`] accumulator exploits
//! both facts to decide a pattern before the graph is fully traversed.

use std::fmt;
use std::str::FromStr;

use crate::error::{PatternErrorReason, TopologyError};
use crate::geometry::GeometryClass;

/// One cell of the relation matrix. The first letter refers to the first
/// operand, the second to the second operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixCell {
    /// Interior against interior.
    II,
    /// Interior against boundary.
    IB,
    /// Interior against exterior.
    IE,
    /// Boundary against interior.
    BI,
    /// Boundary against boundary.
    BB,
    /// Boundary against exterior.
    BE,
    /// Exterior against interior.
    EI,
    /// Exterior against boundary.
    EB,
    /// Exterior against exterior.
    EE,
}

impl MatrixCell {
    /// All cells in row-major pattern order.
    pub const ALL: [MatrixCell; 9] = [
        MatrixCell::II,
        MatrixCell::IB,
        MatrixCell::IE,
        MatrixCell::BI,
        MatrixCell::BB,
        MatrixCell::BE,
        MatrixCell::EI,
        MatrixCell::EB,
        MatrixCell::EE,
    ];

    /// Position in the nine-symbol string.
    pub fn index(self) -> usize {
        match self {
            MatrixCell::II => 0,
            MatrixCell::IB => 1,
            MatrixCell::IE => 2,
            MatrixCell::BI => 3,
            MatrixCell::BB => 4,
            MatrixCell::BE => 5,
            MatrixCell::EI => 6,
            MatrixCell::EB => 7,
            MatrixCell::EE => 8,
        }
    }

    /// The cell describing the same intersection with the operands swapped.
    pub fn transposed(self) -> MatrixCell {
        let i = self.index();
        MatrixCell::ALL[3 * (i % 3) + i / 3]
    }
}

/// A fully evaluated DE-9IM matrix. Cell values are intersection
/// dimensions: `-1` (empty), `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationMatrix {
    dims: [i8; 9],
}

impl RelationMatrix {
    pub(crate) fn from_dims(dims: [i8; 9]) -> Self {
        debug_assert!(dims.iter().all(|&d| (-1..=2).contains(&d)));
        RelationMatrix { dims }
    }

    /// Intersection dimension of one cell.
    pub fn get(&self, cell: MatrixCell) -> i8 {
        self.dims[cell.index()]
    }

    /// The matrix of the same query with the operands swapped.
    pub fn transposed(&self) -> RelationMatrix {
        let mut dims = [0; 9];
        for cell in MatrixCell::ALL {
            dims[cell.transposed().index()] = self.get(cell);
        }
        RelationMatrix { dims }
    }
}

impl fmt::Display for RelationMatrix {
    /// The nine-character string form, `F` for empty cells.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &d in &self.dims {
            let c = match d {
                -1 => 'F',
                0 => '0',
                1 => '1',
                _ => '2',
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// One symbol of a DE-9IM pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternSym {
    /// `T`: any non-empty intersection.
    NonEmpty,
    /// `F`: empty.
    Empty,
    /// `0`, `1`, `2`: exactly this dimension.
    Dim(i8),
    /// `*`: anything.
    Any,
}

impl PatternSym {
    fn matches(self, dim: i8) -> bool {
        match self {
            PatternSym::NonEmpty => dim >= 0,
            PatternSym::Empty => dim == -1,
            PatternSym::Dim(d) => dim == d,
            PatternSym::Any => true,
        }
    }
}

/// A parsed nine-symbol DE-9IM pattern over `{T, F, 0, 1, 2, *}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    syms: [PatternSym; 9],
}

impl Pattern {
    /// Parse a pattern string; rejects anything but exactly nine symbols
    /// from `{T, F, 0, 1, 2, *}`.
    pub fn parse(pattern: &str) -> Result<Pattern, TopologyError> {
        let invalid = |reason| TopologyError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let mut syms = [PatternSym::Any; 9];
        let mut count = 0;
        for (position, symbol) in pattern.chars().enumerate() {
            let sym = match symbol {
                'T' => PatternSym::NonEmpty,
                'F' => PatternSym::Empty,
                '0' => PatternSym::Dim(0),
                '1' => PatternSym::Dim(1),
                '2' => PatternSym::Dim(2),
                '*' => PatternSym::Any,
                _ => return Err(invalid(PatternErrorReason::IllegalSymbol { position, symbol })),
            };
            if position < 9 {
                syms[position] = sym;
            }
            count += 1;
        }
        if count != 9 {
            return Err(invalid(PatternErrorReason::WrongLength(count)));
        }
        Ok(Pattern { syms })
    }

    /// The pattern matching the operand-swapped query.
    pub fn transposed(&self) -> Pattern {
        let mut syms = [PatternSym::Any; 9];
        for cell in MatrixCell::ALL {
            syms[cell.transposed().index()] = self.syms[cell.index()];
        }
        Pattern { syms }
    }

    /// Does the fully evaluated matrix satisfy the pattern?
    pub fn matches(&self, matrix: &RelationMatrix) -> bool {
        MatrixCell::ALL
            .iter()
            .all(|&cell| self.syms[cell.index()].matches(matrix.get(cell)))
    }

    fn sym(&self, cell: MatrixCell) -> PatternSym {
        self.syms[cell.index()]
    }
}

impl FromStr for Pattern {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sym in self.syms {
            let c = match sym {
                PatternSym::NonEmpty => 'T',
                PatternSym::Empty => 'F',
                PatternSym::Dim(d) => (b'0' + d as u8) as char,
                PatternSym::Any => '*',
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Largest possible value of each cell for a given pair of operand types:
/// the smaller of the two part dimensions, or `-1` when a part is empty
/// (points have no boundary).
pub(crate) fn ceilings(a: GeometryClass, b: GeometryClass) -> [i8; 9] {
    let parts = |class: GeometryClass| -> [i8; 3] {
        [
            class.interior_dim(),
            class.boundary_dim().unwrap_or(-1),
            2,
        ]
    };
    let pa = parts(a);
    let pb = parts(b);
    let mut ceil = [0; 9];
    for cell in MatrixCell::ALL {
        let i = cell.index();
        let (da, db) = (pa[i / 3], pb[i % 3]);
        ceil[i] = if da < 0 || db < 0 { -1 } else { da.min(db) };
    }
    ceil
}

/// Monotonically growing matrix under evaluation.
///
/// Cells start at `-1` and are only ever raised by [`bump`](Self::bump),
/// never past their ceiling. A cell at its ceiling is *resolved*: no further
/// evidence can change it, which is what makes early pattern decisions
/// sound.
#[derive(Debug, Clone)]
pub(crate) struct MatrixAcc {
    dims: [i8; 9],
    ceil: [i8; 9],
}

impl MatrixAcc {
    pub(crate) fn new(ceil: [i8; 9]) -> Self {
        MatrixAcc { dims: [-1; 9], ceil }
    }

    /// Raise a cell to at least `dim`.
    pub(crate) fn bump(&mut self, cell: MatrixCell, dim: i8) {
        let i = cell.index();
        debug_assert!(
            dim <= self.ceil[i],
            "Evidence above the type ceiling for {:?}.",
            cell
        );
        if dim > self.dims[i] {
            self.dims[i] = dim;
        }
    }

    /// Decide the pattern if the evidence so far suffices: `Some(false)` as
    /// soon as some cell can no longer satisfy its symbol, `Some(true)` once
    /// every symbol is satisfied for good, `None` while still open.
    pub(crate) fn decide(&self, pattern: &Pattern) -> Option<bool> {
        let mut all_settled = true;
        for cell in MatrixCell::ALL {
            let i = cell.index();
            let (dim, ceil) = (self.dims[i], self.ceil[i]);
            // The final value lies in dim..=ceil.
            let (settled, can_hold) = match pattern.sym(cell) {
                PatternSym::Any => (true, true),
                PatternSym::NonEmpty => (dim >= 0, ceil >= 0),
                PatternSym::Empty => (ceil == -1, dim == -1),
                PatternSym::Dim(d) => (dim == d && ceil == d, dim <= d && d <= ceil),
            };
            if !can_hold {
                return Some(false);
            }
            if !settled {
                all_settled = false;
            }
        }
        if all_settled {
            Some(true)
        } else {
            None
        }
    }

    /// Final matrix; cells without evidence stay empty.
    pub(crate) fn finish(self) -> RelationMatrix {
        RelationMatrix::from_dims(self.dims)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        for s in ["T*F**FFF*", "FF*FF****", "012TF*012"] {
            assert_eq!(Pattern::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn parse_rejects_bad_patterns() {
        assert_eq!(
            Pattern::parse("T*F"),
            Err(TopologyError::InvalidPattern {
                pattern: "T*F".to_string(),
                reason: PatternErrorReason::WrongLength(3),
            })
        );
        assert_eq!(
            Pattern::parse("T*F**FFF*T"),
            Err(TopologyError::InvalidPattern {
                pattern: "T*F**FFF*T".to_string(),
                reason: PatternErrorReason::WrongLength(10),
            })
        );
        assert_eq!(
            Pattern::parse("T*F**FXF*"),
            Err(TopologyError::InvalidPattern {
                pattern: "T*F**FXF*".to_string(),
                reason: PatternErrorReason::IllegalSymbol {
                    position: 6,
                    symbol: 'X',
                },
            })
        );
        // Lowercase is not part of the symbol alphabet.
        assert!(Pattern::parse("t*f**fff*").is_err());
    }

    #[test]
    fn matrix_display_and_get() {
        let m = RelationMatrix::from_dims([2, 1, 2, 1, 0, 1, 2, 1, 2]);
        assert_eq!(m.to_string(), "212101212");
        assert_eq!(m.get(MatrixCell::BB), 0);

        let empty = RelationMatrix::from_dims([-1; 9]);
        assert_eq!(empty.to_string(), "FFFFFFFFF");
    }

    #[test]
    fn transpose_swaps_rows_and_columns() {
        let m = RelationMatrix::from_dims([0, 1, 2, -1, 0, 1, 2, -1, 0]);
        let t = m.transposed();
        assert_eq!(t.get(MatrixCell::IB), m.get(MatrixCell::BI));
        assert_eq!(t.get(MatrixCell::EI), m.get(MatrixCell::IE));
        assert_eq!(t.get(MatrixCell::BB), m.get(MatrixCell::BB));
        assert_eq!(t.transposed(), m);

        // Contains transposes to within; equals is its own transpose.
        let contains = Pattern::parse("T*****FF*").unwrap();
        assert_eq!(contains.transposed().to_string(), "T*F**F***");
        assert_eq!(contains.transposed().transposed(), contains);
        let equals = Pattern::parse("T*F**FFF*").unwrap();
        assert_eq!(equals.transposed(), equals);
    }

    #[test]
    fn pattern_matching_semantics() {
        let m = RelationMatrix::from_dims([2, 1, 2, 1, 1, 1, 2, 1, 2]);
        assert!(Pattern::parse("T*T***T**").unwrap().matches(&m));
        assert!(Pattern::parse("212111212").unwrap().matches(&m));
        assert!(!Pattern::parse("F********").unwrap().matches(&m));
        assert!(!Pattern::parse("0********").unwrap().matches(&m));
        assert!(Pattern::parse("*********").unwrap().matches(&m));
    }

    #[test]
    fn ceilings_by_type() {
        use GeometryClass::*;
        assert_eq!(ceilings(Area, Area), [2, 1, 2, 1, 1, 1, 2, 1, 2]);
        assert_eq!(ceilings(Area, Line), [1, 0, 2, 1, 0, 1, 1, 0, 2]);
        assert_eq!(ceilings(Line, Point), [0, -1, 1, 0, -1, 0, 0, -1, 2]);
        assert_eq!(ceilings(Point, Point), [0, -1, 0, -1, -1, -1, 0, -1, 2]);
    }

    #[test]
    fn bump_is_monotonic() {
        let mut acc = MatrixAcc::new(ceilings(GeometryClass::Area, GeometryClass::Area));
        acc.bump(MatrixCell::II, 0);
        acc.bump(MatrixCell::II, 2);
        acc.bump(MatrixCell::II, 1);
        // At its ceiling the cell is settled for good.
        assert_eq!(acc.decide(&Pattern::parse("2********").unwrap()), Some(true));
        assert_eq!(acc.finish().get(MatrixCell::II), 2);
    }

    #[test]
    fn early_decisions() {
        let ceil = ceilings(GeometryClass::Area, GeometryClass::Area);
        let disjoint = Pattern::parse("FF*FF****").unwrap();
        let intersects = Pattern::parse("T********").unwrap();

        let mut acc = MatrixAcc::new(ceil);
        // Nothing known yet: neither pattern is decided.
        assert_eq!(acc.decide(&disjoint), None);
        assert_eq!(acc.decide(&intersects), None);

        // One point of interior overlap refutes disjointness and settles
        // the T cell at once.
        acc.bump(MatrixCell::II, 0);
        assert_eq!(acc.decide(&disjoint), Some(false));
        assert_eq!(acc.decide(&intersects), Some(true));
    }

    #[test]
    fn empty_ceiling_settles_f_cells() {
        // Against a point operand there is no boundary column; F there is
        // satisfied from the start.
        let ceil = ceilings(GeometryClass::Line, GeometryClass::Point);
        let acc = MatrixAcc::new(ceil);
        let p = Pattern::parse("*F**F**F*").unwrap();
        assert_eq!(acc.decide(&p), Some(true));
    }
}
