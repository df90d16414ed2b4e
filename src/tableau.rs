//! Butcher tableaux: `Tableau<N>` (single) and `IMEXTableau<N>` (paired
//! implicit/explicit) with character-tag lookup.
//!
//! Lookup stays a single indirection (`O(1)`): no search, no allocation.
//!
//! Predefined constants `cb2()`/`cb3e()` hold the exact rational IMEX
//! coefficients used by the CB3R2R family of methods.

#![forbid(unsafe_code)]

/// Errors raised by tableau construction and lookup.
#[derive(Debug, thiserror::Error)]
pub enum TableauError {
    /// `a` did not have exactly `N*N` entries in row-major order.
    #[error("tableau of size {n} expects {expected} flattened `a` entries, got {got}")]
    BadFlatLen {
        /// Declared dimension.
        n: usize,
        /// Expected flattened length (`n*n`).
        expected: usize,
        /// Actual length supplied.
        got: usize,
    },
    /// An unrecognized role character was passed to a lookup.
    #[error("unknown tableau role '{0}'")]
    UnknownRole(char),
    /// An index was out of the tableau's declared range.
    #[error("tableau index {index} out of range (N={n})")]
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Tableau dimension.
        n: usize,
    },
}

/// A single Runge–Kutta Butcher tableau of fixed size `N`.
///
/// `a` is stored flattened, row-major, `N*N`; entries above the diagonal
/// are conventionally zero for the schemes this crate implements but are
/// not enforced as such (callers may store a full square and rely on the
/// stepping algorithm to only ever read `j <= k`).
#[derive(Clone, Debug, PartialEq)]
pub struct Tableau<const N: usize> {
    a: Vec<f64>,
    b: [f64; N],
    c: [f64; N],
}

impl<const N: usize> Tableau<N> {
    /// Build a tableau from a flattened `a` (row-major, length `N*N`), `b`, `c` (Result).
    pub fn new_r(a_flat: Vec<f64>, b: [f64; N], c: [f64; N]) -> Result<Self, TableauError> {
        let expected = N * N;
        if a_flat.len() != expected {
            return Err(TableauError::BadFlatLen {
                n: N,
                expected,
                got: a_flat.len(),
            });
        }
        Ok(Self { a: a_flat, b, c })
    }

    /// Back-compat wrapper (panics on malformed input).
    pub fn new(a_flat: Vec<f64>, b: [f64; N], c: [f64; N]) -> Self {
        Self::new_r(a_flat, b, c).expect("malformed tableau")
    }

    /// `a[j][k]`, `0 <= j,k < N`.
    #[inline]
    pub fn a(&self, j: usize, k: usize) -> f64 {
        self.a[j * N + k]
    }

    /// `b[k]`.
    #[inline]
    pub fn b(&self, k: usize) -> f64 {
        self.b[k]
    }

    /// `c[k]`.
    #[inline]
    pub fn c(&self, k: usize) -> f64 {
        self.c[k]
    }

    /// Number of stages.
    #[inline]
    pub fn n(&self) -> usize {
        N
    }
}

/// A pair of tableaux — implicit and explicit — addressed by a
/// character-tag lookup convention: `('I'|'E', 'a', j, k)` and
/// `('I'|'E', 'b'|'c', k)`.
#[derive(Clone, Debug, PartialEq)]
pub struct IMEXTableau<const N: usize> {
    implicit: Tableau<N>,
    explicit: Tableau<N>,
}

impl<const N: usize> IMEXTableau<N> {
    /// Pair an implicit and an explicit tableau of equal size.
    pub fn new(implicit: Tableau<N>, explicit: Tableau<N>) -> Self {
        Self { implicit, explicit }
    }

    /// `a[j][k]` from the named half.
    #[inline]
    pub fn a(&self, half: char, j: usize, k: usize) -> f64 {
        match half {
            'I' => self.implicit.a(j, k),
            'E' => self.explicit.a(j, k),
            other => panic!("unknown tableau half '{other}'"),
        }
    }

    /// `b[k]` from the named half.
    #[inline]
    pub fn b(&self, half: char, k: usize) -> f64 {
        match half {
            'I' => self.implicit.b(k),
            'E' => self.explicit.b(k),
            other => panic!("unknown tableau half '{other}'"),
        }
    }

    /// `c[k]` from the named half.
    #[inline]
    pub fn c(&self, half: char, k: usize) -> f64 {
        match half {
            'I' => self.implicit.c(k),
            'E' => self.explicit.c(k),
            other => panic!("unknown tableau half '{other}'"),
        }
    }

    /// Role-tagged lookup: `tab.get('I', 'a', j, k)`, `tab.get('E', 'b',
    /// k)`. `idx1`/`idx2` are only consulted for role `'a'`.
    pub fn get_r(
        &self,
        half: char,
        role: char,
        idx1: usize,
        idx2: usize,
    ) -> Result<f64, TableauError> {
        if half != 'I' && half != 'E' {
            return Err(TableauError::UnknownRole(half));
        }
        if idx1 >= N || (role == 'a' && idx2 >= N) {
            return Err(TableauError::IndexOutOfRange { index: idx1.max(idx2), n: N });
        }
        match role {
            'a' => Ok(self.a(half, idx1, idx2)),
            'b' => Ok(self.b(half, idx1)),
            'c' => Ok(self.c(half, idx1)),
            other => Err(TableauError::UnknownRole(other)),
        }
    }

    /// Number of stages.
    #[inline]
    pub fn n(&self) -> usize {
        N
    }
}

/// CB2: the 2nd-order, 3-stage CB3R2R IMEX tableau.
///
/// Exact rational coefficients (see `SPEC_FULL.md` §6 / `DESIGN.md`).
pub fn cb2() -> IMEXTableau<3> {
    #[rustfmt::skip]
    let ai = Tableau::new(
        vec![
            0.0,     0.0,     0.0,
            0.0,     2.0/5.0, 0.0,
            0.0,     5.0/6.0, 1.0/6.0,
        ],
        [0.0, 5.0 / 6.0, 1.0 / 6.0],
        [0.0, 2.0 / 5.0, 1.0],
    );
    #[rustfmt::skip]
    let ae = Tableau::new(
        vec![
            0.0,     0.0, 0.0,
            2.0/5.0, 0.0, 0.0,
            0.0,     1.0, 0.0,
        ],
        [0.0, 5.0 / 6.0, 1.0 / 6.0],
        [0.0, 2.0 / 5.0, 1.0],
    );
    IMEXTableau::new(ai, ae)
}

/// CB3e: the 3rd-order, 4-stage CB3R2R IMEX tableau.
pub fn cb3e() -> IMEXTableau<4> {
    #[rustfmt::skip]
    let ai = Tableau::new(
        vec![
            0.0, 0.0,      0.0,       0.0,
            0.0, 1.0/3.0,  0.0,       0.0,
            0.0, 1.0/2.0,  1.0/2.0,   0.0,
            0.0, 3.0/4.0, -1.0/4.0,   1.0/2.0,
        ],
        [0.0, 3.0 / 4.0, -1.0 / 4.0, 1.0 / 2.0],
        [0.0, 1.0 / 3.0, 1.0, 1.0],
    );
    #[rustfmt::skip]
    let ae = Tableau::new(
        vec![
            0.0,     0.0,      0.0,      0.0,
            1.0/3.0, 0.0,      0.0,      0.0,
            0.0,     1.0,      0.0,      0.0,
            0.0,     3.0/4.0,  1.0/4.0,  0.0,
        ],
        [0.0, 3.0 / 4.0, -1.0 / 4.0, 1.0 / 2.0],
        [0.0, 1.0 / 3.0, 1.0, 1.0],
    );
    IMEXTableau::new(ai, ae)
}
