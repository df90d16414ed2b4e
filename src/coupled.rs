//! Coupled values: `Pair`/`Triplet` heterogeneous tuples with lazy,
//! componentwise arithmetic.
//!
//! The expression tree (`Leaf`/`Add`/`Sub`/`MulScalar`/`DivScalar`) is
//! borrow-only: building an expression never allocates, and it is
//! walked exactly once, on `assign`, per destination element.
//!
//! A `Coupled` can be **owning** (it stores `f64`/`Array1<f64>` slots by
//! value) or **referential** (it stores `&mut f64`/`&mut Array1<f64>`
//! slots; mutating the `Coupled` mutates the values it borrows). Both
//! modes are the same struct, parameterized over a slot type that
//! implements [`Lane`] — owned lanes and `&mut` lanes both qualify.

#![forbid(unsafe_code)]

use ndarray::Array1;

/// Errors raised when assembling or assigning into a coupled value.
#[derive(Debug, thiserror::Error)]
pub enum CoupledError {
    /// The source expression's slot count didn't match the destination's.
    #[error("coupled arity mismatch: destination has {expected} slots, source has {found}")]
    ArityMismatch {
        /// Destination arity.
        expected: usize,
        /// Source arity.
        found: usize,
    },
    /// A vector slot's length didn't match between source and destination.
    #[error("slot {slot} length mismatch: destination has {expected}, source has {found}")]
    LengthMismatch {
        /// Slot index (0-based).
        slot: usize,
        /// Destination element count.
        expected: usize,
        /// Source element count.
        found: usize,
    },
}

/// A single arithmetic or vector slot within a `Coupled` value.
///
/// Implemented for the two concrete lane types this crate supports
/// (`f64`, `ndarray::Array1<f64>`) and, generically, for `&mut T` so that
/// the same `Pair`/`Triplet` struct can represent both the owning and the
/// referential coupling mode.
pub trait Lane {
    /// Number of addressable elements (`1` for a scalar lane).
    fn lane_len(&self) -> usize;
    /// Read element `k`.
    fn lane_get(&self, k: usize) -> f64;
    /// Write element `k`.
    fn lane_set(&mut self, k: usize, v: f64);
}

impl Lane for f64 {
    #[inline]
    fn lane_len(&self) -> usize {
        1
    }
    #[inline]
    fn lane_get(&self, k: usize) -> f64 {
        debug_assert_eq!(k, 0, "scalar lane indexed out of range");
        *self
    }
    #[inline]
    fn lane_set(&mut self, k: usize, v: f64) {
        debug_assert_eq!(k, 0, "scalar lane indexed out of range");
        *self = v;
    }
}

impl Lane for Array1<f64> {
    #[inline]
    fn lane_len(&self) -> usize {
        self.len()
    }
    #[inline]
    fn lane_get(&self, k: usize) -> f64 {
        self[k]
    }
    #[inline]
    fn lane_set(&mut self, k: usize, v: f64) {
        self[k] = v;
    }
}

impl<T: Lane + ?Sized> Lane for &mut T {
    #[inline]
    fn lane_len(&self) -> usize {
        (**self).lane_len()
    }
    #[inline]
    fn lane_get(&self, k: usize) -> f64 {
        (**self).lane_get(k)
    }
    #[inline]
    fn lane_set(&mut self, k: usize, v: f64) {
        (**self).lane_set(k, v)
    }
}

/// Read access to a coupled value's slots, independent of arity.
pub trait Slots {
    /// Number of slots (2 for `Pair`, 3 for `Triplet`).
    fn arity(&self) -> usize;
    /// Element count of slot `slot`.
    fn slot_len(&self, slot: usize) -> usize;
    /// Read element `k` of slot `slot`.
    fn slot_get(&self, slot: usize, k: usize) -> f64;
}

/// Write access to a coupled value's slots.
pub trait SlotsMut: Slots {
    /// Write element `k` of slot `slot`.
    fn slot_set(&mut self, slot: usize, k: usize, v: f64);
}

/// Two-slot coupled value.
#[derive(Clone, Debug)]
pub struct Pair<A, B> {
    /// First slot.
    pub a: A,
    /// Second slot.
    pub b: B,
}

/// Three-slot coupled value.
#[derive(Clone, Debug)]
pub struct Triplet<A, B, C> {
    /// First slot.
    pub a: A,
    /// Second slot.
    pub b: B,
    /// Third slot.
    pub c: C,
}

/// Construct an owning `Pair` from two values.
pub fn couple<A: Lane, B: Lane>(a: A, b: B) -> Pair<A, B> {
    Pair { a, b }
}

/// Construct a referential `Pair` that borrows two existing lanes;
/// mutating the pair mutates `a`/`b` in place.
pub fn refcouple<'x, A: Lane, B: Lane>(a: &'x mut A, b: &'x mut B) -> Pair<&'x mut A, &'x mut B> {
    Pair { a, b }
}

/// Construct an owning `Triplet` from three values.
pub fn couple3<A: Lane, B: Lane, C: Lane>(a: A, b: B, c: C) -> Triplet<A, B, C> {
    Triplet { a, b, c }
}

/// Construct a referential `Triplet` that borrows three existing lanes.
pub fn refcouple3<'x, A: Lane, B: Lane, C: Lane>(
    a: &'x mut A,
    b: &'x mut B,
    c: &'x mut C,
) -> Triplet<&'x mut A, &'x mut B, &'x mut C> {
    Triplet { a, b, c }
}

impl<A: Lane, B: Lane> Slots for Pair<A, B> {
    fn arity(&self) -> usize {
        2
    }
    fn slot_len(&self, slot: usize) -> usize {
        match slot {
            0 => self.a.lane_len(),
            1 => self.b.lane_len(),
            _ => panic!("slot {slot} out of range for Pair"),
        }
    }
    fn slot_get(&self, slot: usize, k: usize) -> f64 {
        match slot {
            0 => self.a.lane_get(k),
            1 => self.b.lane_get(k),
            _ => panic!("slot {slot} out of range for Pair"),
        }
    }
}

impl<A: Lane, B: Lane> SlotsMut for Pair<A, B> {
    fn slot_set(&mut self, slot: usize, k: usize, v: f64) {
        match slot {
            0 => self.a.lane_set(k, v),
            1 => self.b.lane_set(k, v),
            _ => panic!("slot {slot} out of range for Pair"),
        }
    }
}

impl<A: Lane, B: Lane, C: Lane> Slots for Triplet<A, B, C> {
    fn arity(&self) -> usize {
        3
    }
    fn slot_len(&self, slot: usize) -> usize {
        match slot {
            0 => self.a.lane_len(),
            1 => self.b.lane_len(),
            2 => self.c.lane_len(),
            _ => panic!("slot {slot} out of range for Triplet"),
        }
    }
    fn slot_get(&self, slot: usize, k: usize) -> f64 {
        match slot {
            0 => self.a.lane_get(k),
            1 => self.b.lane_get(k),
            2 => self.c.lane_get(k),
            _ => panic!("slot {slot} out of range for Triplet"),
        }
    }
}

impl<A: Lane, B: Lane, C: Lane> SlotsMut for Triplet<A, B, C> {
    fn slot_set(&mut self, slot: usize, k: usize, v: f64) {
        match slot {
            0 => self.a.lane_set(k, v),
            1 => self.b.lane_set(k, v),
            2 => self.c.lane_set(k, v),
            _ => panic!("slot {slot} out of range for Triplet"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lazy expression tree
// ---------------------------------------------------------------------------

/// A borrowing leaf wrapping a reference to an existing `Slots` value.
pub struct Leaf<'s, S: Slots>(&'s S);

impl<'s, S: Slots> Slots for Leaf<'s, S> {
    fn arity(&self) -> usize {
        self.0.arity()
    }
    fn slot_len(&self, slot: usize) -> usize {
        self.0.slot_len(slot)
    }
    fn slot_get(&self, slot: usize, k: usize) -> f64 {
        self.0.slot_get(slot, k)
    }
}

/// `L + R`, evaluated elementwise on read.
pub struct ExprAdd<L: Slots, R: Slots>(L, R);

impl<L: Slots, R: Slots> Slots for ExprAdd<L, R> {
    fn arity(&self) -> usize {
        self.0.arity()
    }
    fn slot_len(&self, slot: usize) -> usize {
        self.0.slot_len(slot)
    }
    fn slot_get(&self, slot: usize, k: usize) -> f64 {
        self.0.slot_get(slot, k) + self.1.slot_get(slot, k)
    }
}

/// `L - R`, evaluated elementwise on read.
pub struct ExprSub<L: Slots, R: Slots>(L, R);

impl<L: Slots, R: Slots> Slots for ExprSub<L, R> {
    fn arity(&self) -> usize {
        self.0.arity()
    }
    fn slot_len(&self, slot: usize) -> usize {
        self.0.slot_len(slot)
    }
    fn slot_get(&self, slot: usize, k: usize) -> f64 {
        self.0.slot_get(slot, k) - self.1.slot_get(slot, k)
    }
}

/// `E * s`, evaluated elementwise on read.
pub struct ExprMulScalar<E: Slots>(E, f64);

impl<E: Slots> Slots for ExprMulScalar<E> {
    fn arity(&self) -> usize {
        self.0.arity()
    }
    fn slot_len(&self, slot: usize) -> usize {
        self.0.slot_len(slot)
    }
    fn slot_get(&self, slot: usize, k: usize) -> f64 {
        self.0.slot_get(slot, k) * self.1
    }
}

/// `E / s`, evaluated elementwise on read.
pub struct ExprDivScalar<E: Slots>(E, f64);

impl<E: Slots> Slots for ExprDivScalar<E> {
    fn arity(&self) -> usize {
        self.0.arity()
    }
    fn slot_len(&self, slot: usize) -> usize {
        self.0.slot_len(slot)
    }
    fn slot_get(&self, slot: usize, k: usize) -> f64 {
        // Division by a scalar zero is undefined behavior at the model
        // level (propagates as IEEE-754 inf/NaN); not caught here.
        self.0.slot_get(slot, k) / self.1
    }
}

/// Local newtype wrapping any `Slots`-typed expression node, so that
/// operator overloads (`+`, `-`, `*`, `/`) can be implemented without
/// running afoul of the orphan rule (`std::ops::Add` is foreign; `E<T>`
/// is local).
pub struct E<T: Slots>(pub T);

impl<T: Slots> Slots for E<T> {
    fn arity(&self) -> usize {
        self.0.arity()
    }
    fn slot_len(&self, slot: usize) -> usize {
        self.0.slot_len(slot)
    }
    fn slot_get(&self, slot: usize, k: usize) -> f64 {
        self.0.slot_get(slot, k)
    }
}

impl<L: Slots, R: Slots> std::ops::Add<E<R>> for E<L> {
    type Output = E<ExprAdd<L, R>>;
    fn add(self, rhs: E<R>) -> Self::Output {
        E(ExprAdd(self.0, rhs.0))
    }
}

impl<L: Slots, R: Slots> std::ops::Sub<E<R>> for E<L> {
    type Output = E<ExprSub<L, R>>;
    fn sub(self, rhs: E<R>) -> Self::Output {
        E(ExprSub(self.0, rhs.0))
    }
}

impl<T: Slots> std::ops::Mul<f64> for E<T> {
    type Output = E<ExprMulScalar<T>>;
    fn mul(self, s: f64) -> Self::Output {
        E(ExprMulScalar(self.0, s))
    }
}

impl<T: Slots> std::ops::Mul<E<T>> for f64 {
    type Output = E<ExprMulScalar<T>>;
    fn mul(self, rhs: E<T>) -> Self::Output {
        E(ExprMulScalar(rhs.0, self))
    }
}

impl<T: Slots> std::ops::Div<f64> for E<T> {
    type Output = E<ExprDivScalar<T>>;
    fn div(self, s: f64) -> Self::Output {
        E(ExprDivScalar(self.0, s))
    }
}

/// Shared entry points for building and assigning lazy expressions over a
/// coupled value. Implemented for `Pair`/`Triplet` of any lane type.
pub trait Coupled: SlotsMut + Sized {
    /// Borrow `self` as a lazy expression leaf.
    fn expr(&self) -> E<Leaf<'_, Self>> {
        E(Leaf(self))
    }

    /// Evaluate `expr` and assign it into `self`, slot-ascending then
    /// element-ascending (matches spec.md §4.2's tie-break rule), in a
    /// single traversal with no intermediate temporaries.
    fn assign(&mut self, expr: E<impl Slots>) -> Result<(), CoupledError> {
        let src = expr.0;
        if src.arity() != self.arity() {
            return Err(CoupledError::ArityMismatch {
                expected: self.arity(),
                found: src.arity(),
            });
        }
        for slot in 0..self.arity() {
            let want = self.slot_len(slot);
            let got = src.slot_len(slot);
            if want != got {
                return Err(CoupledError::LengthMismatch {
                    slot,
                    expected: want,
                    found: got,
                });
            }
            for k in 0..want {
                let v = src.slot_get(slot, k);
                self.slot_set(slot, k, v);
            }
        }
        Ok(())
    }

    /// Broadcast a scalar to every element of every slot.
    fn fill(&mut self, v: f64) {
        for slot in 0..self.arity() {
            for k in 0..self.slot_len(slot) {
                self.slot_set(slot, k, v);
            }
        }
    }
}

impl<A: Lane, B: Lane> Coupled for Pair<A, B> {}
impl<A: Lane, B: Lane, C: Lane> Coupled for Triplet<A, B, C> {}

// ---------------------------------------------------------------------------
// Owning `Pair`/`Triplet` as a generic `State` (direct/eager arithmetic,
// used by Method/System/Flow; see `crate::system::State`).
// ---------------------------------------------------------------------------

fn zip_new<A: Lane + Clone, B: Lane + Clone>(
    lhs: &Pair<A, B>,
    rhs: &Pair<A, B>,
    op: impl Fn(f64, f64) -> f64,
) -> Pair<A, B> {
    let mut out = lhs.clone();
    for k in 0..out.a.lane_len() {
        out.a.lane_set(k, op(lhs.a.lane_get(k), rhs.a.lane_get(k)));
    }
    for k in 0..out.b.lane_len() {
        out.b.lane_set(k, op(lhs.b.lane_get(k), rhs.b.lane_get(k)));
    }
    out
}

impl<A: Lane + Clone, B: Lane + Clone> std::ops::Add for Pair<A, B> {
    type Output = Pair<A, B>;
    fn add(self, rhs: Self) -> Self::Output {
        zip_new(&self, &rhs, |x, y| x + y)
    }
}

impl<A: Lane + Clone, B: Lane + Clone> std::ops::Sub for Pair<A, B> {
    type Output = Pair<A, B>;
    fn sub(self, rhs: Self) -> Self::Output {
        zip_new(&self, &rhs, |x, y| x - y)
    }
}

impl<A: Lane + Clone, B: Lane + Clone> std::ops::Mul<f64> for Pair<A, B> {
    type Output = Pair<A, B>;
    fn mul(self, s: f64) -> Self::Output {
        let mut out = self.clone();
        for k in 0..out.a.lane_len() {
            out.a.lane_set(k, self.a.lane_get(k) * s);
        }
        for k in 0..out.b.lane_len() {
            out.b.lane_set(k, self.b.lane_get(k) * s);
        }
        out
    }
}

impl<A: Lane + Clone, B: Lane + Clone> std::ops::Div<f64> for Pair<A, B> {
    type Output = Pair<A, B>;
    fn div(self, s: f64) -> Self::Output {
        self * (1.0 / s)
    }
}

fn zip3_new<A: Lane + Clone, B: Lane + Clone, C: Lane + Clone>(
    lhs: &Triplet<A, B, C>,
    rhs: &Triplet<A, B, C>,
    op: impl Fn(f64, f64) -> f64,
) -> Triplet<A, B, C> {
    let mut out = lhs.clone();
    for k in 0..out.a.lane_len() {
        out.a.lane_set(k, op(lhs.a.lane_get(k), rhs.a.lane_get(k)));
    }
    for k in 0..out.b.lane_len() {
        out.b.lane_set(k, op(lhs.b.lane_get(k), rhs.b.lane_get(k)));
    }
    for k in 0..out.c.lane_len() {
        out.c.lane_set(k, op(lhs.c.lane_get(k), rhs.c.lane_get(k)));
    }
    out
}

impl<A: Lane + Clone, B: Lane + Clone, C: Lane + Clone> std::ops::Add for Triplet<A, B, C> {
    type Output = Triplet<A, B, C>;
    fn add(self, rhs: Self) -> Self::Output {
        zip3_new(&self, &rhs, |x, y| x + y)
    }
}

impl<A: Lane + Clone, B: Lane + Clone, C: Lane + Clone> std::ops::Sub for Triplet<A, B, C> {
    type Output = Triplet<A, B, C>;
    fn sub(self, rhs: Self) -> Self::Output {
        zip3_new(&self, &rhs, |x, y| x - y)
    }
}

impl<A: Lane + Clone, B: Lane + Clone, C: Lane + Clone> std::ops::Mul<f64> for Triplet<A, B, C> {
    type Output = Triplet<A, B, C>;
    fn mul(self, s: f64) -> Self::Output {
        let mut out = self.clone();
        for k in 0..out.a.lane_len() {
            out.a.lane_set(k, self.a.lane_get(k) * s);
        }
        for k in 0..out.b.lane_len() {
            out.b.lane_set(k, self.b.lane_get(k) * s);
        }
        for k in 0..out.c.lane_len() {
            out.c.lane_set(k, self.c.lane_get(k) * s);
        }
        out
    }
}

impl<A: Lane + Clone, B: Lane + Clone, C: Lane + Clone> std::ops::Div<f64> for Triplet<A, B, C> {
    type Output = Triplet<A, B, C>;
    fn div(self, s: f64) -> Self::Output {
        self * (1.0 / s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_matches_hand_written_loop() {
        let a = couple(1.0_f64, 2.0_f64);
        let b = couple(3.0_f64, 4.0_f64);
        let mut c = couple(0.0_f64, 0.0_f64);
        c.assign(a.expr() * 2.0 + b.expr() * 3.0 - a.expr() * 2.0 + b.expr() / 1.5)
            .unwrap();
        let expected_a = 2.0 * a.a + 3.0 * b.a - a.a * 2.0 + b.a / 1.5;
        let expected_b = 2.0 * a.b + 3.0 * b.b - a.b * 2.0 + b.b / 1.5;
        assert!((c.a - expected_a).abs() < 1e-15);
        assert!((c.b - expected_b).abs() < 1e-15);
    }

    #[test]
    fn broadcast_scalar_fills_every_slot() {
        let mut c = couple(1.0_f64, Array1::from(vec![1.0, 2.0, 3.0]));
        c.fill(0.0);
        assert_eq!(c.a, 0.0);
        assert_eq!(c.b, Array1::from(vec![0.0, 0.0, 0.0]));
    }

    #[test]
    fn referential_pair_mutates_originals() {
        let mut x = 1.0_f64;
        let mut q = 2.0_f64;
        {
            let mut z = refcouple(&mut x, &mut q);
            z.fill(9.0);
        }
        assert_eq!(x, 9.0);
        assert_eq!(q, 9.0);
    }

    #[test]
    fn arity_mismatch_is_reported() {
        let a = couple(1.0_f64, 2.0_f64);
        let mut dest = couple3(0.0_f64, 0.0_f64, 0.0_f64);
        let err = dest.assign(a.expr()).unwrap_err();
        assert!(matches!(
            err,
            CoupledError::ArityMismatch { expected: 3, found: 2 }
        ));
    }

    #[test]
    fn vector_length_mismatch_is_reported() {
        let a = couple(Array1::from(vec![1.0, 2.0]), 0.0_f64);
        let mut dest = couple(Array1::from(vec![1.0, 2.0, 3.0]), 0.0_f64);
        let err = dest.assign(a.expr()).unwrap_err();
        assert!(matches!(
            err,
            CoupledError::LengthMismatch { slot: 0, expected: 3, found: 2 }
        ));
    }
}
