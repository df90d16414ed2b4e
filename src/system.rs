//! System wrapper: pairs explicit (nonlinear) and implicit (linear)
//! right-hand-side terms, dispatching slot-wise for coupled states.
//!
//! `State` is the arithmetic bound every state type used by a
//! `Method`/`Flow` must satisfy: `Clone + Add + Sub + Mul<f64> +
//! Div<f64>`. It is blanket-implemented for `f64` and
//! `ndarray::Array1<f64>`, and directly implemented for owning
//! `Pair`/`Triplet` (see `crate::coupled`).

#![forbid(unsafe_code)]

use ndarray::Array1;
use std::ops::{Add, Div, Mul, Sub};

/// The arithmetic every integrator-visible state type must support.
pub trait State: Clone + Add<Output = Self> + Sub<Output = Self> + Mul<f64, Output = Self> + Div<f64, Output = Self> {
    /// The additive identity with the same shape as `self` (e.g. a
    /// same-length zero vector). Built from `self.clone() * 0.0` by
    /// default, which works for every `State` impl in this crate.
    fn zero_like(&self) -> Self {
        self.clone() * 0.0
    }
}

impl<T> State for T where
    T: Clone + Add<Output = T> + Sub<Output = T> + Mul<f64, Output = T> + Div<f64, Output = T>
{
}

/// Explicit (nonlinear) right-hand side for an arity-1 (non-coupled) state.
pub trait Explicit0<X> {
    /// `dxdt := f_E(t, x)`.
    fn eval(&self, t: f64, x: &X, dxdt: &mut X);
}

/// Explicit right-hand side for slot 1 of a `Pair`, which may read slot
/// 0's state and derivative (the base trajectory it is coupled against).
pub trait Explicit1<X0, X1> {
    /// `dx1dt := f_E(t, x0, dx0dt, x1)`.
    fn eval(&self, t: f64, x0: &X0, dx0dt: &X0, x1: &X1, dx1dt: &mut X1);
}

/// Explicit right-hand side for slot 2 of a `Triplet`, which may read
/// slots 0 and 1's state and derivative.
pub trait Explicit2<X0, X1, X2> {
    /// `dx2dt := f_E(t, x0, dx0dt, x1, dx1dt, x2)`.
    #[allow(clippy::too_many_arguments)]
    fn eval(&self, t: f64, x0: &X0, dx0dt: &X0, x1: &X1, dx1dt: &X1, x2: &X2, dx2dt: &mut X2);
}

/// The adjoint (transpose-Jacobian) form of an arity-1 explicit term:
/// `dlambda := J_fE(x_stage)^T * lambda`, evaluated at a recorded forward
/// stage rather than the costate itself (required since the Jacobian of a
/// nonlinear right-hand side is stage-dependent).
pub trait AdjointExplicit0<X> {
    /// `dlambda_dt := J_fE(t, x_stage)^T * lambda`.
    fn eval_adjoint(&self, t: f64, x_stage: &X, lambda: &X, dlambda_dt: &mut X);
}

/// A linear implicit term `A`. `NoOpImplicit` reports a zero operator.
pub trait Implicit<X> {
    /// `dz := A * z`.
    fn mul(&self, dz: &mut X, z: &X);
    /// `dz := (I - c*A) * z`.
    fn imca_mul(&self, dz: &mut X, z: &X, c: f64);
    /// Solve `(I - c*A) * dz = z` for `dz`.
    fn imca_div(&self, dz: &mut X, z: &X, c: f64);
}

/// The null implicit term: `A*z = 0`, `(I-cA)*z = z`, `(I-cA)^-1*z = z`.
pub struct NoOpImplicit;

impl<X: State> Implicit<X> for NoOpImplicit {
    fn mul(&self, dz: &mut X, z: &X) {
        *dz = z.zero_like();
    }
    fn imca_mul(&self, dz: &mut X, z: &X, _c: f64) {
        *dz = z.clone();
    }
    fn imca_div(&self, dz: &mut X, z: &X, _c: f64) {
        *dz = z.clone();
    }
}

/// Uniform invocation surface a `Method` drives, independent of the
/// state's coupled arity.
pub trait SystemOps<X> {
    /// `dxdt := f_E(t, x) + A*x` is *not* computed here; this evaluates
    /// only the explicit term, matching the reference contract where the
    /// implicit contribution is folded in by the stepping algorithm via
    /// `mul`/`imca_mul`/`imca_div`.
    fn eval(&self, t: f64, x: &X, dxdt: &mut X);
    /// `dz := A * z`.
    fn mul(&self, dz: &mut X, z: &X);
    /// `dz := (I - c*A) * z`.
    fn imca_mul(&self, dz: &mut X, z: &X, c: f64);
    /// Solve `(I - c*A) * dz = z`.
    fn imca_div(&self, dz: &mut X, z: &X, c: f64);
}

/// The adjoint counterpart of [`SystemOps`]: evaluates the transpose of
/// the explicit term's Jacobian at a recorded forward stage.
pub trait AdjointSystemOps<X> {
    /// `dlambda_dt := J_fE(t, x_stage)^T * lambda`.
    fn eval_adjoint(&self, t: f64, x_stage: &X, lambda: &X, dlambda_dt: &mut X);
}

/// Arity-1 system: one explicit term, one implicit term.
pub struct System1<Ex, Im> {
    /// Explicit (nonlinear) term.
    pub ex: Ex,
    /// Implicit (linear) term.
    pub im: Im,
}

impl<Ex, Im> System1<Ex, Im> {
    /// Pair an explicit and an implicit term.
    pub fn new(ex: Ex, im: Im) -> Self {
        Self { ex, im }
    }
}

impl<X, Ex: Explicit0<X>, Im: Implicit<X>> SystemOps<X> for System1<Ex, Im> {
    fn eval(&self, t: f64, x: &X, dxdt: &mut X) {
        self.ex.eval(t, x, dxdt);
    }
    fn mul(&self, dz: &mut X, z: &X) {
        self.im.mul(dz, z);
    }
    fn imca_mul(&self, dz: &mut X, z: &X, c: f64) {
        self.im.imca_mul(dz, z, c);
    }
    fn imca_div(&self, dz: &mut X, z: &X, c: f64) {
        self.im.imca_div(dz, z, c);
    }
}

impl<X, Ex: AdjointExplicit0<X>, Im> AdjointSystemOps<X> for System1<Ex, Im> {
    fn eval_adjoint(&self, t: f64, x_stage: &X, lambda: &X, dlambda_dt: &mut X) {
        self.ex.eval_adjoint(t, x_stage, lambda, dlambda_dt);
    }
}

/// Arity-2 system: two explicit terms (slot 1 reads slot 0), two implicit
/// terms dispatched slot-wise.
pub struct System2<Ex0, Ex1, Im0, Im1> {
    /// Slot-0 explicit term.
    pub ex0: Ex0,
    /// Slot-1 explicit term (reads slot 0's state/derivative).
    pub ex1: Ex1,
    /// Slot-0 implicit term.
    pub im0: Im0,
    /// Slot-1 implicit term.
    pub im1: Im1,
}

impl<Ex0, Ex1, Im0, Im1> System2<Ex0, Ex1, Im0, Im1> {
    /// Assemble a two-slot system.
    pub fn new(ex0: Ex0, ex1: Ex1, im0: Im0, im1: Im1) -> Self {
        Self { ex0, ex1, im0, im1 }
    }
}

impl<X0, X1, Ex0, Ex1, Im0, Im1> SystemOps<crate::coupled::Pair<X0, X1>>
    for System2<Ex0, Ex1, Im0, Im1>
where
    Ex0: Explicit0<X0>,
    Ex1: Explicit1<X0, X1>,
    Im0: Implicit<X0>,
    Im1: Implicit<X1>,
{
    fn eval(&self, t: f64, x: &crate::coupled::Pair<X0, X1>, dxdt: &mut crate::coupled::Pair<X0, X1>) {
        self.ex0.eval(t, &x.a, &mut dxdt.a);
        self.ex1.eval(t, &x.a, &dxdt.a, &x.b, &mut dxdt.b);
    }
    fn mul(&self, dz: &mut crate::coupled::Pair<X0, X1>, z: &crate::coupled::Pair<X0, X1>) {
        self.im0.mul(&mut dz.a, &z.a);
        self.im1.mul(&mut dz.b, &z.b);
    }
    fn imca_mul(&self, dz: &mut crate::coupled::Pair<X0, X1>, z: &crate::coupled::Pair<X0, X1>, c: f64) {
        self.im0.imca_mul(&mut dz.a, &z.a, c);
        self.im1.imca_mul(&mut dz.b, &z.b, c);
    }
    fn imca_div(&self, dz: &mut crate::coupled::Pair<X0, X1>, z: &crate::coupled::Pair<X0, X1>, c: f64) {
        self.im0.imca_div(&mut dz.a, &z.a, c);
        self.im1.imca_div(&mut dz.b, &z.b, c);
    }
}

/// Arity-3 system: three explicit terms (slot k reads slots `0..k`),
/// three implicit terms dispatched slot-wise.
pub struct System3<Ex0, Ex1, Ex2, Im0, Im1, Im2> {
    /// Slot-0 explicit term.
    pub ex0: Ex0,
    /// Slot-1 explicit term.
    pub ex1: Ex1,
    /// Slot-2 explicit term.
    pub ex2: Ex2,
    /// Slot-0 implicit term.
    pub im0: Im0,
    /// Slot-1 implicit term.
    pub im1: Im1,
    /// Slot-2 implicit term.
    pub im2: Im2,
}

impl<Ex0, Ex1, Ex2, Im0, Im1, Im2> System3<Ex0, Ex1, Ex2, Im0, Im1, Im2> {
    /// Assemble a three-slot system.
    #[allow(clippy::too_many_arguments)]
    pub fn new(ex0: Ex0, ex1: Ex1, ex2: Ex2, im0: Im0, im1: Im1, im2: Im2) -> Self {
        Self {
            ex0,
            ex1,
            ex2,
            im0,
            im1,
            im2,
        }
    }
}

impl<X0, X1, X2, Ex0, Ex1, Ex2, Im0, Im1, Im2> SystemOps<crate::coupled::Triplet<X0, X1, X2>>
    for System3<Ex0, Ex1, Ex2, Im0, Im1, Im2>
where
    Ex0: Explicit0<X0>,
    Ex1: Explicit1<X0, X1>,
    Ex2: Explicit2<X0, X1, X2>,
    Im0: Implicit<X0>,
    Im1: Implicit<X1>,
    Im2: Implicit<X2>,
{
    fn eval(
        &self,
        t: f64,
        x: &crate::coupled::Triplet<X0, X1, X2>,
        dxdt: &mut crate::coupled::Triplet<X0, X1, X2>,
    ) {
        self.ex0.eval(t, &x.a, &mut dxdt.a);
        self.ex1.eval(t, &x.a, &dxdt.a, &x.b, &mut dxdt.b);
        self.ex2.eval(t, &x.a, &dxdt.a, &x.b, &dxdt.b, &x.c, &mut dxdt.c);
    }
    fn mul(&self, dz: &mut crate::coupled::Triplet<X0, X1, X2>, z: &crate::coupled::Triplet<X0, X1, X2>) {
        self.im0.mul(&mut dz.a, &z.a);
        self.im1.mul(&mut dz.b, &z.b);
        self.im2.mul(&mut dz.c, &z.c);
    }
    fn imca_mul(
        &self,
        dz: &mut crate::coupled::Triplet<X0, X1, X2>,
        z: &crate::coupled::Triplet<X0, X1, X2>,
        c: f64,
    ) {
        self.im0.imca_mul(&mut dz.a, &z.a, c);
        self.im1.imca_mul(&mut dz.b, &z.b, c);
        self.im2.imca_mul(&mut dz.c, &z.c, c);
    }
    fn imca_div(
        &self,
        dz: &mut crate::coupled::Triplet<X0, X1, X2>,
        z: &crate::coupled::Triplet<X0, X1, X2>,
        c: f64,
    ) {
        self.im0.imca_div(&mut dz.a, &z.a, c);
        self.im1.imca_div(&mut dz.b, &z.b, c);
        self.im2.imca_div(&mut dz.c, &z.c, c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lambda(f64);
    impl Explicit0<f64> for Lambda {
        fn eval(&self, _t: f64, x: &f64, dxdt: &mut f64) {
            *dxdt = self.0 * x;
        }
    }

    #[test]
    fn noop_implicit_matches_contract() {
        let im = NoOpImplicit;
        let mut out = 1.0;
        im.mul(&mut out, &3.0);
        assert_eq!(out, 0.0);
        im.imca_mul(&mut out, &3.0, 0.5);
        assert_eq!(out, 3.0);
        im.imca_div(&mut out, &3.0, 0.5);
        assert_eq!(out, 3.0);
    }

    #[test]
    fn system1_dispatches_explicit_term() {
        let sys = System1::new(Lambda(2.0), NoOpImplicit);
        let mut dxdt = 0.0;
        sys.eval(0.0, &5.0, &mut dxdt);
        assert_eq!(dxdt, 10.0);
    }

    #[test]
    fn array_state_supports_required_arithmetic() {
        let a = Array1::from(vec![1.0, 2.0]);
        let b = Array1::from(vec![3.0, 4.0]);
        let c = (a.clone() + b.clone()) * 2.0;
        assert_eq!(c, Array1::from(vec![8.0, 12.0]));
        assert_eq!(a.zero_like(), Array1::from(vec![0.0, 0.0]));
    }
}
