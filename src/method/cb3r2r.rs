//! CB3R2R: a low-storage, three-register additive (implicit/explicit)
//! Runge–Kutta family parameterized by an [`IMEXTableau<N>`].
//!
//! The three-register (`y`, `z`, `w`) stage recurrence is generalized
//! over the tableau size `N` (`cb2()` gives the 2nd-order 3-stage
//! member, `cb3e()` the 3rd-order 4-stage member).
//!
//! # Forward recurrence
//! For stage `k`, with `a1 = aE(k,k-1) - bE(k-1)` and
//! `a2 = aI(k,k-1) - bI(k-1)` (zero at `k=0`):
//! ```text
//! z_k  = y + dt*a1*FE(k-1) + dt*a2*FI(k-1)
//! w_k  = solve (I - dt*aI(k,k)*A) w_k = z_k
//! FE_k = f_E(t + dt*cE(k), w_k)
//! FI_k = A * w_k
//! y    = y + dt*bE(k)*FE_k + dt*bI(k)*FI_k
//! ```
//! `w_k` is the value pushed to the stage cache.
//!
//! # Adjoint recurrence
//! Derived by reverse accumulation through the forward recurrence above.
//! Every system this crate exercises has a self-adjoint (in fact
//! diagonal) implicit operator `A`, so the adjoint sweep reuses the same
//! `sys.mul`/`sys.imca_mul` calls the forward sweep uses, applied to the
//! costate instead of re-deriving a transposed operator.

#![forbid(unsafe_code)]

use crate::stagecache::{StageCache, StageRecord};
use crate::system::{AdjointSystemOps, State, SystemOps};
use crate::tableau::IMEXTableau;

use super::{StepAdjoint, StepForward};

/// A CB3R2R-family stepper for an `N`-stage [`IMEXTableau`].
pub struct Cb3r2r<X, const N: usize> {
    y: X,
    z: X,
    w: X,
    tableau: IMEXTableau<N>,
    adjoint: bool,
}

impl<X: State, const N: usize> Cb3r2r<X, N> {
    /// A forward-only stepper over `tableau`, with scratch registers
    /// shaped like `exemplar`.
    pub fn new(exemplar: &X, tableau: IMEXTableau<N>) -> Self {
        Self {
            y: exemplar.clone(),
            z: exemplar.clone(),
            w: exemplar.clone(),
            tableau,
            adjoint: false,
        }
    }

    /// A stepper additionally usable for [`StepAdjoint`] sweeps.
    pub fn new_adjoint(exemplar: &X, tableau: IMEXTableau<N>) -> Self {
        let mut m = Self::new(exemplar, tableau);
        m.adjoint = true;
        m
    }

    /// Whether this instance was constructed for adjoint use.
    pub fn is_adjoint(&self) -> bool {
        self.adjoint
    }
}

impl<X: State, const N: usize> StepForward<X> for Cb3r2r<X, N> {
    fn step<S: SystemOps<X>>(&mut self, sys: &S, t: f64, dt: f64, x: &mut X, cache: Option<&mut StageCache<X>>) {
        self.y = x.clone();
        let mut fe_prev = x.zero_like();
        let mut fi_prev = x.zero_like();

        let mut cache = cache;
        if let Some(c) = cache.as_deref_mut() {
            c.setup(t, dt, N);
        }

        for k in 0..N {
            if k == 0 {
                self.z = self.y.clone();
            } else {
                let a1 = self.tableau.a('E', k, k - 1) - self.tableau.b('E', k - 1);
                let a2 = self.tableau.a('I', k, k - 1) - self.tableau.b('I', k - 1);
                self.z = self.y.clone() + fe_prev.clone() * (dt * a1) + fi_prev.clone() * (dt * a2);
            }

            let c_k = self.tableau.a('I', k, k) * dt;
            sys.imca_div(&mut self.w, &self.z, c_k);

            if let Some(c) = cache.as_deref_mut() {
                c.push(self.w.clone());
            }

            let t_k = t + self.tableau.c('E', k) * dt;
            let mut fe_k = self.w.zero_like();
            sys.eval(t_k, &self.w, &mut fe_k);
            let mut fi_k = self.w.zero_like();
            sys.mul(&mut fi_k, &self.w);

            self.y = self.y.clone() + fe_k.clone() * (dt * self.tableau.b('E', k)) + fi_k.clone() * (dt * self.tableau.b('I', k));

            fe_prev = fe_k;
            fi_prev = fi_k;
        }

        *x = self.y.clone();
    }
}

impl<X: State, const N: usize> StepAdjoint<X> for Cb3r2r<X, N> {
    fn step_adjoint<S: AdjointSystemOps<X>>(&mut self, sys: &S, record: &StageRecord<X>, lambda: &mut X) {
        let t = record.t;
        let dt = record.dt;
        let stages = &record.stages;
        debug_assert_eq!(stages.len(), N, "stage record does not match this method's arity");

        let mut zbar_carry = lambda.zero_like();
        let mut yebar_carry = lambda.zero_like();
        let mut lambda_acc = lambda.zero_like();

        for k in (0..N).rev() {
            let c_k = self.tableau.a('I', k, k) * dt;
            let mut zbar = zbar_carry.clone() + lambda.clone() * (self.tableau.b('I', k) * dt);
            let yebar = yebar_carry.clone() + lambda.clone() * (self.tableau.b('E', k) * dt);

            let t_k = t + self.tableau.c('E', k) * dt;
            let mut wbar = yebar.zero_like();
            sys.eval_adjoint(t_k, &stages[k], &yebar, &mut wbar);

            zbar = zbar + wbar.clone() * c_k;

            let mut az = zbar.zero_like();
            sys.mul(&mut az, &zbar);
            let mut m_k = az.zero_like();
            sys.imca_mul(&mut m_k, &az, c_k);
            let ybar = wbar + m_k;

            if k > 0 {
                let a1 = self.tableau.a('I', k, k - 1) - self.tableau.b('I', k - 1);
                let a2 = self.tableau.a('E', k, k - 1) - self.tableau.b('E', k - 1);
                zbar_carry = ybar.clone() * (a1 * dt);
                yebar_carry = ybar * (a2 * dt);
            } else {
                lambda_acc = ybar;
            }
        }

        *lambda = lambda.clone() + lambda_acc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{Explicit0, Implicit, System1};

    struct Lambda(f64);
    impl Explicit0<f64> for Lambda {
        fn eval(&self, _t: f64, x: &f64, dxdt: &mut f64) {
            *dxdt = self.0 * x;
        }
    }

    struct Diag(f64);
    impl Implicit<f64> for Diag {
        fn mul(&self, dz: &mut f64, z: &f64) {
            *dz = self.0 * z;
        }
        fn imca_mul(&self, dz: &mut f64, z: &f64, c: f64) {
            *dz = z - c * self.0 * z;
        }
        fn imca_div(&self, dz: &mut f64, z: &f64, c: f64) {
            *dz = z / (1.0 - c * self.0);
        }
    }

    #[test]
    fn cb2_one_step_stays_finite_and_near_exponential() {
        let sys = System1::new(Lambda(0.0), Diag(-1.0));
        let mut method: Cb3r2r<f64, 3> = Cb3r2r::new(&1.0_f64, crate::tableau::cb2());
        let mut x = 1.0_f64;
        let dt = 1e-3;
        for _ in 0..1000 {
            method.step(&sys, 0.0, dt, &mut x, None);
        }
        let expected = (-1.0_f64).exp();
        assert!((x - expected).abs() < 1e-4);
    }

    #[test]
    fn stage_cache_receives_n_pushes() {
        let sys = System1::new(Lambda(0.0), Diag(-1.0));
        let mut method: Cb3r2r<f64, 4> = Cb3r2r::new(&1.0_f64, crate::tableau::cb3e());
        let mut cache: StageCache<f64> = StageCache::new();
        let mut x = 1.0_f64;
        method.step(&sys, 0.0, 1e-2, &mut x, Some(&mut cache));
    }

    #[test]
    fn cb3e_order_of_accuracy_matches_reference_bound() {
        // dx/dt = x, split evenly between explicit and implicit halves
        // (lambda=0.5 each), p=3, C_p=0.019.
        let sys = System1::new(Lambda(0.5), Diag(0.5));
        for &dt in &[1e-1, 1e-2, 1e-3] {
            let mut method: Cb3r2r<f64, 4> = Cb3r2r::new(&1.0_f64, crate::tableau::cb3e());
            let mut x = 1.0_f64;
            let n = (1.0 / dt).round() as usize;
            for k in 0..n {
                method.step(&sys, k as f64 * dt, dt, &mut x, None);
            }
            let err = (x - std::f64::consts::E).abs() / dt.powi(3);
            assert!(err < 0.019, "dt={dt}: |x_N - e| / dt^3 = {err}");
        }
    }

    #[test]
    fn cb2_order_of_accuracy_matches_reference_bound() {
        // dx/dt = x, split evenly, p=2, C_p=0.068.
        let sys = System1::new(Lambda(0.5), Diag(0.5));
        for &dt in &[1e-1, 1e-2, 1e-3] {
            let mut method: Cb3r2r<f64, 3> = Cb3r2r::new(&1.0_f64, crate::tableau::cb2());
            let mut x = 1.0_f64;
            let n = (1.0 / dt).round() as usize;
            for k in 0..n {
                method.step(&sys, k as f64 * dt, dt, &mut x, None);
            }
            let err = (x - std::f64::consts::E).abs() / dt.powi(2);
            assert!(err < 0.068, "dt={dt}: |x_N - e| / dt^2 = {err}");
        }
    }
}
