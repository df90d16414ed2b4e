//! Crank–Nicolson / RK2: a forward-only IMEX predictor/corrector stepper.
//!
//! Forward-only: no adjoint sweep is defined for this method.

#![forbid(unsafe_code)]

use crate::stagecache::StageCache;
use crate::system::{State, SystemOps};

use super::StepForward;

/// The Crank–Nicolson/RK2 IMEX stepper: the explicit term is treated with
/// an RK2 (Heun) predictor/corrector while the linear implicit term is
/// solved via the trapezoidal rule.
pub struct Cnrk2<X> {
    k1: X,
    k2: X,
    k3: X,
    k4: X,
    k5: X,
}

impl<X: State> Cnrk2<X> {
    /// A stepper with scratch buffers shaped like `exemplar`.
    pub fn new(exemplar: &X) -> Self {
        Self {
            k1: exemplar.clone(),
            k2: exemplar.clone(),
            k3: exemplar.clone(),
            k4: exemplar.clone(),
            k5: exemplar.clone(),
        }
    }
}

impl<X: State> StepForward<X> for Cnrk2<X> {
    fn step<S: SystemOps<X>>(&mut self, sys: &S, t: f64, dt: f64, x: &mut X, cache: Option<&mut StageCache<X>>) {
        let mut cache = cache;
        if let Some(c) = cache.as_deref_mut() {
            c.setup(t, dt, 2);
        }

        // Predictor: treat A implicitly via the Crank-Nicolson half-step,
        // the explicit term via its value at the current state.
        sys.imca_mul(&mut self.k1, x, -0.5 * dt);
        sys.eval(t, x, &mut self.k2);
        if let Some(c) = cache.as_deref_mut() {
            c.push(x.clone());
        }
        self.k3 = self.k1.clone() + self.k2.clone() * dt;
        sys.imca_div(&mut self.k4, &self.k3, 0.5 * dt);

        // Corrector: trapezoidal average of the explicit slopes at the
        // endpoints, A again solved implicitly.
        sys.eval(t + dt, &self.k4, &mut self.k5);
        if let Some(c) = cache.as_deref_mut() {
            c.push(self.k4.clone());
        }
        self.k3 = self.k1.clone() + (self.k2.clone() + self.k5.clone()) * (0.5 * dt);
        sys.imca_div(x, &self.k3, 0.5 * dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{Explicit0, Implicit, NoOpImplicit, System1};

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
    fn second_order_scalar_exponential_explicit_only() {
        let sys = System1::new(Lambda(1.0), NoOpImplicit);
        let mut method = Cnrk2::new(&1.0_f64);
        let mut x = 1.0_f64;
        let dt = 1e-4;
        for k in 0..10_000 {
            method.step(&sys, k as f64 * dt, dt, &mut x, None);
        }
        assert!((x - std::f64::consts::E).abs() < 1e-6);
    }

    #[test]
    fn treats_nontrivial_implicit_operator_correctly() {
        // dx/dt = A*x with A handled purely implicitly (f_E == 0); the
        // trapezoidal solve alone should reproduce exp(A*t) to O(dt^2).
        let sys = System1::new(Lambda(0.0), Diag(-3.0));
        let mut method = Cnrk2::new(&1.0_f64);
        let mut x = 1.0_f64;
        let dt = 1e-3;
        for k in 0..1000 {
            method.step(&sys, k as f64 * dt, dt, &mut x, None);
        }
        let expected = (-3.0_f64).exp();
        assert!((x - expected).abs() < 1e-5);
    }

    #[test]
    fn stage_cache_records_predictor_base_and_corrector_solve() {
        let sys = System1::new(Lambda(1.0), NoOpImplicit);
        let mut method = Cnrk2::new(&1.0_f64);
        let mut cache: StageCache<f64> = StageCache::new();
        let mut x = 1.0_f64;
        let x0 = x;
        method.step(&sys, 0.0, 1e-2, &mut x, Some(&mut cache));
        let record = cache.close();
        assert_eq!(record.len(), 2);
        assert_eq!(record[0], x0);
    }

    #[test]
    fn order_of_accuracy_matches_reference_bound() {
        // dx/dt = x, split evenly between explicit and implicit halves
        // (lambda=0.5 each), p=2, C_p=0.057.
        let sys = System1::new(Lambda(0.5), Diag(0.5));
        for &dt in &[1e-1, 1e-2, 1e-3] {
            let mut method = Cnrk2::new(&1.0_f64);
            let mut x = 1.0_f64;
            let n = (1.0 / dt).round() as usize;
            for k in 0..n {
                method.step(&sys, k as f64 * dt, dt, &mut x, None);
            }
            let err = (x - std::f64::consts::E).abs() / dt.powi(2);
            assert!(err < 0.057, "dt={dt}: |x_N - e| / dt^2 = {err}");
        }
    }
}
