//! Classical explicit RK4.
//!
//! Each stage pushes its *input* (not the stage derivative) to the stage
//! cache — the value an adjoint sweep needs to re-evaluate the explicit
//! term's Jacobian.
//!
//! # Adjoint recurrence
//! Derived by reverse-mode accumulation through the forward recurrence.
//! Letting `w` denote the incoming costate and `AdjExp(t, y, mu)` the
//! adjoint explicit term (`J_fE(t, y)^T * mu`):
//! ```text
//! k4bar = w * (dt/6)
//! y3bar = AdjExp(t+dt,   y3, k4bar)
//! k3bar = w*(dt/3) + y3bar*dt
//! y2bar = AdjExp(t+dt/2, y2, k3bar)
//! k2bar = w*(dt/3) + y2bar*(dt/2)
//! y1bar = AdjExp(t+dt/2, y1, k2bar)
//! k1bar = w*(dt/6) + y1bar*(dt/2)
//! y0bar = AdjExp(t,      y0, k1bar)
//! w'    = w + y3bar + y2bar + y1bar + y0bar
//! ```
//! This nested form (each `y_i`'s adjoint contribution folds the one
//! ahead of it in, rather than independently re-weighting `k1..k4`) is
//! required for the forward/adjoint duality identity to hold to machine
//! precision.

#![forbid(unsafe_code)]

use crate::stagecache::{StageCache, StageRecord};
use crate::system::{AdjointSystemOps, Explicit0, State, SystemOps};

use super::{StepAdjoint, StepForward};

/// Classical RK4, generalized over any [`State`] and driven by a
/// [`SystemOps`] implementor.
pub struct Rk4<X> {
    k1: X,
    k2: X,
    k3: X,
    k4: X,
    y: X,
    adjoint: bool,
}

impl<X: State> Rk4<X> {
    /// A forward-only stepper with scratch buffers shaped like `exemplar`.
    pub fn new(exemplar: &X) -> Self {
        Self {
            k1: exemplar.clone(),
            k2: exemplar.clone(),
            k3: exemplar.clone(),
            k4: exemplar.clone(),
            y: exemplar.clone(),
            adjoint: false,
        }
    }

    /// A stepper additionally usable for [`StepAdjoint`] sweeps.
    pub fn new_adjoint(exemplar: &X) -> Self {
        let mut m = Self::new(exemplar);
        m.adjoint = true;
        m
    }

    /// Whether this instance was constructed for adjoint use.
    pub fn is_adjoint(&self) -> bool {
        self.adjoint
    }
}

impl<X: State> StepForward<X> for Rk4<X> {
    fn step<S: SystemOps<X>>(&mut self, sys: &S, t: f64, dt: f64, x: &mut X, cache: Option<&mut StageCache<X>>) {
        let mut cache = cache;
        if let Some(c) = cache.as_deref_mut() {
            c.setup(t, dt, 4);
        }

        self.y = x.clone();
        if let Some(c) = cache.as_deref_mut() {
            c.push(self.y.clone());
        }
        sys.eval(t, &self.y, &mut self.k1);

        self.y = x.clone() + self.k1.clone() * (dt / 2.0);
        if let Some(c) = cache.as_deref_mut() {
            c.push(self.y.clone());
        }
        sys.eval(t + dt / 2.0, &self.y, &mut self.k2);

        self.y = x.clone() + self.k2.clone() * (dt / 2.0);
        if let Some(c) = cache.as_deref_mut() {
            c.push(self.y.clone());
        }
        sys.eval(t + dt / 2.0, &self.y, &mut self.k3);

        self.y = x.clone() + self.k3.clone() * dt;
        if let Some(c) = cache.as_deref_mut() {
            c.push(self.y.clone());
        }
        sys.eval(t + dt, &self.y, &mut self.k4);

        *x = x.clone()
            + (self.k1.clone() + self.k2.clone() * 2.0 + self.k3.clone() * 2.0 + self.k4.clone()) * (dt / 6.0);
    }
}

impl<X: State> StepAdjoint<X> for Rk4<X> {
    fn step_adjoint<S: AdjointSystemOps<X>>(&mut self, sys: &S, record: &StageRecord<X>, lambda: &mut X) {
        debug_assert_eq!(record.len(), 4, "RK4 adjoint requires exactly 4 recorded stages");
        let t = record.t;
        let dt = record.dt;
        let y0 = &record[0];
        let y1 = &record[1];
        let y2 = &record[2];
        let y3 = &record[3];
        let w = lambda.clone();

        let k4bar = w.clone() * (dt / 6.0);
        let mut y3bar = w.zero_like();
        sys.eval_adjoint(t + dt, y3, &k4bar, &mut y3bar);

        let k3bar = w.clone() * (dt / 3.0) + y3bar.clone() * dt;
        let mut y2bar = w.zero_like();
        sys.eval_adjoint(t + dt / 2.0, y2, &k3bar, &mut y2bar);

        let k2bar = w.clone() * (dt / 3.0) + y2bar.clone() * (dt / 2.0);
        let mut y1bar = w.zero_like();
        sys.eval_adjoint(t + dt / 2.0, y1, &k2bar, &mut y1bar);

        let k1bar = w.clone() * (dt / 6.0) + y1bar.clone() * (dt / 2.0);
        let mut y0bar = w.zero_like();
        sys.eval_adjoint(t, y0, &k1bar, &mut y0bar);

        *lambda = w + y3bar + y2bar + y1bar + y0bar;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::System1;

    struct Lambda(f64);
    impl Explicit0<f64> for Lambda {
        fn eval(&self, _t: f64, x: &f64, dxdt: &mut f64) {
            *dxdt = self.0 * x;
        }
    }
    impl AdjointSystemOps<f64> for System1<Lambda, crate::system::NoOpImplicit> {
        fn eval_adjoint(&self, _t: f64, _x_stage: &f64, lambda: &f64, dlambda_dt: &mut f64) {
            *dlambda_dt = self.ex.0 * lambda;
        }
    }

    #[test]
    fn fourth_order_scalar_exponential() {
        let sys = System1::new(Lambda(1.0), crate::system::NoOpImplicit);
        let mut method = Rk4::new(&1.0_f64);
        let mut x = 1.0_f64;
        let dt = 1e-2;
        for k in 0..100 {
            method.step(&sys, k as f64 * dt, dt, &mut x, None);
        }
        assert!((x - std::f64::consts::E).abs() < 1e-8);
    }

    #[test]
    fn forward_adjoint_duality_holds_to_machine_precision() {
        // For the linear scalar system dx/dt = a*x, RK4 applies the same
        // stability-polynomial multiplier R(a*dt) to both the state and
        // (since J_fE^T = a too) the costate, so <x1, w0> == <x0, w1>.
        let a = -2.0;
        let sys = System1::new(Lambda(a), crate::system::NoOpImplicit);
        let dt = 0.01;

        let mut fwd = Rk4::new(&1.0_f64);
        let mut cache: StageCache<f64> = StageCache::new();
        let x0 = 3.0_f64;
        let mut x1 = x0;
        fwd.step(&sys, 0.0, dt, &mut x1, Some(&mut cache));
        let record = {
            let mut tmp: StageCache<f64> = StageCache::new();
            tmp.setup(0.0, dt, 4);
            let mut y = x0;
            tmp.push(y);
            let mut k1 = 0.0;
            sys.eval(0.0, &y, &mut k1);
            y = x0 + k1 * (dt / 2.0);
            tmp.push(y);
            let mut k2 = 0.0;
            sys.eval(dt / 2.0, &y, &mut k2);
            y = x0 + k2 * (dt / 2.0);
            tmp.push(y);
            let mut k3 = 0.0;
            sys.eval(dt / 2.0, &y, &mut k3);
            y = x0 + k3 * dt;
            tmp.push(y);
            tmp.close()
        };

        let w0 = 1.0_f64;
        let mut w1 = w0;
        let mut adj = Rk4::new_adjoint(&1.0_f64);
        adj.step_adjoint(&sys, &record, &mut w1);

        assert!(((x1 * w0) - (x0 * w1)).abs() < 1e-13);
    }

    #[test]
    fn order_of_accuracy_matches_reference_bound() {
        // dx/dt = x, p=4, C_p=0.023.
        let sys = System1::new(Lambda(1.0), crate::system::NoOpImplicit);
        for &dt in &[1e-1, 1e-2, 1e-3] {
            let mut method = Rk4::new(&1.0_f64);
            let mut x = 1.0_f64;
            let n = (1.0 / dt).round() as usize;
            for k in 0..n {
                method.step(&sys, k as f64 * dt, dt, &mut x, None);
            }
            let err = (x - std::f64::consts::E).abs() / dt.powi(4);
            assert!(err < 0.023, "dt={dt}: |x_N - e| / dt^4 = {err}");
        }
    }
}
