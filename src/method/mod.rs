//! Time-stepping methods: per-step algorithms that advance a state `X`
//! by one `(t, dt)` sub-step, optionally recording or replaying stages.
//!
//! `StepForward`/`StepAdjoint` are generic over the
//! [`crate::system::SystemOps`]/[`crate::system::AdjointSystemOps`]
//! implementor rather than tied to one concrete system, so a single
//! `Rk4<X>`/`Cb3r2r<X, N>` works across every system this crate
//! exercises.

#![forbid(unsafe_code)]

pub mod cb3r2r;
pub mod cnrk2;
pub mod rk4;

pub use cb3r2r::Cb3r2r;
pub use cnrk2::Cnrk2;
pub use rk4::Rk4;

use crate::stagecache::{StageCache, StageRecord};
use crate::system::{AdjointSystemOps, SystemOps};

/// A method that advances `x` forward across one `(t, dt)` sub-step.
///
/// When `cache` is `Some`, the method must call `setup` then push every
/// stage value it visits (in forward order); it leaves the cache in
/// `Accumulating` state on return — the caller (typically
/// [`crate::flow::Flow::run_cached`]) closes it to obtain the finished
/// [`crate::stagecache::StageRecord`].
pub trait StepForward<X> {
    /// Advance `x` in place from `t` to `t + dt`.
    fn step<S: SystemOps<X>>(&mut self, sys: &S, t: f64, dt: f64, x: &mut X, cache: Option<&mut StageCache<X>>);
}

/// A method that consumes a recorded [`StageRecord`] and advances a
/// costate `lambda` backward across the step it was recorded from.
pub trait StepAdjoint<X> {
    /// Advance `lambda` in place using the stages recorded in `record`.
    fn step_adjoint<S: AdjointSystemOps<X>>(&mut self, sys: &S, record: &StageRecord<X>, lambda: &mut X);
}

/// Reports whether a method instance was configured (at construction)
/// for adjoint use — `Rk4::new` vs `Rk4::new_adjoint`, for example.
/// [`crate::flow::Flow`] checks this before running a forward or
/// adjoint sweep, since the choice is a runtime constructor argument
/// rather than a distinct type.
pub trait AdjointTag {
    /// `true` if this instance was built with a `*_adjoint` constructor.
    fn is_adjoint(&self) -> bool;
}

impl<X> AdjointTag for rk4::Rk4<X> {
    fn is_adjoint(&self) -> bool {
        rk4::Rk4::is_adjoint(self)
    }
}

impl<X, const N: usize> AdjointTag for cb3r2r::Cb3r2r<X, N> {
    fn is_adjoint(&self) -> bool {
        cb3r2r::Cb3r2r::is_adjoint(self)
    }
}

impl<X> AdjointTag for cnrk2::Cnrk2<X> {
    fn is_adjoint(&self) -> bool {
        false
    }
}
