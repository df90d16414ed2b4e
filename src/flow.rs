//! Flow: the driver that steps a [`crate::method`] across a
//! [`TimeRange`], optionally monitoring or caching as it goes.
//!
//! Four thin public entry points (`run`, `run_monitored`, `run_cached`,
//! `run_adjoint`) each take an `Option<&mut _>` for the monitor/cache
//! rather than a family of marker types — an `Option` parameter is the
//! more direct way to express "this sink is sometimes absent" in Rust.
//! Each sub-step emits a `tracing::trace!` event.

#![forbid(unsafe_code)]

use crate::method::{AdjointTag, StepAdjoint, StepForward};
use crate::monitor::{Monitor, Observe, Storage};
use crate::stagecache::{StageCache, StageRecord};
use crate::system::{AdjointSystemOps, SystemOps};
use crate::timerange::TimeRange;

/// Errors raised by a [`Flow`] run.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// `run`/`run_monitored`/`run_cached` was called with a method
    /// instance constructed via a `*_adjoint` constructor.
    #[error("method was constructed for adjoint use; call run_adjoint instead")]
    NotForward,
    /// `run_adjoint` was called with a method instance constructed via
    /// the plain (forward) constructor.
    #[error("method was not constructed for adjoint use; call Method::new_adjoint first")]
    NotAdjoint,
}

/// A stateless driver: every method takes the system and method to run
/// as arguments, rather than owning them, so one `Flow` value is never
/// tied to a particular system/method pairing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Flow;

impl Flow {
    /// Advance `x` across every sub-step of `range`, with no
    /// observation or caching.
    pub fn run<X, S, M>(sys: &S, method: &mut M, range: &TimeRange, x: &mut X) -> Result<(), FlowError>
    where
        S: SystemOps<X>,
        M: StepForward<X> + AdjointTag,
    {
        if method.is_adjoint() {
            return Err(FlowError::NotForward);
        }
        for (t, dt) in range.iter() {
            tracing::trace!(t, dt, "flow: forward substep");
            method.step(sys, t, dt, x, None);
        }
        Ok(())
    }

    /// Advance `x` across every sub-step of `range`, delivering a
    /// decimated-plus-final trajectory to `monitor`.
    pub fn run_monitored<X, Y, S, M, St, Obs>(
        sys: &S,
        method: &mut M,
        range: &TimeRange,
        x: &mut X,
        monitor: &mut Monitor<X, Y, St, Obs>,
    ) -> Result<(), FlowError>
    where
        S: SystemOps<X>,
        M: StepForward<X> + AdjointTag,
        St: Storage<Y>,
        Obs: Observe<X, Y>,
    {
        if method.is_adjoint() {
            return Err(FlowError::NotForward);
        }
        for (t, dt) in range.iter() {
            monitor.push(t, x);
            tracing::trace!(t, dt, "flow: monitored forward substep");
            method.step(sys, t, dt, x, None);
        }
        monitor.push_final(range.t_to(), x);
        Ok(())
    }

    /// Advance `x` across every sub-step of `range`, recording every
    /// step's [`StageRecord`] for a later [`Flow::run_adjoint`] sweep.
    pub fn run_cached<X, S, M>(
        sys: &S,
        method: &mut M,
        range: &TimeRange,
        x: &mut X,
    ) -> Result<Vec<StageRecord<X>>, FlowError>
    where
        S: SystemOps<X>,
        M: StepForward<X> + AdjointTag,
    {
        if method.is_adjoint() {
            return Err(FlowError::NotForward);
        }
        let mut records = Vec::with_capacity(range.len());
        let mut cache: StageCache<X> = StageCache::new();
        for (t, dt) in range.iter() {
            tracing::trace!(t, dt, "flow: cached forward substep");
            method.step(sys, t, dt, x, Some(&mut cache));
            records.push(cache.close());
        }
        Ok(records)
    }

    /// Replay `records` in reverse, advancing `lambda` backward across
    /// each recorded step.
    pub fn run_adjoint<X, S, M>(
        sys: &S,
        method: &mut M,
        records: &[StageRecord<X>],
        lambda: &mut X,
    ) -> Result<(), FlowError>
    where
        S: AdjointSystemOps<X>,
        M: StepAdjoint<X> + AdjointTag,
    {
        if !method.is_adjoint() {
            return Err(FlowError::NotAdjoint);
        }
        for record in records.iter().rev() {
            tracing::trace!(t = record.t, dt = record.dt, "flow: adjoint substep");
            method.step_adjoint(sys, record, lambda);
        }
        Ok(())
    }
}
