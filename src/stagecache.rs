//! Stage cache: records the per-stage state a forward [`crate::method`]
//! step visits, so a later adjoint sweep can replay them in reverse.
//!
//! Modeled as an explicit `Idle`/`Accumulating` state machine: `push`
//! outside `Accumulating` is a programming error (panics).

#![forbid(unsafe_code)]

/// Errors raised by [`StageCache`] setup.
#[derive(Debug, thiserror::Error)]
pub enum StageCacheError {
    /// `expected_stages` was zero; a cache must record at least one
    /// stage per step.
    #[error("stage cache requires at least one expected stage, got 0")]
    ZeroStages,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Accumulating,
}

/// The full record of one forward step: its `(t, dt)` and the stage
/// values a [`crate::method`] pushed while advancing across it.
#[derive(Clone, Debug)]
pub struct StageRecord<X> {
    /// The time at the start of the step.
    pub t: f64,
    /// The step size used.
    pub dt: f64,
    /// Stage values, in the order they were pushed forward.
    pub stages: Vec<X>,
}

impl<X> StageRecord<X> {
    /// Iterate stages in reverse (the order an adjoint sweep consumes
    /// them).
    pub fn iter_rev(&self) -> std::iter::Rev<std::slice::Iter<'_, X>> {
        self.stages.iter().rev()
    }

    /// Number of recorded stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// `true` if no stages were recorded (never true for a record
    /// produced by a completed [`StageCache`] accumulation).
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<X> std::ops::Index<usize> for StageRecord<X> {
    type Output = X;
    fn index(&self, idx: usize) -> &X {
        &self.stages[idx]
    }
}

/// A single-step-at-a-time stage recorder. A [`crate::method::StepForward`]
/// implementation calls `setup` once per step, then `push` once per stage
/// it visits, then `close` to yield the finished [`StageRecord`].
pub struct StageCache<X> {
    phase: Phase,
    t: f64,
    dt: f64,
    expected: usize,
    stages: Vec<X>,
}

impl<X> StageCache<X> {
    /// An idle cache with no step in progress.
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            t: 0.0,
            dt: 0.0,
            expected: 0,
            stages: Vec::new(),
        }
    }

    /// Begin accumulating a new step's stages (Result form).
    pub fn setup_r(&mut self, t: f64, dt: f64, expected_stages: usize) -> Result<(), StageCacheError> {
        if expected_stages == 0 {
            return Err(StageCacheError::ZeroStages);
        }
        self.phase = Phase::Accumulating;
        self.t = t;
        self.dt = dt;
        self.expected = expected_stages;
        self.stages = Vec::with_capacity(expected_stages);
        Ok(())
    }

    /// Back-compat wrapper (panics on malformed input).
    pub fn setup(&mut self, t: f64, dt: f64, expected_stages: usize) {
        self.setup_r(t, dt, expected_stages).expect("invalid stage cache setup")
    }

    /// Record the next stage. Panics if called outside `Accumulating` or
    /// once the expected stage count has already been reached — both are
    /// programming errors in the calling [`crate::method`].
    pub fn push(&mut self, x: X) {
        assert_eq!(
            self.phase,
            Phase::Accumulating,
            "StageCache::push called outside an active step"
        );
        assert!(
            self.stages.len() < self.expected,
            "StageCache::push exceeded the {} stages declared at setup",
            self.expected
        );
        self.stages.push(x);
    }

    /// Finish accumulating and return the completed record, resetting the
    /// cache to `Idle`. Panics if called outside `Accumulating`.
    pub fn close(&mut self) -> StageRecord<X> {
        assert_eq!(
            self.phase,
            Phase::Accumulating,
            "StageCache::close called outside an active step"
        );
        self.phase = Phase::Idle;
        StageRecord {
            t: self.t,
            dt: self.dt,
            stages: std::mem::take(&mut self.stages),
        }
    }
}

impl<X> Default for StageCache<X> {
    fn default() -> Self {
        Self::new()
    }
}
