//! Monitor: decimated observation of a running [`crate::flow::Flow`],
//! plus an unconditional final sample.
//!
//! Every `oneevery`-th sub-step is pushed to a [`Storage`] sink, and the
//! final `(t_to, x_to)` is always pushed regardless of decimation phase.

#![forbid(unsafe_code)]

/// Errors raised by [`Monitor`] construction.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// `oneevery == 0`: there is no valid decimation period.
    #[error("monitor decimation period must be >= 1, got 0")]
    BadPeriod,
}

/// A sink a [`Monitor`] delivers `(t, y)` samples to.
pub trait Storage<Y> {
    /// Record one sample.
    fn push(&mut self, t: f64, y: Y);
    /// Sampled times, in push order.
    fn times(&self) -> &[f64];
    /// Sampled values, in push order.
    fn samples(&self) -> &[Y];
}

/// An in-memory [`Storage`] sink.
#[derive(Clone, Debug, Default)]
pub struct RamStorage<Y> {
    times: Vec<f64>,
    samples: Vec<Y>,
}

impl<Y> RamStorage<Y> {
    /// An empty sink.
    pub fn new() -> Self {
        Self {
            times: Vec::new(),
            samples: Vec::new(),
        }
    }
}

impl<Y> Storage<Y> for RamStorage<Y> {
    fn push(&mut self, t: f64, y: Y) {
        self.times.push(t);
        self.samples.push(y);
    }
    fn times(&self) -> &[f64] {
        &self.times
    }
    fn samples(&self) -> &[Y] {
        &self.samples
    }
}

/// Projects an observed state `X` down to the value a [`Storage`] sink
/// actually records. `Identity` is the zero-copy default; a deep-copying
/// transform is useful when `X` is a referential `Coupled` value whose
/// slots alias state owned elsewhere and would otherwise go stale.
pub trait Observe<X, Y> {
    /// Produce the value to store for state `x` at time `t`.
    fn observe(&self, t: f64, x: &X) -> Y;
}

/// Records the observed state unchanged (requires `X: Clone`).
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl<X: Clone> Observe<X, X> for Identity {
    fn observe(&self, _t: f64, x: &X) -> X {
        x.clone()
    }
}

/// A decimated observer: pushes every `oneevery`-th sub-step plus,
/// unconditionally, the final sample of a run.
pub struct Monitor<X, Y, S, F>
where
    S: Storage<Y>,
    F: Observe<X, Y>,
{
    storage: S,
    transform: F,
    oneevery: usize,
    count: usize,
    _marker: std::marker::PhantomData<fn(&X) -> Y>,
}

impl<X, Y, S, F> Monitor<X, Y, S, F>
where
    S: Storage<Y>,
    F: Observe<X, Y>,
{
    /// Build a monitor delivering every `oneevery`-th sample (Result).
    pub fn new_r(storage: S, transform: F, oneevery: usize) -> Result<Self, MonitorError> {
        if oneevery == 0 {
            return Err(MonitorError::BadPeriod);
        }
        Ok(Self {
            storage,
            transform,
            oneevery,
            count: 0,
            _marker: std::marker::PhantomData,
        })
    }

    /// Back-compat wrapper (panics on malformed input).
    pub fn new(storage: S, transform: F, oneevery: usize) -> Self {
        Self::new_r(storage, transform, oneevery).expect("invalid monitor period")
    }

    /// Called once per sub-step by the driving [`crate::flow::Flow`];
    /// delivers a sample only every `oneevery`-th call.
    pub fn push(&mut self, t: f64, x: &X) {
        if self.count % self.oneevery == 0 {
            self.storage.push(t, self.transform.observe(t, x));
        }
        self.count += 1;
    }

    /// Called once, unconditionally, after the final sub-step — ensures
    /// the end of a run is always represented in the recorded trajectory
    /// even when it falls off the decimation phase.
    pub fn push_final(&mut self, t: f64, x: &X) {
        self.storage.push(t, self.transform.observe(t, x));
    }

    /// Sampled times recorded so far.
    pub fn times(&self) -> &[f64] {
        self.storage.times()
    }

    /// Sampled values recorded so far.
    pub fn samples(&self) -> &[Y] {
        self.storage.samples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimation_plus_final_matches_reference_scenario() {
        let mut mon: Monitor<f64, f64, RamStorage<f64>, Identity> =
            Monitor::new(RamStorage::new(), Identity, 5000);
        let dt = 1e-4;
        for k in 0..10_000 {
            let t = k as f64 * dt;
            mon.push(t, &t);
        }
        mon.push_final(1.0, &1.0);
        assert_eq!(mon.times().len(), 3);
        assert!((mon.times()[0] - 0.0).abs() < 1e-12);
        assert!((mon.times()[1] - 0.5).abs() < 1e-9);
        assert!((mon.times()[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_period_is_rejected() {
        assert!(matches!(
            Monitor::<f64, f64, RamStorage<f64>, Identity>::new_r(RamStorage::new(), Identity, 0),
            Err(MonitorError::BadPeriod)
        ));
    }

    #[test]
    fn every_step_delivered_when_undecimated() {
        let mut mon: Monitor<f64, f64, RamStorage<f64>, Identity> =
            Monitor::new(RamStorage::new(), Identity, 1);
        for k in 0..4 {
            mon.push(k as f64, &(k as f64));
        }
        assert_eq!(mon.times().len(), 4);
    }
}
