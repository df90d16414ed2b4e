//! Time range: the ordered sequence of `(t, dt)` sub-steps spanning
//! `[t_from, t_to]`, forward or backward.
//!
//! The backward branch is implemented independently of the forward one
//! (sign of `dt_nominal` selects `min`/`max` clamping) rather than
//! copy-pasting the forward predicate.

#![forbid(unsafe_code)]

/// Errors raised when constructing a `TimeRange`.
#[derive(Debug, thiserror::Error)]
pub enum TimeRangeError {
    /// `t_from == t_to`: there is no direction to integrate in.
    #[error("time range endpoints must differ (t_from == t_to == {0})")]
    EqualEndpoints(f64),
    /// `sign(dt_nominal) != sign(t_to - t_from)`.
    #[error("dt_nominal sign ({dt_nominal}) does not match (t_to - t_from) sign ({span})")]
    SignMismatch {
        /// The nominal step supplied.
        dt_nominal: f64,
        /// `t_to - t_from`.
        span: f64,
    },
}

/// An ordered, finite sequence of `(t_k, dt_k)` sub-steps partitioning
/// `[t_from, t_to]` (or `[t_to, t_from]` traversed backward).
#[derive(Clone, Debug)]
pub struct TimeRange {
    t_from: f64,
    t_to: f64,
    dt_nominal: f64,
    len: usize,
}

impl TimeRange {
    /// Construct a time range (Result).
    ///
    /// `sign(dt_nominal)` must match `sign(t_to - t_from)`; `t_from` must
    /// differ from `t_to`.
    pub fn new_r(t_from: f64, t_to: f64, dt_nominal: f64) -> Result<Self, TimeRangeError> {
        let span = t_to - t_from;
        if span == 0.0 {
            return Err(TimeRangeError::EqualEndpoints(t_from));
        }
        if span.signum() != dt_nominal.signum() {
            return Err(TimeRangeError::SignMismatch { dt_nominal, span });
        }
        let len = (span.abs() / dt_nominal.abs()).ceil() as usize;
        Ok(Self {
            t_from,
            t_to,
            dt_nominal,
            len,
        })
    }

    /// Back-compat wrapper (panics on malformed input).
    pub fn new(t_from: f64, t_to: f64, dt_nominal: f64) -> Self {
        Self::new_r(t_from, t_to, dt_nominal).expect("invalid time range")
    }

    /// Number of sub-steps this range produces.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if this range produces no steps (never true for a validly
    /// constructed range, since endpoints must differ).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether this range integrates forward in time.
    #[inline]
    pub fn is_forward(&self) -> bool {
        self.t_to > self.t_from
    }

    /// The range's starting time.
    #[inline]
    pub fn t_from(&self) -> f64 {
        self.t_from
    }

    /// The range's ending time.
    #[inline]
    pub fn t_to(&self) -> f64 {
        self.t_to
    }

    /// Iterate the `(t_k, dt_k)` sub-steps.
    pub fn iter(&self) -> TimeRangeIter<'_> {
        TimeRangeIter {
            range: self,
            k: 0,
            t: self.t_from,
        }
    }
}

impl<'r> IntoIterator for &'r TimeRange {
    type Item = (f64, f64);
    type IntoIter = TimeRangeIter<'r>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`TimeRange`]'s `(t, dt)` sub-steps.
pub struct TimeRangeIter<'r> {
    range: &'r TimeRange,
    k: usize,
    t: f64,
}

impl<'r> Iterator for TimeRangeIter<'r> {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.k >= self.range.len {
            return None;
        }
        let t_k = self.t;
        let t_next = if self.range.is_forward() {
            (t_k + self.range.dt_nominal).min(self.range.t_to)
        } else {
            (t_k + self.range.dt_nominal).max(self.range.t_to)
        };
        let dt_k = t_next - t_k;
        self.t = t_next;
        self.k += 1;
        Some((t_k, dt_k))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.range.len - self.k;
        (remaining, Some(remaining))
    }
}

impl<'r> ExactSizeIterator for TimeRangeIter<'r> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(t_from: f64, t_to: f64, dt: f64) -> Vec<(f64, f64)> {
        TimeRange::new(t_from, t_to, dt).iter().collect()
    }

    #[test]
    fn forward_case_with_remainder() {
        let steps = collect(0.0, 1.0, 0.4);
        assert_eq!(steps.len(), 3);
        let ts: Vec<f64> = steps.iter().map(|(t, _)| *t).collect();
        let dts: Vec<f64> = steps.iter().map(|(_, dt)| *dt).collect();
        for (got, want) in ts.iter().zip([0.0, 0.4, 0.8]) {
            assert!((got - want).abs() < 2e-16);
        }
        for (got, want) in dts.iter().zip([0.4, 0.4, 0.2]) {
            assert!((got - want).abs() < 2e-16);
        }
    }

    #[test]
    fn forward_case_exact_division() {
        let steps = collect(0.0, 1.0, 0.2);
        assert_eq!(steps.len(), 5);
        for (k, (t, dt)) in steps.iter().enumerate() {
            assert!((t - 0.2 * k as f64).abs() < 2e-16);
            assert!((dt - 0.2).abs() < 2e-16);
        }
    }

    #[test]
    fn backward_case_with_remainder() {
        let steps = collect(1.0, 0.0, 0.4);
        assert_eq!(steps.len(), 3);
        let ts: Vec<f64> = steps.iter().map(|(t, _)| *t).collect();
        let dts: Vec<f64> = steps.iter().map(|(_, dt)| *dt).collect();
        for (got, want) in ts.iter().zip([1.0, 0.6, 0.2]) {
            assert!((got - want).abs() < 2e-16);
        }
        for (got, want) in dts.iter().zip([-0.4, -0.4, -0.2]) {
            assert!((got - want).abs() < 2e-16);
        }
    }

    #[test]
    fn backward_case_exact_division() {
        let steps = collect(1.0, 0.0, 0.2);
        assert_eq!(steps.len(), 5);
        for (got, want) in steps.iter().zip([1.0, 0.8, 0.6, 0.4, 0.2]) {
            assert!((got.0 - want).abs() < 2e-16);
            assert!((got.1 - (-0.2)).abs() < 2e-16);
        }
    }

    #[test]
    fn ten_step_forward_case() {
        let steps = collect(0.0, 1.0, 1e-1);
        assert_eq!(steps.len(), 10);
        for (k, (t, dt)) in steps.iter().enumerate() {
            assert!((t - 0.1 * k as f64).abs() < 2e-16);
            assert!((dt - 0.1).abs() < 2e-16);
        }
    }

    #[test]
    fn equal_endpoints_rejected() {
        assert!(matches!(
            TimeRange::new_r(1.0, 1.0, 0.1),
            Err(TimeRangeError::EqualEndpoints(_))
        ));
    }

    #[test]
    fn wrong_sign_rejected() {
        assert!(matches!(
            TimeRange::new_r(0.0, 1.0, -0.1),
            Err(TimeRangeError::SignMismatch { .. })
        ));
    }

    #[test]
    fn totality_sum_equals_span() {
        let rng = TimeRange::new(0.0, 1.0, 0.3);
        let sum: f64 = rng.iter().map(|(_, dt)| dt).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }
}
