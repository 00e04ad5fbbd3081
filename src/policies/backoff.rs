//! # Backoff policy for process relaunch delays.
//!
//! [`BackoffPolicy`] controls how the delay between automatic relaunches grows
//! within one start episode. It is parameterized by:
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use procvisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy::default();
//!
//! // First relaunch waits the initial delay.
//! assert_eq!(backoff.next(None), Duration::from_secs(1));
//!
//! // Subsequent delays are multiplied by the factor (1s * 1.5 = 1.5s).
//! assert_eq!(backoff.next(Some(Duration::from_secs(1))), Duration::from_millis(1500));
//!
//! // Growth is capped (40s * 1.5 would exceed the 30s cap).
//! assert_eq!(backoff.next(Some(Duration::from_secs(40))), Duration::from_secs(30));
//! ```

use std::time::Duration;

/// Relaunch backoff policy.
///
/// Delays within one episode are non-decreasing for `factor >= 1.0` and never
/// exceed [`BackoffPolicy::max`].
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Initial delay before the first relaunch.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
}

impl Default for BackoffPolicy {
    /// Returns the supervisor's stock policy:
    /// - `first = 1s`;
    /// - `factor = 1.5`;
    /// - `max = 30s`.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(30),
            factor: 1.5,
        }
    }
}

impl BackoffPolicy {
    /// Computes the next delay based on the previous one.
    ///
    /// - If `prev` is `None`, returns `first` clamped to `max`.
    /// - Otherwise multiplies the previous delay by [`BackoffPolicy::factor`]
    ///   and caps the result at [`BackoffPolicy::max`].
    pub fn next(&self, prev: Option<Duration>) -> Duration {
        let unclamped = match prev {
            None => self.first,
            Some(d) => {
                let mul = d.as_secs_f64() * self.factor;
                if !mul.is_finite() {
                    self.max
                } else {
                    d.mul_f64(self.factor)
                }
            }
        };

        if unclamped > self.max {
            self.max
        } else {
            unclamped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_by_factor_until_cap() {
        let b = BackoffPolicy::default();
        let mut prev = None;
        let mut last = Duration::ZERO;
        for _ in 0..32 {
            let d = b.next(prev);
            assert!(d >= last, "delays must be non-decreasing");
            assert!(d <= b.max, "delays must never exceed the cap");
            last = d;
            prev = Some(d);
        }
        assert_eq!(last, b.max);
    }

    #[test]
    fn first_delay_is_clamped() {
        let b = BackoffPolicy {
            first: Duration::from_secs(60),
            max: Duration::from_secs(30),
            factor: 1.5,
        };
        assert_eq!(b.next(None), Duration::from_secs(30));
    }

    #[test]
    fn constant_factor_keeps_delay_flat() {
        let b = BackoffPolicy {
            first: Duration::from_secs(2),
            max: Duration::from_secs(30),
            factor: 1.0,
        };
        let d1 = b.next(None);
        let d2 = b.next(Some(d1));
        assert_eq!(d1, d2);
    }
}
