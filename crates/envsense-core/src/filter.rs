//! Scalar Kalman filter
//!
//! One-dimensional filter for a quantity assumed constant or slowly varying.
//! There is no process model and no control input: each step only grows the
//! covariance by the process variance `q` and then corrects the estimate
//! toward the new measurement.
//!
//! | Symbol | Meaning                 |
//! |--------|-------------------------|
//! | `q`    | process variance        |
//! | `r`    | measurement variance    |
//! | `x`    | current estimate        |
//! | `p`    | estimate covariance     |
//! | `k`    | gain from the last step |

use crate::config::{
    ConfigError, DEFAULT_INITIAL_ESTIMATE, DEFAULT_MEASUREMENT_VARIANCE, DEFAULT_PROCESS_VARIANCE,
};

/// Persistent state of a scalar Kalman filter.
///
/// `q` and `r` are fixed at construction. `x`, `p` and `k` evolve with every
/// [`step`](Self::step) and are never reset, so the early transient caused by
/// the seed values is part of the filter's output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarKalman {
    q: f32,
    r: f32,
    x: f32,
    p: f32,
    k: f32,
}

impl ScalarKalman {
    /// Create a filter seeded at `initial_estimate` with covariance `r²`.
    ///
    /// `r` must be positive and `q` non-negative. With `r = 0` the first gain
    /// is `0 / 0` and every later estimate is NaN.
    pub fn new(
        process_variance: f32,
        measurement_variance: f32,
        initial_estimate: f32,
    ) -> Result<Self, ConfigError> {
        if !(process_variance.is_finite() && process_variance >= 0.0) {
            return Err(ConfigError::ProcessVariance(process_variance));
        }
        if !(measurement_variance.is_finite() && measurement_variance > 0.0) {
            return Err(ConfigError::MeasurementVariance(measurement_variance));
        }
        if !initial_estimate.is_finite() {
            return Err(ConfigError::InitialEstimate(initial_estimate));
        }

        Ok(Self::seeded(
            process_variance,
            measurement_variance,
            initial_estimate,
        ))
    }

    fn seeded(q: f32, r: f32, x: f32) -> Self {
        let p = r * r;
        let k = p / (p + r);

        Self { q, r, x, p, k }
    }

    /// Run one predict/update step and return the new estimate.
    ///
    /// The correction `x + k * (m - x)` is evaluated in `f64` and stored back
    /// as `f32`; that keeps outputs bit-identical to the firmware this filter
    /// replaced, which normalized samples at double precision.
    pub fn step(&mut self, measurement: f64) -> f32 {
        self.p += self.q;
        self.k = self.p / (self.p + self.r);
        self.x = (self.x as f64 + self.k as f64 * (measurement - self.x as f64)) as f32;
        self.p *= 1.0 - self.k;

        self.x
    }

    pub fn process_variance(&self) -> f32 {
        self.q
    }

    pub fn measurement_variance(&self) -> f32 {
        self.r
    }

    pub fn estimate(&self) -> f32 {
        self.x
    }

    pub fn covariance(&self) -> f32 {
        self.p
    }

    pub fn gain(&self) -> f32 {
        self.k
    }
}

impl Default for ScalarKalman {
    /// The deployed tuning: `q = 0.001`, `r = 0.01`, seeded at `0.1`.
    fn default() -> Self {
        Self::seeded(
            DEFAULT_PROCESS_VARIANCE,
            DEFAULT_MEASUREMENT_VARIANCE,
            DEFAULT_INITIAL_ESTIMATE,
        )
    }
}
