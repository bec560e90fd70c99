//! Run configuration and validation.

use crate::error::SimError;

/// Relative slack when deciding whether `duration / step_size` is a whole
/// number of steps.
const STEP_COUNT_TOLERANCE: f64 = 1e-9;

/// Upper bound on the number of steps in one run.
pub const MAX_STEPS: f64 = 1.0e12;

/// Duration and step size of one [`simulate`](crate::Simulation::simulate) call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunConfig {
    /// Simulated time to advance, in seconds.
    pub duration: f64,
    /// Fixed integration step, in seconds.
    pub step_size: f64,
}

impl RunConfig {
    /// A run of `duration` seconds in steps of `step_size`.
    pub fn new(duration: f64, step_size: f64) -> Self {
        Self {
            duration,
            step_size,
        }
    }

    /// Check that the step size is finite and positive, the duration
    /// finite and non-negative, and the step count at most [`MAX_STEPS`].
    pub fn validate(&self) -> Result<(), SimError> {
        let step_ok = self.step_size.is_finite() && self.step_size > 0.0;
        let duration_ok = self.duration.is_finite() && self.duration >= 0.0;
        let ratio = self.duration / self.step_size;
        let count_ok = ratio.is_finite() && ratio <= MAX_STEPS;
        if step_ok && duration_ok && count_ok {
            Ok(())
        } else {
            Err(SimError::InvalidStep {
                duration: self.duration,
                step_size: self.step_size,
            })
        }
    }

    /// Number of whole steps that fit in the duration.
    ///
    /// Ratios within rounding distance of an integer count as that integer,
    /// so `RunConfig::new(1.0, 0.1)` runs 10 steps even though
    /// `1.0 / 0.1` is not exactly representable.
    pub fn step_count(&self) -> u64 {
        let ratio = self.duration / self.step_size;
        let nearest = ratio.round();
        let steps = if (ratio - nearest).abs() <= STEP_COUNT_TOLERANCE * nearest.max(1.0) {
            nearest
        } else {
            ratio.floor()
        };
        steps as u64
    }
}
