//! Execution context passed to systems during a step.

use portsim_core::StepId;

/// Execution context passed to each system's hooks.
///
/// Carries the clock of the step being evaluated. Discrete systems use
/// [`set_next_update`](Self::set_next_update) from `do_step` to ask to be
/// skipped until a later time.
#[derive(Clone, Debug, PartialEq)]
pub struct StepContext {
    time: f64,
    step_size: f64,
    step: StepId,
    next_update: Option<f64>,
}

impl StepContext {
    /// Construct a context for the step starting at `time`.
    ///
    /// Typically called by the engine, not by systems directly.
    pub fn new(time: f64, step_size: f64, step: StepId) -> Self {
        Self {
            time,
            step_size,
            step,
            next_update: None,
        }
    }

    /// Simulated time at the start of this step.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Fixed step size of the current run.
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Number of steps completed before this one, across all runs.
    pub fn step(&self) -> StepId {
        self.step
    }

    /// Request the next evaluation of a discrete system at time `t`.
    ///
    /// Ignored for continuous systems. A request at or before the current
    /// time means "evaluate again next step".
    pub fn set_next_update(&mut self, t: f64) {
        self.next_update = Some(t);
    }

    /// The time requested through [`set_next_update`](Self::set_next_update).
    pub fn next_update(&self) -> Option<f64> {
        self.next_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_clock() {
        let ctx = StepContext::new(0.3, 0.1, StepId(3));
        assert_eq!(ctx.time(), 0.3);
        assert_eq!(ctx.step_size(), 0.1);
        assert_eq!(ctx.step(), StepId(3));
        assert_eq!(ctx.next_update(), None);
    }

    #[test]
    fn next_update_keeps_latest_request() {
        let mut ctx = StepContext::new(0.0, 0.1, StepId(0));
        ctx.set_next_update(0.5);
        ctx.set_next_update(0.4);
        assert_eq!(ctx.next_update(), Some(0.4));
    }
}
