//! Per-run counters returned by [`simulate`](crate::Simulation::simulate).

/// What one `simulate` call did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunStats {
    /// Steps completed in this run.
    pub steps: u64,
    /// `do_step` calls made in this run.
    pub evaluations: u64,
    /// Evaluations of discrete systems skipped because their next update
    /// was still in the future.
    pub skipped_evaluations: u64,
    /// Simulated time when the run returned.
    pub end_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let s = RunStats::default();
        assert_eq!(s.steps, 0);
        assert_eq!(s.evaluations, 0);
        assert_eq!(s.skipped_evaluations, 0);
        assert_eq!(s.end_time, 0.0);
    }
}
