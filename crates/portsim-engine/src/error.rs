//! Errors raised while building or running a simulation.

use portsim_core::{PortError, SystemError, SystemId};

/// Errors from graph construction, scheduling, and stepping.
///
/// Every variant names the system, port, or connection involved so the
/// first violated invariant can be traced back to the model.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SimError {
    /// A port operation on a registered system failed.
    #[error("system '{system}': {source}")]
    Port {
        /// Label of the system.
        system: String,
        /// The underlying port failure.
        #[source]
        source: PortError,
    },

    /// A connection's endpoints are unknown, out of range, or incompatible.
    #[error("connection {connection}: {source}")]
    InvalidConnection {
        /// The connection as `source -> destination`.
        connection: String,
        /// Why it was rejected.
        #[source]
        source: PortError,
    },

    /// A destination already has an incoming connection overlapping the
    /// new one.
    #[error("destination {destination} is already driven by {existing}")]
    DuplicateDestination {
        /// The contested destination.
        destination: String,
        /// Source of the connection that is already in place.
        existing: String,
    },

    /// Systems depend on each other's outputs within the same step.
    #[error("cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency {
        /// The systems on the cycle; the first is repeated at the end.
        cycle: Vec<String>,
    },

    /// A structural change was attempted after stepping began.
    #[error("cannot {operation} after the simulation has started")]
    GraphFrozen {
        /// What was attempted.
        operation: &'static str,
    },

    /// `step_size` is not finite and positive, `duration` is negative, or
    /// the run would exceed [`MAX_STEPS`](crate::MAX_STEPS) steps.
    #[error(
        "invalid step: step_size must be finite and positive, duration \
         finite and non-negative, and the step count bounded, got step_size \
         {step_size}, duration {duration}"
    )]
    InvalidStep {
        /// The requested duration.
        duration: f64,
        /// The requested step size.
        step_size: f64,
    },

    /// A system's hook returned an error.
    #[error("system '{system}' failed: {source}")]
    SystemFailed {
        /// Label of the failing system.
        system: String,
        /// The error it returned.
        #[source]
        source: SystemError,
    },

    /// The ID does not belong to this simulation.
    #[error("unknown system {0}")]
    UnknownSystem(SystemId),

    /// A series was requested for a port that was never stored.
    #[error("port '{port}' of system '{system}' is not recorded")]
    NotRecorded {
        /// Label of the system.
        system: String,
        /// The requested port.
        port: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn cycle_is_rendered_as_path() {
        let e = SimError::CyclicDependency {
            cycle: vec!["a#0".into(), "b#1".into(), "a#0".into()],
        };
        assert_eq!(e.to_string(), "cyclic dependency: a#0 -> b#1 -> a#0");
    }

    #[test]
    fn port_errors_are_chained() {
        let e = SimError::InvalidConnection {
            connection: "a#0.y -> b#1.u".into(),
            source: PortError::ShapeMismatch {
                port: "u".into(),
                expected: 3,
                found: 2,
            },
        };
        assert!(e.to_string().contains("a#0.y -> b#1.u"));
        assert!(e.source().is_some());
    }
}
