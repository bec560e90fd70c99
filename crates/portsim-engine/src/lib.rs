//! Simulation engine for portsim block diagrams.
//!
//! [`Simulation`] owns the registered systems, the [`ConnectionGraph`]
//! between their ports, the resolved [`Schedule`], an [`Integrator`], and a
//! [`Recorder`](portsim_record::Recorder). Each call to
//! [`simulate()`](Simulation::simulate) advances the clock in fixed steps:
//!
//! 1. `pre_step` on every system.
//! 2. In schedule order: propagate each system's incoming connections,
//!    then evaluate it.
//! 3. Integrate every state from its derivative.
//! 4. `post_step` on every system.
//! 5. Record stored ports, tagged with the step's start time.
//! 6. Advance the clock.
//!
//! A step either completes or leaves states, clock, and recorded series at
//! the last completed step.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod connection;
pub mod error;
pub mod integrate;
pub mod metrics;
pub mod schedule;
pub mod simulation;

pub use config::{RunConfig, MAX_STEPS};
pub use connection::{Connection, ConnectionGraph, Endpoint};
pub use error::SimError;
pub use integrate::{ForwardEuler, Integrator};
pub use metrics::RunStats;
pub use schedule::Schedule;
pub use simulation::{Connections, Simulation};
