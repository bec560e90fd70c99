//! portsim: a causal block-diagram simulation kernel.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! portsim sub-crates. For most users, adding `portsim` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use portsim::prelude::*;
//!
//! // dx/dt = -k * x, with x exposed as an output.
//! struct Decay {
//!     ports: PortRegistry,
//!     k: PortRef,
//!     x: PortRef,
//!     dx: PortRef,
//!     y: PortRef,
//! }
//!
//! impl Decay {
//!     fn new() -> Result<Self, PortError> {
//!         let mut ports = PortRegistry::new();
//!         let k = ports.add_parameter(PortDecl::scalar("k").with_default(1.0).with_doc("Rate"))?;
//!         let (x, dx) = ports.add_state(PortDecl::scalar("x").with_default(1.0), "dx")?;
//!         let y = ports.add_output("y")?;
//!         Ok(Self { ports, k, x, dx, y })
//!     }
//! }
//!
//! impl System for Decay {
//!     fn name(&self) -> &str { "decay" }
//!     fn ports(&self) -> &PortRegistry { &self.ports }
//!     fn ports_mut(&mut self) -> &mut PortRegistry { &mut self.ports }
//!     fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
//!         let x = self.ports.scalar_at(self.x)?;
//!         let k = self.ports.scalar_at(self.k)?;
//!         self.ports.set_scalar_at(self.dx, -k * x)?;
//!         self.ports.set_scalar_at(self.y, x)?;
//!         Ok(())
//!     }
//! }
//!
//! let mut sim = Simulation::new();
//! let decay = sim.add_system(Decay::new().unwrap()).unwrap();
//! let sum = sim.add_system(Adder::new().unwrap()).unwrap();
//! sim.connections(decay).add_connection("y", sum, "input1").unwrap();
//! sim.store(decay, "x").unwrap();
//!
//! let stats = sim.simulate(1.0, 0.01).unwrap();
//! assert_eq!(stats.steps, 100);
//!
//! let x = sim.series(decay, "x").unwrap().last().unwrap().values[0];
//! assert!((x - (-1.0f64).exp()).abs() < 1e-2);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `portsim-core` | IDs, port kinds, values, the port registry, port errors |
//! | [`system`] | `portsim-system` | The `System` trait and step context |
//! | [`record`] | `portsim-record` | Result recorder and series |
//! | [`engine`] | `portsim-engine` | Connections, scheduler, integrator, simulation driver |
//! | [`systems`] | `portsim-systems` | Reference systems (adders, oscillators, PID) |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, port model, and IDs (`portsim-core`).
///
/// Contains [`types::PortRegistry`], the shape-tagged [`types::Value`], and
/// [`types::PortError`].
pub use portsim_core as types;

/// The evaluation contract (`portsim-system`).
///
/// The [`system::System`] trait is the main extension point for
/// user-defined models.
pub use portsim_system as system;

/// Time-stamped capture of port values (`portsim-record`).
pub use portsim_record as record;

/// The simulation driver (`portsim-engine`).
///
/// [`engine::Simulation`] owns systems and wiring and runs the stepping loop.
pub use portsim_engine as engine;

/// Reference systems (`portsim-systems`).
pub use portsim_systems as systems;

/// Common imports for typical portsim usage.
///
/// ```rust
/// use portsim::prelude::*;
/// ```
///
/// This imports the port model, the system trait, the simulation driver,
/// and the reference systems.
pub mod prelude {
    // Port model
    pub use portsim_core::{
        Arity, FixedVector, PortDecl, PortKind, PortRef, PortRegistry, StepId, SystemId, Value,
    };

    // Errors
    pub use portsim_core::{PortError, SystemError};
    pub use portsim_engine::SimError;

    // Systems
    pub use portsim_system::{Evaluation, StepContext, System};

    // Engine
    pub use portsim_engine::{Endpoint, ForwardEuler, Integrator, RunConfig, RunStats, Simulation};

    // Recording
    pub use portsim_record::{Sample, Series};

    // Reference systems
    pub use portsim_systems::{
        Adder, Adder3D, DiscretePid, InOutTestSystem, MassSpringDamper, VanDerPol,
    };
}
