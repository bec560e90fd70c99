//! Benchmark profiles for the portsim simulation kernel.
//!
//! - [`adder_chain`]: `n` scalar adders wired output to input, so every
//!   step propagates through the whole chain
//! - [`oscillator_bank`]: `n` independent Van der Pol oscillators with
//!   their states recorded
//! - [`vector_chain`]: `n` 3-vector adders wired output to input

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use portsim_core::SystemId;
use portsim_engine::{SimError, Simulation};
use portsim_systems::{Adder, Adder3D, VanDerPol};

fn port_error(system: SystemId) -> impl Fn(portsim_core::PortError) -> SimError {
    move |source| SimError::Port {
        system: system.to_string(),
        source,
    }
}

/// A chain of `n` adders, each feeding `input1` of the next.
///
/// The head has `input2 = 1`, so after one step every output is `1`.
/// Systems are registered tail first, so the scheduler has to reorder
/// all of them.
pub fn adder_chain(n: usize) -> Result<Simulation, SimError> {
    let mut sim = Simulation::new();
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let adder = Adder::new().map_err(port_error(SystemId(i as u32)))?;
        ids.push(sim.add_system(adder)?);
    }
    ids.reverse();
    if let Some(&head) = ids.first() {
        sim.ports_mut(head)?
            .inputs_mut()
            .set("input2", 1.0)
            .map_err(port_error(head))?;
    }
    for pair in ids.windows(2) {
        sim.connections(pair[0])
            .add_connection("output1", pair[1], "input1")?;
    }
    Ok(sim)
}

/// `n` 3-vector adders chained like [`adder_chain`], in registration order.
pub fn vector_chain(n: usize) -> Result<Simulation, SimError> {
    let mut sim = Simulation::new();
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let adder = Adder3D::new().map_err(port_error(SystemId(i as u32)))?;
        ids.push(sim.add_system(adder)?);
    }
    if let Some(&head) = ids.first() {
        sim.ports_mut(head)?
            .inputs_mut()
            .set("input2", [1.0, 2.0, 3.0])
            .map_err(port_error(head))?;
    }
    for pair in ids.windows(2) {
        sim.connections(pair[0])
            .add_connection("output1", pair[1], "input1")?;
    }
    Ok(sim)
}

/// `n` unconnected Van der Pol oscillators, each recording `x` and `y`.
pub fn oscillator_bank(n: usize) -> Result<Simulation, SimError> {
    let mut sim = Simulation::new();
    for i in 0..n {
        let vdp = VanDerPol::new().map_err(port_error(SystemId(i as u32)))?;
        let id = sim.add_system(vdp)?;
        sim.store(id, "x")?;
        sim.store(id, "y")?;
    }
    Ok(sim)
}
