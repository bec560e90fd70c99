//! A system that mirrors its inputs and states onto outputs.
//!
//! Used to observe what arrives through connections: whatever is wired into
//! `input_scalar` shows up on `input_output_scalar` after the next step.

use portsim_core::{PortDecl, PortError, PortRef, PortRegistry, SystemError};
use portsim_system::{StepContext, System};

const DIM: usize = 3;

/// Copies scalar and vector inputs and states to outputs.
///
/// States have zero derivatives, so they keep their initial values
/// (`1.23` and `[4.56; 3]`) unless written from outside.
#[derive(Debug)]
pub struct InOutTestSystem {
    ports: PortRegistry,
    input_scalar: PortRef,
    input_vector: PortRef,
    state_scalar: PortRef,
    state_vector: PortRef,
    input_output_scalar: PortRef,
    input_output_vector: PortRef,
    state_output_scalar: PortRef,
    state_output_vector: PortRef,
}

impl InOutTestSystem {
    /// Declare every port with its initial value.
    pub fn new() -> Result<Self, PortError> {
        let mut ports = PortRegistry::new();
        let input_scalar = ports.add_input("input_scalar")?;
        let input_vector = ports.add_input(PortDecl::vector("input_vector", DIM))?;
        let (state_scalar, _) =
            ports.add_state(PortDecl::scalar("state_scalar").with_default(1.23), "der_scalar")?;
        let (state_vector, _) = ports.add_state(
            PortDecl::vector("state_vector", DIM).with_default([4.56; DIM]),
            "der_vector",
        )?;
        let input_output_scalar = ports.add_output("input_output_scalar")?;
        let input_output_vector = ports.add_output(PortDecl::vector("input_output_vector", DIM))?;
        let state_output_scalar = ports.add_output("state_output_scalar")?;
        let state_output_vector = ports.add_output(PortDecl::vector("state_output_vector", DIM))?;
        Ok(Self {
            ports,
            input_scalar,
            input_vector,
            state_scalar,
            state_vector,
            input_output_scalar,
            input_output_vector,
            state_output_scalar,
            state_output_vector,
        })
    }
}

impl System for InOutTestSystem {
    fn name(&self) -> &str {
        "inout"
    }

    fn ports(&self) -> &PortRegistry {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut PortRegistry {
        &mut self.ports
    }

    fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
        let p = &mut self.ports;
        let u = p.scalar_at(self.input_scalar)?;
        p.set_scalar_at(self.input_output_scalar, u)?;
        let x = p.scalar_at(self.state_scalar)?;
        p.set_scalar_at(self.state_output_scalar, x)?;

        let mut buf = [0.0; DIM];
        buf.copy_from_slice(p.vector_at(self.input_vector)?);
        p.set_vector_at(self.input_output_vector, &buf)?;
        buf.copy_from_slice(p.vector_at(self.state_vector)?);
        p.set_vector_at(self.state_output_vector, &buf)?;
        Ok(())
    }
}
