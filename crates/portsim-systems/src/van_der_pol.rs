//! The Van der Pol oscillator.

use portsim_core::{PortDecl, PortError, PortRef, PortRegistry, SystemError};
use portsim_system::{StepContext, System};

/// Van der Pol oscillator with coefficients supplied as inputs.
///
/// ```text
/// dx = a * x * (b - y^2) - y
/// dy = x
/// ```
///
/// Listing the inputs shows their defaults and docs:
///
/// ```
/// use portsim_systems::VanDerPol;
/// use portsim_system::System;
///
/// let vdp = VanDerPol::new().unwrap();
/// let listing = vdp.ports().inputs().to_string();
/// assert!(listing.contains("         b       1.0  Scaling coefficient"));
/// ```
#[derive(Debug)]
pub struct VanDerPol {
    ports: PortRegistry,
    a: PortRef,
    b: PortRef,
    x: PortRef,
    y: PortRef,
    dx: PortRef,
    dy: PortRef,
}

impl VanDerPol {
    /// Starts at `x = 1, y = 0` with `a = b = 1`.
    pub fn new() -> Result<Self, PortError> {
        let mut ports = PortRegistry::new();
        let a = ports.add_input(
            PortDecl::scalar("a")
                .with_default(1.0)
                .with_doc("Stiffness coefficient"),
        )?;
        let b = ports.add_input(
            PortDecl::scalar("b")
                .with_default(1.0)
                .with_doc("Scaling coefficient"),
        )?;
        let (x, dx) = ports.add_state(PortDecl::scalar("x").with_default(1.0), "dx")?;
        let (y, dy) = ports.add_state(PortDecl::scalar("y"), "dy")?;
        Ok(Self {
            ports,
            a,
            b,
            x,
            y,
            dx,
            dy,
        })
    }
}

impl System for VanDerPol {
    fn name(&self) -> &str {
        "van_der_pol"
    }

    fn ports(&self) -> &PortRegistry {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut PortRegistry {
        &mut self.ports
    }

    fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
        let a = self.ports.scalar_at(self.a)?;
        let b = self.ports.scalar_at(self.b)?;
        let x = self.ports.scalar_at(self.x)?;
        let y = self.ports.scalar_at(self.y)?;
        self.ports.set_scalar_at(self.dx, a * x * (b - y * y) - y)?;
        self.ports.set_scalar_at(self.dy, x)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portsim_core::StepId;

    #[test]
    fn derivatives_at_rest_point() {
        let mut vdp = VanDerPol::new().unwrap();
        vdp.ports_mut().states_mut().set("x", 0.0).unwrap();
        vdp.do_step(&mut StepContext::new(0.0, 0.1, StepId(0))).unwrap();
        assert_eq!(vdp.ports().derivatives().scalar("dx").unwrap(), 0.0);
        assert_eq!(vdp.ports().derivatives().scalar("dy").unwrap(), 0.0);
    }

    #[test]
    fn derivatives_from_initial_state() {
        let mut vdp = VanDerPol::new().unwrap();
        vdp.ports_mut().states_mut().set("y", 2.0).unwrap();
        vdp.do_step(&mut StepContext::new(0.0, 0.1, StepId(0))).unwrap();
        // 1 * 1 * (1 - 4) - 2
        assert_eq!(vdp.ports().derivatives().scalar("dx").unwrap(), -5.0);
        assert_eq!(vdp.ports().derivatives().scalar("dy").unwrap(), 1.0);
    }

    #[test]
    fn input_listing_includes_docs() {
        let vdp = VanDerPol::new().unwrap();
        let listing = vdp.ports().inputs().to_string();
        assert_eq!(
            listing,
            "         a       1.0  Stiffness coefficient\n         b       1.0  Scaling coefficient\n"
        );
    }
}
