//! Damped harmonic oscillator.

use portsim_core::{PortDecl, PortError, PortRef, PortRegistry, SystemError};
use portsim_system::{StepContext, System};

/// A mass on a spring with viscous damping.
///
/// ```text
/// dx1 = x2
/// dx2 = (f - k * x1 - c * x2) / m
/// ```
///
/// `x1` is the position and `x2` the velocity. The `acceleration` output
/// carries the same quantity as derivative `dx2`, so either can be wired
/// onward.
#[derive(Debug)]
pub struct MassSpringDamper {
    ports: PortRegistry,
    f: PortRef,
    m: PortRef,
    k: PortRef,
    c: PortRef,
    x1: PortRef,
    x2: PortRef,
    dx1: PortRef,
    dx2: PortRef,
    acceleration: PortRef,
}

impl MassSpringDamper {
    /// Released from `x1 = 1` at rest.
    pub fn new() -> Result<Self, PortError> {
        let mut ports = PortRegistry::new();
        let f = ports.add_input(PortDecl::scalar("f").with_doc("External force"))?;
        let m = ports.add_parameter(PortDecl::scalar("m").with_default(100.0).with_doc("Mass"))?;
        let k = ports
            .add_parameter(PortDecl::scalar("k").with_default(50.0).with_doc("Spring constant"))?;
        let c = ports
            .add_parameter(PortDecl::scalar("c").with_default(1.0).with_doc("Damping coefficient"))?;
        let (x1, dx1) =
            ports.add_state(PortDecl::scalar("x1").with_default(1.0).with_doc("Position"), "dx1")?;
        let (x2, dx2) = ports.add_state(PortDecl::scalar("x2").with_doc("Velocity"), "dx2")?;
        let acceleration =
            ports.add_output(PortDecl::scalar("acceleration").with_doc("Acceleration of the mass"))?;
        Ok(Self {
            ports,
            f,
            m,
            k,
            c,
            x1,
            x2,
            dx1,
            dx2,
            acceleration,
        })
    }
}

impl System for MassSpringDamper {
    fn name(&self) -> &str {
        "mass_spring_damper"
    }

    fn ports(&self) -> &PortRegistry {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut PortRegistry {
        &mut self.ports
    }

    fn pre_sim(&mut self, _ctx: &StepContext) -> Result<(), SystemError> {
        let m = self.ports.scalar_at(self.m)?;
        if m.is_finite() && m > 0.0 {
            Ok(())
        } else {
            Err(SystemError::ExecutionFailed {
                reason: format!("mass must be positive, got {m}"),
            })
        }
    }

    fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
        let p = &mut self.ports;
        let (f, m, k, c) = (
            p.scalar_at(self.f)?,
            p.scalar_at(self.m)?,
            p.scalar_at(self.k)?,
            p.scalar_at(self.c)?,
        );
        let x1 = p.scalar_at(self.x1)?;
        let x2 = p.scalar_at(self.x2)?;
        let a = (f - k * x1 - c * x2) / m;

        p.set_scalar_at(self.dx1, x2)?;
        p.set_scalar_at(self.dx2, a)?;
        p.set_scalar_at(self.acceleration, a)?;
        Ok(())
    }
}
