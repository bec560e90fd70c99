//! Sampled PID controller.
//!
//! The controller is a discrete system: it is evaluated on the first step
//! and then once every `stepsize` seconds, holding its output in between.
//! The integral part is a state, so it keeps integrating the last sampled
//! error between evaluations.

use log::debug;
use portsim_core::{PortDecl, PortError, PortRef, PortRegistry, SystemError};
use portsim_system::{Evaluation, StepContext, System};

/// PID controller with a limited proportional part and anti-windup.
///
/// On each evaluation, with `e = refsig - insig`:
///
/// ```text
/// P      = clamp(p * e, -plim, plim)
/// dIPart = i * e, or 0 while |iPart| >= antiwindup and e pushes it further
/// outsig = P + iPart - d * dsig
/// ```
///
/// `dsig` is the measured rate of the controlled signal, so the derivative
/// action acts on the measurement and not on the error.
#[derive(Debug)]
pub struct DiscretePid {
    ports: PortRegistry,
    stepsize: PortRef,
    p: PortRef,
    plim: PortRef,
    i: PortRef,
    d: PortRef,
    antiwindup: PortRef,
    insig: PortRef,
    refsig: PortRef,
    dsig: PortRef,
    i_part: PortRef,
    di_part: PortRef,
    outsig: PortRef,
}

impl DiscretePid {
    /// A pure unit-gain P controller sampled every 0.1 s.
    pub fn new() -> Result<Self, PortError> {
        let mut ports = PortRegistry::new();
        let par = |name: &str, default: f64, doc: &str| {
            PortDecl::scalar(name).with_default(default).with_doc(doc)
        };
        let stepsize = ports.add_parameter(par("stepsize", 0.1, "Sample period"))?;
        let p = ports.add_parameter(par("p", 1.0, "Proportional gain"))?;
        let plim = ports.add_parameter(par("plim", 1.0e6, "Limit of the proportional part"))?;
        let i = ports.add_parameter(par("i", 0.0, "Integral gain"))?;
        let d = ports.add_parameter(par("d", 0.0, "Derivative gain"))?;
        let antiwindup = ports.add_parameter(par("antiwindup", 1.0e6, "Limit of the integral part"))?;

        let insig = ports.add_input(PortDecl::scalar("insig").with_doc("Measured signal"))?;
        let refsig = ports.add_input(PortDecl::scalar("refsig").with_doc("Reference signal"))?;
        let dsig = ports.add_input(PortDecl::scalar("dsig").with_doc("Rate of the measured signal"))?;

        let (i_part, di_part) = ports.add_state(
            PortDecl::scalar("iPart").with_doc("Integral part"),
            "dIPart",
        )?;
        let outsig = ports.add_output(PortDecl::scalar("outsig").with_doc("Controller output"))?;

        Ok(Self {
            ports,
            stepsize,
            p,
            plim,
            i,
            d,
            antiwindup,
            insig,
            refsig,
            dsig,
            i_part,
            di_part,
            outsig,
        })
    }
}

impl System for DiscretePid {
    fn name(&self) -> &str {
        "discrete_pid"
    }

    fn ports(&self) -> &PortRegistry {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut PortRegistry {
        &mut self.ports
    }

    fn evaluation(&self) -> Evaluation {
        Evaluation::Discrete
    }

    fn pre_sim(&mut self, ctx: &StepContext) -> Result<(), SystemError> {
        let stepsize = self.ports.scalar_at(self.stepsize)?;
        if !(stepsize.is_finite() && stepsize > 0.0) {
            return Err(SystemError::ExecutionFailed {
                reason: format!("stepsize must be positive, got {stepsize}"),
            });
        }
        if stepsize < ctx.step_size() {
            debug!(
                "PID sample period {stepsize} is shorter than the simulation step {}",
                ctx.step_size()
            );
        }
        Ok(())
    }

    fn do_step(&mut self, ctx: &mut StepContext) -> Result<(), SystemError> {
        let ports = &mut self.ports;
        let p = ports.scalar_at(self.p)?;
        let plim = ports.scalar_at(self.plim)?;
        let i = ports.scalar_at(self.i)?;
        let d = ports.scalar_at(self.d)?;
        let antiwindup = ports.scalar_at(self.antiwindup)?;

        let error = ports.scalar_at(self.refsig)? - ports.scalar_at(self.insig)?;
        let i_part = ports.scalar_at(self.i_part)?;
        let dsig = ports.scalar_at(self.dsig)?;

        let p_part = (p * error).clamp(-plim, plim);
        let di = i * error;
        let winding_up = (i_part >= antiwindup && di > 0.0) || (i_part <= -antiwindup && di < 0.0);
        ports.set_scalar_at(self.di_part, if winding_up { 0.0 } else { di })?;
        ports.set_scalar_at(self.outsig, p_part + i_part - d * dsig)?;

        let stepsize = ports.scalar_at(self.stepsize)?;
        ctx.set_next_update(ctx.time() + stepsize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portsim_core::StepId;
    use proptest::prelude::*;

    fn ctx(t: f64) -> StepContext {
        StepContext::new(t, 0.01, StepId(0))
    }

    fn pid() -> DiscretePid {
        DiscretePid::new().unwrap()
    }

    #[test]
    fn is_discrete_and_schedules_next_sample() {
        let mut c = pid();
        assert_eq!(c.evaluation(), Evaluation::Discrete);
        let mut ctx = ctx(0.3);
        c.do_step(&mut ctx).unwrap();
        assert!((ctx.next_update().unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn proportional_part_is_limited() {
        let mut c = pid();
        let pars = c.ports_mut().parameters_mut();
        pars.set("p", 10.0).unwrap();
        pars.set("plim", 2.0).unwrap();
        c.ports_mut().inputs_mut().set("refsig", 1.0).unwrap();
        c.do_step(&mut ctx(0.0)).unwrap();
        assert_eq!(c.ports().outputs().scalar("outsig").unwrap(), 2.0);
    }

    #[test]
    fn integral_and_derivative_parts() {
        let mut c = pid();
        let pars = c.ports_mut().parameters_mut();
        pars.set("p", 0.0).unwrap();
        pars.set("i", 0.5).unwrap();
        pars.set("d", 2.0).unwrap();
        c.ports_mut().states_mut().set("iPart", 0.25).unwrap();
        let inputs = c.ports_mut().inputs_mut();
        inputs.set("refsig", 3.0).unwrap();
        inputs.set("insig", 1.0).unwrap();
        inputs.set("dsig", 0.125).unwrap();
        c.do_step(&mut ctx(0.0)).unwrap();

        assert_eq!(c.ports().derivatives().scalar("dIPart").unwrap(), 1.0);
        assert_eq!(c.ports().outputs().scalar("outsig").unwrap(), 0.0);
    }

    #[test]
    fn antiwindup_stops_integration_outward_only() {
        let mut c = pid();
        let pars = c.ports_mut().parameters_mut();
        pars.set("i", 1.0).unwrap();
        pars.set("antiwindup", 1.0).unwrap();
        c.ports_mut().states_mut().set("iPart", 1.0).unwrap();

        c.ports_mut().inputs_mut().set("refsig", 1.0).unwrap();
        c.do_step(&mut ctx(0.0)).unwrap();
        assert_eq!(c.ports().derivatives().scalar("dIPart").unwrap(), 0.0);

        c.ports_mut().inputs_mut().set("refsig", -1.0).unwrap();
        c.do_step(&mut ctx(0.1)).unwrap();
        assert_eq!(c.ports().derivatives().scalar("dIPart").unwrap(), -1.0);
    }

    #[test]
    fn invalid_stepsize_fails_pre_sim() {
        let mut c = pid();
        c.ports_mut().parameters_mut().set("stepsize", 0.0).unwrap();
        assert!(c.pre_sim(&ctx(0.0)).is_err());
    }

    proptest! {
        #[test]
        fn output_stays_within_limits_without_integral(
            p in -100.0f64..100.0,
            plim in 0.0f64..10.0,
            refsig in -1e3f64..1e3,
            insig in -1e3f64..1e3,
        ) {
            let mut c = pid();
            let pars = c.ports_mut().parameters_mut();
            pars.set("p", p).unwrap();
            pars.set("plim", plim).unwrap();
            let inputs = c.ports_mut().inputs_mut();
            inputs.set("refsig", refsig).unwrap();
            inputs.set("insig", insig).unwrap();
            c.do_step(&mut ctx(0.0)).unwrap();
            let out = c.ports().outputs().scalar("outsig").unwrap();
            prop_assert!(out.abs() <= plim);
        }
    }
}
