//! The [`System`] trait and [`Evaluation`] enum.
//!
//! A system is an independently authored block: it declares its ports once,
//! at construction, and computes outputs and derivatives from inputs and
//! states every step. The engine owns systems as `Box<dyn System>`.

use std::any::Any;

use portsim_core::{PortRegistry, SystemError};

use crate::context::StepContext;

/// When the engine evaluates a system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Evaluation {
    /// Evaluated every step.
    #[default]
    Continuous,

    /// Evaluated on the first step, then only once the clock reaches the
    /// time requested through
    /// [`StepContext::set_next_update`](crate::StepContext::set_next_update).
    /// Its states are still integrated every step.
    Discrete,
}

/// A block in the simulation diagram.
///
/// # Contract
///
/// - Ports are declared during construction. The registry is frozen when
///   the system is added to a simulation.
/// - `do_step()` reads inputs, states and parameters, and writes outputs and
///   derivatives. It must not write states; the integrator owns them.
/// - Evaluation must be deterministic: same inputs and states produce the
///   same outputs and derivatives.
///
/// # Object safety
///
/// This trait is object-safe; the engine stores systems as
/// `Vec<Box<dyn System>>`. The `Any` supertrait lets callers recover the
/// concrete type from the engine.
///
/// # Examples
///
/// A system that scales its input:
///
/// ```
/// use portsim_core::{PortDecl, PortRef, PortRegistry, StepId, SystemError};
/// use portsim_system::{StepContext, System};
///
/// struct Gain {
///     ports: PortRegistry,
///     u: PortRef,
///     k: PortRef,
///     y: PortRef,
/// }
///
/// impl Gain {
///     fn new(k: f64) -> Self {
///         let mut ports = PortRegistry::new();
///         let u = ports.add_input("u").unwrap();
///         let k = ports.add_parameter(PortDecl::scalar("k").with_default(k)).unwrap();
///         let y = ports.add_output("y").unwrap();
///         Self { ports, u, k, y }
///     }
/// }
///
/// impl System for Gain {
///     fn name(&self) -> &str { "gain" }
///     fn ports(&self) -> &PortRegistry { &self.ports }
///     fn ports_mut(&mut self) -> &mut PortRegistry { &mut self.ports }
///
///     fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
///         let y = self.ports.scalar_at(self.u)? * self.ports.scalar_at(self.k)?;
///         self.ports.set_scalar_at(self.y, y)?;
///         Ok(())
///     }
/// }
///
/// let mut gain = Gain::new(2.0);
/// gain.ports_mut().inputs_mut().set("u", 1.5).unwrap();
/// gain.do_step(&mut StepContext::new(0.0, 0.1, StepId(0))).unwrap();
/// assert_eq!(gain.ports().outputs().scalar("y").unwrap(), 3.0);
/// ```
pub trait System: Any + Send {
    /// Human-readable name for error reporting and logging.
    fn name(&self) -> &str;

    /// The system's ports.
    fn ports(&self) -> &PortRegistry;

    /// The system's ports, mutably.
    fn ports_mut(&mut self) -> &mut PortRegistry;

    /// How often the engine evaluates this system.
    ///
    /// Default: [`Evaluation::Continuous`].
    fn evaluation(&self) -> Evaluation {
        Evaluation::Continuous
    }

    /// Called once before the first step of the first run.
    fn pre_sim(&mut self, _ctx: &StepContext) -> Result<(), SystemError> {
        Ok(())
    }

    /// Called at the start of every step, before any propagation.
    fn pre_step(&mut self, _ctx: &StepContext) -> Result<(), SystemError> {
        Ok(())
    }

    /// Compute outputs and derivatives for the step at `ctx.time()`.
    ///
    /// Called once per step in schedule order, after the system's incoming
    /// connections have been propagated.
    fn do_step(&mut self, ctx: &mut StepContext) -> Result<(), SystemError>;

    /// Called at the end of every step, after integration.
    fn post_step(&mut self, _ctx: &StepContext) -> Result<(), SystemError> {
        Ok(())
    }
}

impl dyn System {
    /// Downcast to the concrete system type.
    pub fn downcast_ref<T: System>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref()
    }

    /// Downcast to the concrete system type, mutably.
    pub fn downcast_mut<T: System>(&mut self) -> Option<&mut T> {
        let any: &mut dyn Any = self;
        any.downcast_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portsim_core::StepId;

    struct Counter {
        ports: PortRegistry,
        calls: u32,
    }

    impl System for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn ports(&self) -> &PortRegistry {
            &self.ports
        }

        fn ports_mut(&mut self) -> &mut PortRegistry {
            &mut self.ports
        }

        fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
            self.calls += 1;
            Ok(())
        }
    }

    struct Other {
        ports: PortRegistry,
    }

    impl System for Other {
        fn name(&self) -> &str {
            "other"
        }

        fn ports(&self) -> &PortRegistry {
            &self.ports
        }

        fn ports_mut(&mut self) -> &mut PortRegistry {
            &mut self.ports
        }

        fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
            Ok(())
        }
    }

    #[test]
    fn hooks_default_to_ok_and_continuous() {
        let mut c = Counter {
            ports: PortRegistry::new(),
            calls: 0,
        };
        let mut ctx = StepContext::new(0.0, 0.1, StepId(0));
        assert_eq!(c.evaluation(), Evaluation::Continuous);
        assert!(c.pre_sim(&ctx).is_ok());
        assert!(c.pre_step(&ctx).is_ok());
        c.do_step(&mut ctx).unwrap();
        assert!(c.post_step(&ctx).is_ok());
        assert_eq!(c.calls, 1);
    }

    #[test]
    fn downcast_recovers_concrete_type() {
        let mut boxed: Box<dyn System> = Box::new(Counter {
            ports: PortRegistry::new(),
            calls: 7,
        });
        assert_eq!(boxed.downcast_ref::<Counter>().map(|c| c.calls), Some(7));
        assert!(boxed.downcast_ref::<Other>().is_none());
        if let Some(c) = boxed.downcast_mut::<Counter>() {
            c.calls = 8;
        }
        assert_eq!(boxed.downcast_ref::<Counter>().map(|c| c.calls), Some(8));

        let other: Box<dyn System> = Box::new(Other {
            ports: PortRegistry::new(),
        });
        assert_eq!(other.name(), "other");
        assert!(other.downcast_ref::<Other>().is_some());
        assert!(other.downcast_ref::<Counter>().is_none());
    }
}
