//! Fixed-step state integration.

use portsim_core::PortRegistry;

/// Advances every state of a system from its paired derivative.
///
/// Called once per system per step, after every system has been evaluated.
/// Implementations must be deterministic and may not fail: a step either
/// integrates all states or none.
pub trait Integrator: Send {
    /// Scheme name for logging.
    fn name(&self) -> &str;

    /// Advance the states in `ports` by one step of `step_size`.
    fn integrate(&mut self, ports: &mut PortRegistry, step_size: f64);
}

/// Explicit Euler: `state += derivative * step_size`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn name(&self) -> &str {
        "forward_euler"
    }

    fn integrate(&mut self, ports: &mut PortRegistry, step_size: f64) {
        for (state, derivative) in ports.state_pairs_mut() {
            for (x, dx) in state.iter_mut().zip(derivative) {
                *x += dx * step_size;
            }
        }
    }
}
