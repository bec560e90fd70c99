//! Reusable system fixtures.
//!
//! - [`ConstantSource`] writes its `value` parameter to output `y`.
//! - [`VectorSource`] does the same for a vector.
//! - [`Gain`] computes `y = k * u`.
//! - [`Passthrough`] copies `u` to `y`; useful for building cycles.
//! - [`Accumulator`] integrates `u` into state `x` and outputs `y = x`.
//! - [`DiscreteCounter`] is a discrete system counting its evaluations.
//! - [`HookProbe`] logs every lifecycle call.
//! - [`FailingSystem`] fails deterministically after N calls of one hook.
//!
//! Constructors panic on declaration errors; these are fixtures for tests.

use portsim_core::{PortDecl, PortError, PortRef, PortRegistry, SystemError};
use portsim_system::{Evaluation, StepContext, System};

fn declared<T>(result: Result<T, PortError>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("fixture port declaration failed: {e}"),
    }
}

macro_rules! impl_ports {
    () => {
        fn ports(&self) -> &PortRegistry {
            &self.ports
        }

        fn ports_mut(&mut self) -> &mut PortRegistry {
            &mut self.ports
        }
    };
}

// ── ConstantSource ─────────────────────────────────────────────────

/// Writes parameter `value` to output `y` every step.
pub struct ConstantSource {
    ports: PortRegistry,
    value: PortRef,
    y: PortRef,
}

impl ConstantSource {
    pub fn new(value: f64) -> Self {
        let mut ports = PortRegistry::new();
        let value = declared(
            ports.add_parameter(PortDecl::scalar("value").with_default(value).with_doc("Emitted value")),
        );
        let y = declared(ports.add_output(PortDecl::scalar("y").with_doc("Constant output")));
        Self { ports, value, y }
    }
}

impl System for ConstantSource {
    fn name(&self) -> &str {
        "constant"
    }

    impl_ports!();

    fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
        let v = self.ports.scalar_at(self.value)?;
        self.ports.set_scalar_at(self.y, v)?;
        Ok(())
    }
}

// ── VectorSource ───────────────────────────────────────────────────

/// Writes vector parameter `values` to vector output `y` every step.
pub struct VectorSource {
    ports: PortRegistry,
    values: PortRef,
    y: PortRef,
}

impl VectorSource {
    pub fn new(values: &[f64]) -> Self {
        let mut ports = PortRegistry::new();
        let n = values.len();
        let values = declared(
            ports.add_parameter(PortDecl::vector("values", n).with_default(values)),
        );
        let y = declared(ports.add_output(PortDecl::vector("y", n)));
        Self { ports, values, y }
    }
}

impl System for VectorSource {
    fn name(&self) -> &str {
        "vector_source"
    }

    impl_ports!();

    fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
        let v = self.ports.vector_at(self.values)?.to_vec();
        self.ports.set_vector_at(self.y, &v)?;
        Ok(())
    }
}

// ── Gain ───────────────────────────────────────────────────────────

/// `y = k * u`.
pub struct Gain {
    ports: PortRegistry,
    u: PortRef,
    k: PortRef,
    y: PortRef,
}

impl Gain {
    pub fn new(k: f64) -> Self {
        let mut ports = PortRegistry::new();
        let u = declared(ports.add_input("u"));
        let k = declared(ports.add_parameter(PortDecl::scalar("k").with_default(k).with_doc("Gain")));
        let y = declared(ports.add_output("y"));
        Self { ports, u, k, y }
    }
}

impl System for Gain {
    fn name(&self) -> &str {
        "gain"
    }

    impl_ports!();

    fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
        let y = self.ports.scalar_at(self.k)? * self.ports.scalar_at(self.u)?;
        self.ports.set_scalar_at(self.y, y)?;
        Ok(())
    }
}

// ── Passthrough ────────────────────────────────────────────────────

/// Copies input `u` to output `y`.
pub struct Passthrough {
    name: String,
    ports: PortRegistry,
    u: PortRef,
    y: PortRef,
}

impl Passthrough {
    pub fn new() -> Self {
        Self::named("passthrough")
    }

    pub fn named(name: impl Into<String>) -> Self {
        let mut ports = PortRegistry::new();
        let u = declared(ports.add_input("u"));
        let y = declared(ports.add_output("y"));
        Self {
            name: name.into(),
            ports,
            u,
            y,
        }
    }
}

impl Default for Passthrough {
    fn default() -> Self {
        Self::new()
    }
}

impl System for Passthrough {
    fn name(&self) -> &str {
        &self.name
    }

    impl_ports!();

    fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
        let u = self.ports.scalar_at(self.u)?;
        self.ports.set_scalar_at(self.y, u)?;
        Ok(())
    }
}

// ── Accumulator ────────────────────────────────────────────────────

/// Integrates `u` into state `x` (`dx = u`) and outputs `y = x`.
pub struct Accumulator {
    ports: PortRegistry,
    u: PortRef,
    x: PortRef,
    dx: PortRef,
    y: PortRef,
}

impl Accumulator {
    pub fn new() -> Self {
        let mut ports = PortRegistry::new();
        let u = declared(ports.add_input("u"));
        let (x, dx) = declared(ports.add_state(PortDecl::scalar("x").with_doc("Integral of u"), "dx"));
        let y = declared(ports.add_output("y"));
        Self { ports, u, x, dx, y }
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl System for Accumulator {
    fn name(&self) -> &str {
        "accumulator"
    }

    impl_ports!();

    fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
        let u = self.ports.scalar_at(self.u)?;
        let x = self.ports.scalar_at(self.x)?;
        self.ports.set_scalar_at(self.dx, u)?;
        self.ports.set_scalar_at(self.y, x)?;
        Ok(())
    }
}

// ── DiscreteCounter ────────────────────────────────────────────────

/// Discrete system that increments output `count` each time it is
/// evaluated and then asks to wait `period` seconds.
pub struct DiscreteCounter {
    ports: PortRegistry,
    period: PortRef,
    count: PortRef,
}

impl DiscreteCounter {
    pub fn new(period: f64) -> Self {
        let mut ports = PortRegistry::new();
        let period = declared(ports.add_parameter(PortDecl::scalar("period").with_default(period)));
        let count = declared(ports.add_output("count"));
        Self {
            ports,
            period,
            count,
        }
    }
}

impl System for DiscreteCounter {
    fn name(&self) -> &str {
        "discrete_counter"
    }

    impl_ports!();

    fn evaluation(&self) -> Evaluation {
        Evaluation::Discrete
    }

    fn do_step(&mut self, ctx: &mut StepContext) -> Result<(), SystemError> {
        let n = self.ports.scalar_at(self.count)?;
        self.ports.set_scalar_at(self.count, n + 1.0)?;
        let period = self.ports.scalar_at(self.period)?;
        ctx.set_next_update(ctx.time() + period);
        Ok(())
    }
}

// ── HookProbe ──────────────────────────────────────────────────────

/// Records `(hook, time)` for every lifecycle call.
#[derive(Default)]
pub struct HookProbe {
    ports: PortRegistry,
    pub events: Vec<(&'static str, f64)>,
}

impl HookProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `hook` was called.
    pub fn count(&self, hook: &str) -> usize {
        self.events.iter().filter(|(h, _)| *h == hook).count()
    }
}

impl System for HookProbe {
    fn name(&self) -> &str {
        "probe"
    }

    impl_ports!();

    fn pre_sim(&mut self, ctx: &StepContext) -> Result<(), SystemError> {
        self.events.push(("pre_sim", ctx.time()));
        Ok(())
    }

    fn pre_step(&mut self, ctx: &StepContext) -> Result<(), SystemError> {
        self.events.push(("pre_step", ctx.time()));
        Ok(())
    }

    fn do_step(&mut self, ctx: &mut StepContext) -> Result<(), SystemError> {
        self.events.push(("do_step", ctx.time()));
        Ok(())
    }

    fn post_step(&mut self, ctx: &StepContext) -> Result<(), SystemError> {
        self.events.push(("post_step", ctx.time()));
        Ok(())
    }
}

// ── FailingSystem ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FailingHook {
    DoStep,
    PostStep,
}

/// Fails deterministically after a configurable number of successful
/// calls of one hook.
pub struct FailingSystem {
    ports: PortRegistry,
    hook: FailingHook,
    succeed_count: usize,
    calls: usize,
}

impl FailingSystem {
    /// Succeeds in `do_step` `succeed_count` times, then fails.
    pub fn do_step_after(succeed_count: usize) -> Self {
        Self::new(FailingHook::DoStep, succeed_count)
    }

    /// Succeeds in `post_step` `succeed_count` times, then fails.
    pub fn post_step_after(succeed_count: usize) -> Self {
        Self::new(FailingHook::PostStep, succeed_count)
    }

    /// Succeed `more` further calls from now before failing again.
    pub fn allow(&mut self, more: usize) {
        self.succeed_count = self.calls + more;
    }

    fn new(hook: FailingHook, succeed_count: usize) -> Self {
        Self {
            ports: PortRegistry::new(),
            hook,
            succeed_count,
            calls: 0,
        }
    }

    fn call(&mut self, hook: FailingHook) -> Result<(), SystemError> {
        if hook != self.hook {
            return Ok(());
        }
        self.calls += 1;
        if self.calls > self.succeed_count {
            Err(SystemError::ExecutionFailed {
                reason: format!("deliberate failure on call {}", self.calls),
            })
        } else {
            Ok(())
        }
    }
}

impl System for FailingSystem {
    fn name(&self) -> &str {
        "failing"
    }

    impl_ports!();

    fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
        self.call(FailingHook::DoStep)
    }

    fn post_step(&mut self, _ctx: &StepContext) -> Result<(), SystemError> {
        self.call(FailingHook::PostStep)
    }
}
