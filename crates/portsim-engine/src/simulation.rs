//! The simulation driver.
//!
//! [`Simulation`] is the user-facing entry point. It owns registered systems
//! and their wiring, resolves the evaluation order, and runs the stepping
//! loop.
//!
//! # Lifecycle
//!
//! A simulation starts in the build phase: systems and connections may be
//! added freely. The first call to [`simulate()`](Simulation::simulate)
//! resolves the [`Schedule`], runs every system's `pre_sim` hook, and ends
//! the build phase. Later calls continue from the current clock. Adding a
//! system or connection after that fails with [`SimError::GraphFrozen`];
//! port values, stored channels, and parameters stay writable between runs.
//!
//! # Failure
//!
//! If a hook fails mid-step the run stops with that error. States, the
//! clock, the step counter, discrete update times, and recorded series are
//! left as they were after the last completed step. Inputs and outputs may hold values written
//! during the aborted step.

use portsim_core::{PortKind, PortRegistry, StepId, SystemId};
use portsim_record::{Recorder, Series};
use portsim_system::{Evaluation, StepContext, System};

use crate::config::RunConfig;
use crate::connection::{ConnectionGraph, Endpoint, Side};
use crate::error::SimError;
use crate::integrate::{ForwardEuler, Integrator};
use crate::metrics::RunStats;
use crate::schedule::Schedule;

/// Fraction of a step within which a discrete system's requested update
/// time counts as reached.
const DISCRETE_SLACK: f64 = 1e-9;

// ── Simulation ─────────────────────────────────────────────────────

/// A block-diagram simulation.
///
/// # Examples
///
/// ```
/// use portsim_engine::Simulation;
/// use portsim_systems::Adder;
///
/// let mut sim = Simulation::new();
/// let a = sim.add_system(Adder::new().unwrap()).unwrap();
/// let b = sim.add_system(Adder::new().unwrap()).unwrap();
/// sim.connections(a).add_connection("output1", b, "input1").unwrap();
///
/// sim.ports_mut(a).unwrap().inputs_mut().set("input1", 1.0).unwrap();
/// sim.ports_mut(a).unwrap().inputs_mut().set("input2", 2.0).unwrap();
/// sim.simulate(1.0, 0.1).unwrap();
///
/// assert_eq!(sim.ports(b).unwrap().outputs().scalar("output1").unwrap(), 3.0);
/// ```
pub struct Simulation {
    systems: Vec<Box<dyn System>>,
    next_updates: Vec<Option<f64>>,
    graph: ConnectionGraph,
    schedule: Option<Schedule>,
    recorder: Recorder,
    integrator: Box<dyn Integrator>,
    time: f64,
    step: StepId,
    started: bool,
    state_backup: Vec<f64>,
    update_backup: Vec<Option<f64>>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// An empty simulation with the clock at `0.0`.
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    /// An empty simulation with the clock at `t0`.
    pub fn starting_at(t0: f64) -> Self {
        Self {
            systems: Vec::new(),
            next_updates: Vec::new(),
            graph: ConnectionGraph::new(),
            schedule: None,
            recorder: Recorder::new(),
            integrator: Box::new(ForwardEuler),
            time: t0,
            step: StepId::default(),
            started: false,
            state_backup: Vec::new(),
            update_backup: Vec::new(),
        }
    }

    /// Replace the integration scheme (default [`ForwardEuler`]).
    pub fn with_integrator(mut self, integrator: Box<dyn Integrator>) -> Self {
        self.integrator = integrator;
        self
    }

    // ── Systems ────────────────────────────────────────────────

    /// Register a system and return its ID.
    ///
    /// The system's ports are closed to further declaration.
    pub fn add_system<S: System>(&mut self, system: S) -> Result<SystemId, SimError> {
        self.add_boxed(Box::new(system))
    }

    /// Register an already boxed system.
    pub fn add_boxed(&mut self, mut system: Box<dyn System>) -> Result<SystemId, SimError> {
        self.ensure_building("add a system")?;
        system.ports_mut().freeze();
        let id = SystemId(self.systems.len() as u32);
        log::debug!("Registered system '{}' as {}", system.name(), id);
        self.systems.push(system);
        self.next_updates.push(None);
        self.schedule = None;
        Ok(id)
    }

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Whether no systems are registered.
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// A registered system.
    pub fn system(&self, id: SystemId) -> Result<&dyn System, SimError> {
        self.systems
            .get(id.index())
            .map(|s| s.as_ref())
            .ok_or(SimError::UnknownSystem(id))
    }

    /// A registered system, mutably.
    pub fn system_mut(&mut self, id: SystemId) -> Result<&mut dyn System, SimError> {
        match self.systems.get_mut(id.index()) {
            Some(s) => Ok(s.as_mut()),
            None => Err(SimError::UnknownSystem(id)),
        }
    }

    /// A registered system as its concrete type.
    ///
    /// `None` if the ID is unknown or the system is of another type.
    pub fn system_as<T: System>(&self, id: SystemId) -> Option<&T> {
        self.systems.get(id.index())?.downcast_ref::<T>()
    }

    /// A registered system as its concrete type, mutably.
    pub fn system_as_mut<T: System>(&mut self, id: SystemId) -> Option<&mut T> {
        self.systems.get_mut(id.index())?.downcast_mut::<T>()
    }

    /// The ports of a registered system.
    pub fn ports(&self, id: SystemId) -> Result<&PortRegistry, SimError> {
        Ok(self.system(id)?.ports())
    }

    /// The ports of a registered system, mutably.
    pub fn ports_mut(&mut self, id: SystemId) -> Result<&mut PortRegistry, SimError> {
        Ok(self.system_mut(id)?.ports_mut())
    }

    /// `name#id`, unique within this simulation.
    pub fn label(&self, id: SystemId) -> Result<String, SimError> {
        Ok(label_of(self.system(id)?, id))
    }

    // ── Connections ────────────────────────────────────────────

    /// Declare connections out of `source`.
    pub fn connections(&mut self, source: SystemId) -> Connections<'_> {
        Connections { sim: self, source }
    }

    /// Connect `source` to `destination`.
    ///
    /// Either end may select a single element of a vector port.
    ///
    /// # Errors
    ///
    /// - [`SimError::GraphFrozen`] once the simulation has started.
    /// - [`SimError::UnknownSystem`] for a foreign ID.
    /// - [`SimError::InvalidConnection`] if a port is unknown, an index is
    ///   out of range, or the shapes disagree.
    /// - [`SimError::DuplicateDestination`] if the destination is already
    ///   driven.
    pub fn connect(&mut self, source: Endpoint, destination: Endpoint) -> Result<(), SimError> {
        self.ensure_building("add a connection")?;
        let source_label = self.label(source.system)?;
        let destination_label = self.label(destination.system)?;
        let source_system = self
            .systems
            .get(source.system.index())
            .ok_or(SimError::UnknownSystem(source.system))?;
        let destination_system = self
            .systems
            .get(destination.system.index())
            .ok_or(SimError::UnknownSystem(destination.system))?;

        let connection = self.graph.add(
            Side {
                endpoint: source,
                ports: source_system.ports(),
                system_label: &source_label,
            },
            Side {
                endpoint: destination,
                ports: destination_system.ports(),
                system_label: &destination_label,
            },
        )?;
        log::debug!("Connected {}", connection);
        self.schedule = None;
        Ok(())
    }

    /// All connections.
    pub fn connection_graph(&self) -> &ConnectionGraph {
        &self.graph
    }

    // ── Recording ──────────────────────────────────────────────

    /// Record port `name` of `system` after every step.
    ///
    /// Looked up among outputs, states, derivatives, inputs, then
    /// parameters.
    pub fn store(&mut self, system: SystemId, name: &str) -> Result<(), SimError> {
        let ports = self
            .systems
            .get(system.index())
            .ok_or(SimError::UnknownSystem(system))?
            .ports();
        self.recorder
            .store(system, ports, name)
            .map_err(|source| SimError::Port {
                system: label_of(self.systems[system.index()].as_ref(), system),
                source,
            })
    }

    /// Record a port from a specific namespace.
    pub fn store_kind(
        &mut self,
        system: SystemId,
        kind: PortKind,
        name: &str,
    ) -> Result<(), SimError> {
        let ports = self
            .systems
            .get(system.index())
            .ok_or(SimError::UnknownSystem(system))?
            .ports();
        self.recorder
            .store_kind(system, ports, kind, name)
            .map_err(|source| SimError::Port {
                system: label_of(self.systems[system.index()].as_ref(), system),
                source,
            })
    }

    /// The samples recorded so far for a stored port.
    pub fn series(&self, system: SystemId, name: &str) -> Result<Series<'_>, SimError> {
        let label = self.label(system)?;
        self.recorder
            .series(system, name)
            .ok_or_else(|| SimError::NotRecorded {
                system: label,
                port: name.to_string(),
            })
    }

    /// The samples recorded so far for a port stored from a specific
    /// namespace.
    pub fn series_kind(
        &self,
        system: SystemId,
        kind: PortKind,
        name: &str,
    ) -> Result<Series<'_>, SimError> {
        let label = self.label(system)?;
        self.recorder
            .series_kind(system, kind, name)
            .ok_or_else(|| SimError::NotRecorded {
                system: label,
                port: name.to_string(),
            })
    }

    /// The recorder holding every stored series.
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    // ── Scheduling ─────────────────────────────────────────────

    /// Resolve the evaluation order now instead of at the first step.
    pub fn build(&mut self) -> Result<&Schedule, SimError> {
        let schedule = match self.schedule.take() {
            Some(schedule) => schedule,
            None => {
                let systems = &self.systems;
                let label = |id: SystemId| match systems.get(id.index()) {
                    Some(s) => label_of(s.as_ref(), id),
                    None => id.to_string(),
                };
                let schedule =
                    Schedule::resolve(systems.len(), self.graph.dependencies(), &label)?;
                log::debug!(
                    "Resolved schedule: {}",
                    schedule
                        .order()
                        .iter()
                        .map(|&id| label(id))
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                schedule
            }
        };
        Ok(self.schedule.insert(schedule))
    }

    /// The resolved evaluation order, once built.
    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    // ── Running ────────────────────────────────────────────────

    /// Current simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Steps completed across all runs.
    pub fn step_id(&self) -> StepId {
        self.step
    }

    /// Whether the first run has begun.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Advance the clock by `floor(duration / step_size)` fixed steps.
    ///
    /// # Errors
    ///
    /// - [`SimError::InvalidStep`] for a non-positive step, a negative
    ///   duration, or more than [`MAX_STEPS`](crate::MAX_STEPS) steps.
    /// - [`SimError::CyclicDependency`] if the wiring cannot be ordered.
    /// - [`SimError::SystemFailed`] if any hook fails.
    pub fn simulate(&mut self, duration: f64, step_size: f64) -> Result<RunStats, SimError> {
        self.run(RunConfig::new(duration, step_size))
    }

    /// [`simulate`](Self::simulate) with an explicit configuration.
    pub fn run(&mut self, config: RunConfig) -> Result<RunStats, SimError> {
        config.validate()?;
        let order = self.build()?.order().to_vec();
        let step_size = config.step_size;
        let steps = config.step_count();

        if !self.started {
            let ctx = StepContext::new(self.time, step_size, self.step);
            for &id in &order {
                let system = &mut self.systems[id.index()];
                system
                    .pre_sim(&ctx)
                    .map_err(|source| failed(system.as_ref(), id, source))?;
            }
            self.started = true;
        }

        log::debug!(
            "Running {} step(s) of {} from t = {} with {}",
            steps,
            step_size,
            self.time,
            self.integrator.name()
        );
        let origin = self.time;
        let mut stats = RunStats::default();
        for k in 0..steps {
            let t = origin + k as f64 * step_size;
            self.step_once(&order, t, step_size, &mut stats)?;
            self.time = origin + (k + 1) as f64 * step_size;
            self.step = self.step.next();
            stats.steps += 1;
        }
        stats.end_time = self.time;
        log::info!(
            "Simulation finished at t = {} after {} step(s)",
            self.time,
            stats.steps
        );
        Ok(stats)
    }

    fn step_once(
        &mut self,
        order: &[SystemId],
        t: f64,
        step_size: f64,
        stats: &mut RunStats,
    ) -> Result<(), SimError> {
        log::trace!("Step {} at t = {}", self.step, t);
        self.update_backup.clone_from(&self.next_updates);
        let result = self.evaluate_and_integrate(order, t, step_size, stats);
        if result.is_err() {
            self.next_updates.clone_from(&self.update_backup);
        }
        result
    }

    fn evaluate_and_integrate(
        &mut self,
        order: &[SystemId],
        t: f64,
        step_size: f64,
        stats: &mut RunStats,
    ) -> Result<(), SimError> {
        let ctx = StepContext::new(t, step_size, self.step);

        for &id in order {
            let system = &mut self.systems[id.index()];
            system
                .pre_step(&ctx)
                .map_err(|source| failed(system.as_ref(), id, source))?;
        }

        for &id in order {
            self.graph.propagate_into(id, &mut self.systems)?;

            let i = id.index();
            let system = &mut self.systems[i];
            let discrete = system.evaluation() == Evaluation::Discrete;
            if discrete
                && self.next_updates[i].is_some_and(|next| t + step_size * DISCRETE_SLACK < next)
            {
                stats.skipped_evaluations += 1;
                continue;
            }

            let mut step_ctx = ctx.clone();
            system
                .do_step(&mut step_ctx)
                .map_err(|source| failed(system.as_ref(), id, source))?;
            if discrete {
                self.next_updates[i] = step_ctx.next_update();
            }
            stats.evaluations += 1;
        }

        self.save_states();
        for system in &mut self.systems {
            self.integrator.integrate(system.ports_mut(), step_size);
        }

        if let Err(e) = self.finish_step(order, &ctx) {
            self.restore_states();
            self.recorder.discard_from(t);
            return Err(e);
        }
        Ok(())
    }

    fn finish_step(&mut self, order: &[SystemId], ctx: &StepContext) -> Result<(), SimError> {
        for &id in order {
            let system = &mut self.systems[id.index()];
            system
                .post_step(ctx)
                .map_err(|source| failed(system.as_ref(), id, source))?;
        }
        for (i, system) in self.systems.iter().enumerate() {
            let id = SystemId(i as u32);
            self.recorder
                .sample(id, system.ports(), ctx.time())
                .map_err(|source| SimError::Port {
                    system: label_of(system.as_ref(), id),
                    source,
                })?;
        }
        Ok(())
    }

    fn save_states(&mut self) {
        self.state_backup.clear();
        for system in &self.systems {
            for port in system.ports().states().iter() {
                if let Some(values) = port.values() {
                    self.state_backup.extend_from_slice(values);
                }
            }
        }
    }

    fn restore_states(&mut self) {
        let mut offset = 0;
        for system in &mut self.systems {
            for (state, _) in system.ports_mut().state_pairs_mut() {
                let end = offset + state.len();
                if let Some(saved) = self.state_backup.get(offset..end) {
                    state.copy_from_slice(saved);
                }
                offset = end;
            }
        }
    }

    fn ensure_building(&self, operation: &'static str) -> Result<(), SimError> {
        if self.started {
            Err(SimError::GraphFrozen { operation })
        } else {
            Ok(())
        }
    }
}

fn label_of(system: &dyn System, id: SystemId) -> String {
    format!("{}#{}", system.name(), id)
}

fn failed(system: &dyn System, id: SystemId, source: portsim_core::SystemError) -> SimError {
    SimError::SystemFailed {
        system: label_of(system, id),
        source,
    }
}

// ── Connections ────────────────────────────────────────────────────

/// Connection builder scoped to one source system.
///
/// Returned by [`Simulation::connections`]. Each method validates and adds
/// one connection; calls can be chained with `?`.
pub struct Connections<'a> {
    sim: &'a mut Simulation,
    source: SystemId,
}

impl std::fmt::Debug for Connections<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connections")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Connections<'_> {
    /// Copy the whole of `port` into input `destination_port` of
    /// `destination`.
    pub fn add_connection(
        &mut self,
        port: &str,
        destination: SystemId,
        destination_port: &str,
    ) -> Result<&mut Self, SimError> {
        self.sim.connect(
            Endpoint::new(self.source, port),
            Endpoint::new(destination, destination_port),
        )?;
        Ok(self)
    }

    /// Copy element `index` of vector `port` into a scalar input.
    pub fn add_element_connection(
        &mut self,
        port: &str,
        index: usize,
        destination: SystemId,
        destination_port: &str,
    ) -> Result<&mut Self, SimError> {
        self.sim.connect(
            Endpoint::element(self.source, port, index),
            Endpoint::new(destination, destination_port),
        )?;
        Ok(self)
    }

    /// Copy scalar `port` into element `index` of a vector input.
    pub fn add_connection_to_element(
        &mut self,
        port: &str,
        destination: SystemId,
        destination_port: &str,
        index: usize,
    ) -> Result<&mut Self, SimError> {
        self.sim.connect(
            Endpoint::new(self.source, port),
            Endpoint::element(destination, destination_port, index),
        )?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portsim_test_utils::{
        Accumulator, ConstantSource, DiscreteCounter, FailingSystem, Gain, Passthrough,
    };

    #[test]
    fn ids_follow_registration_order() {
        let mut sim = Simulation::new();
        let a = sim.add_system(ConstantSource::new(1.0)).unwrap();
        let b = sim.add_system(Gain::new(2.0)).unwrap();
        assert_eq!((a, b), (SystemId(0), SystemId(1)));
        assert_eq!(sim.len(), 2);
        assert_eq!(sim.label(b).unwrap(), "gain#1");
    }

    #[test]
    fn registration_freezes_ports() {
        let mut sim = Simulation::new();
        let a = sim.add_system(Gain::new(2.0)).unwrap();
        assert!(sim.ports(a).unwrap().is_frozen());
        assert!(sim.ports_mut(a).unwrap().add_input("late").is_err());
    }

    #[test]
    fn unknown_system_id_rejected() {
        let mut sim = Simulation::new();
        let a = sim.add_system(Gain::new(2.0)).unwrap();
        assert_eq!(
            sim.ports(SystemId(7)).unwrap_err(),
            SimError::UnknownSystem(SystemId(7))
        );
        assert!(matches!(
            sim.connections(a).add_connection("y", SystemId(7), "u"),
            Err(SimError::UnknownSystem(_))
        ));
    }

    #[test]
    fn graph_frozen_after_first_run() {
        let mut sim = Simulation::new();
        let a = sim.add_system(ConstantSource::new(1.0)).unwrap();
        let b = sim.add_system(Gain::new(2.0)).unwrap();
        sim.simulate(0.1, 0.1).unwrap();
        assert!(sim.is_started());
        assert!(matches!(
            sim.add_system(Gain::new(1.0)),
            Err(SimError::GraphFrozen { .. })
        ));
        assert!(matches!(
            sim.connections(a).add_connection("y", b, "u"),
            Err(SimError::GraphFrozen { .. })
        ));
    }

    #[test]
    fn build_reports_schedule() {
        let mut sim = Simulation::new();
        let g = sim.add_system(Gain::new(2.0)).unwrap();
        let c = sim.add_system(ConstantSource::new(1.0)).unwrap();
        sim.connections(c).add_connection("y", g, "u").unwrap();
        assert!(sim.schedule().is_none());
        assert_eq!(sim.build().unwrap().order(), &[c, g]);
        assert!(sim.schedule().is_some());
    }

    #[test]
    fn clock_is_computed_from_step_count() {
        let mut sim = Simulation::starting_at(2.0);
        sim.add_system(ConstantSource::new(1.0)).unwrap();
        let stats = sim.simulate(1.0, 0.1).unwrap();
        assert_eq!(stats.steps, 10);
        assert_eq!(sim.time(), 2.0 + 10.0 * 0.1);
        assert_eq!(stats.end_time, sim.time());
        assert_eq!(sim.step_id(), StepId(10));
    }

    #[test]
    fn zero_duration_runs_no_steps() {
        let mut sim = Simulation::new();
        let a = sim.add_system(Accumulator::new()).unwrap();
        sim.ports_mut(a).unwrap().inputs_mut().set("u", 1.0).unwrap();
        let stats = sim.simulate(0.0, 0.1).unwrap();
        assert_eq!(stats.steps, 0);
        assert_eq!(sim.ports(a).unwrap().states().scalar("x").unwrap(), 0.0);
    }

    #[test]
    fn failing_post_step_rolls_back_states_and_record() {
        let mut sim = Simulation::new();
        let acc = sim.add_system(Accumulator::new()).unwrap();
        let _bad = sim.add_system(FailingSystem::post_step_after(3)).unwrap();
        sim.ports_mut(acc).unwrap().inputs_mut().set("u", 1.0).unwrap();
        sim.store(acc, "x").unwrap();

        let err = sim.simulate(1.0, 0.1).unwrap_err();
        assert!(matches!(err, SimError::SystemFailed { .. }));
        assert_eq!(sim.step_id(), StepId(3));
        assert!((sim.time() - 0.3).abs() < 1e-12);
        let x = sim.ports(acc).unwrap().states().scalar("x").unwrap();
        assert!((x - 0.3).abs() < 1e-12, "x = {x}");
        assert_eq!(sim.series(acc, "x").unwrap().len(), 3);
    }

    #[test]
    fn aborted_step_does_not_advance_discrete_updates() {
        let mut sim = Simulation::new();
        let counter = sim.add_system(DiscreteCounter::new(0.1)).unwrap();
        let bad = sim.add_system(FailingSystem::do_step_after(2)).unwrap();
        assert!(sim.simulate(1.0, 0.1).is_err());
        assert_eq!(sim.step_id(), StepId(2));

        sim.system_as_mut::<FailingSystem>(bad).unwrap().allow(1);
        let stats = sim.simulate(0.1, 0.1).unwrap();
        // The counter is due again at t = 0.2.
        assert_eq!(stats.evaluations, 2);
        assert_eq!(stats.skipped_evaluations, 0);
        assert_eq!(sim.step_id(), StepId(3));
        assert_eq!(sim.ports(counter).unwrap().outputs().scalar("count").unwrap(), 4.0);
    }

    #[test]
    fn series_kind_reads_one_namespace() {
        let mut sim = Simulation::new();
        let acc = sim.add_system(Accumulator::new()).unwrap();
        sim.ports_mut(acc).unwrap().inputs_mut().set("u", 1.0).unwrap();
        sim.store_kind(acc, PortKind::State, "x").unwrap();
        sim.store_kind(acc, PortKind::Input, "u").unwrap();
        sim.store_kind(acc, PortKind::Derivative, "dx").unwrap();
        sim.simulate(0.3, 0.1).unwrap();

        let x = sim.series_kind(acc, PortKind::State, "x").unwrap();
        assert_eq!(x.len(), 3);
        assert!(matches!(
            sim.series_kind(acc, PortKind::Output, "x"),
            Err(SimError::NotRecorded { .. })
        ));
        assert_eq!(sim.recorder().channels(acc).count(), 3);
    }

    #[test]
    fn series_of_unstored_port_is_an_error() {
        let mut sim = Simulation::new();
        let a = sim.add_system(Passthrough::new()).unwrap();
        assert!(matches!(
            sim.series(a, "y"),
            Err(SimError::NotRecorded { .. })
        ));
        assert!(matches!(
            sim.store(a, "nope"),
            Err(SimError::Port { .. })
        ));
    }

    #[test]
    fn system_as_recovers_concrete_type() {
        let mut sim = Simulation::new();
        let g = sim.add_system(Gain::new(4.0)).unwrap();
        assert!(sim.system_as::<Gain>(g).is_some());
        assert!(sim.system_as::<Passthrough>(g).is_none());
        assert!(sim.system_as_mut::<Gain>(g).is_some());
    }
}
