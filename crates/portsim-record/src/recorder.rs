//! Channel registration and per-step sampling.

use indexmap::IndexMap;
use portsim_core::{Arity, PortError, PortKind, PortRef, PortRegistry, SystemId};

use crate::series::Series;

/// Namespaces searched by [`Recorder::store`], in order.
pub const STORE_LOOKUP: [PortKind; 5] = [
    PortKind::Output,
    PortKind::State,
    PortKind::Derivative,
    PortKind::Input,
    PortKind::Parameter,
];

#[derive(Clone, Debug)]
struct Channel {
    name: String,
    width: usize,
    times: Vec<f64>,
    values: Vec<f64>,
}

impl Channel {
    fn series(&self) -> Series<'_> {
        Series::new(self.width, &self.times, &self.values)
    }
}

/// Collects time series of stored ports, grouped by system.
///
/// Channels are keyed by port handle, so ports sharing a name in different
/// namespaces are recorded separately.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    systems: IndexMap<SystemId, IndexMap<PortRef, Channel>>,
}

impl Recorder {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` on `system` for recording.
    ///
    /// The name is looked up in [`STORE_LOOKUP`] order. Storing the same
    /// port twice keeps the existing channel and its samples.
    ///
    /// # Errors
    ///
    /// - [`PortError::UnknownPort`] if no numeric namespace declares `name`.
    /// - [`PortError::KindMismatch`] for text parameters.
    pub fn store(
        &mut self,
        system: SystemId,
        ports: &PortRegistry,
        name: &str,
    ) -> Result<(), PortError> {
        let port = ports
            .find(name, &STORE_LOOKUP)
            .ok_or_else(|| PortError::UnknownPort {
                kind: PortKind::Output,
                name: name.to_string(),
            })?;
        self.store_ref(system, ports, name, port)
    }

    /// Register a port in a specific namespace for recording.
    pub fn store_kind(
        &mut self,
        system: SystemId,
        ports: &PortRegistry,
        kind: PortKind,
        name: &str,
    ) -> Result<(), PortError> {
        let port = ports.group(kind).port_ref(name)?;
        self.store_ref(system, ports, name, port)
    }

    fn store_ref(
        &mut self,
        system: SystemId,
        ports: &PortRegistry,
        name: &str,
        port: PortRef,
    ) -> Result<(), PortError> {
        let arity = ports.port_at(port)?.arity();
        if arity == Arity::Text {
            return Err(PortError::KindMismatch {
                port: name.to_string(),
                expected: Arity::Scalar,
                found: arity,
            });
        }
        self.systems
            .entry(system)
            .or_default()
            .entry(port)
            .or_insert_with(|| Channel {
                name: name.to_string(),
                width: arity.width(),
                times: Vec::new(),
                values: Vec::new(),
            });
        Ok(())
    }

    /// Whether any channel is registered for `system`.
    pub fn is_recording(&self, system: SystemId) -> bool {
        self.systems.get(&system).is_some_and(|c| !c.is_empty())
    }

    /// Stored ports of `system` as `(namespace, name)`, in registration
    /// order.
    pub fn channels(&self, system: SystemId) -> impl Iterator<Item = (PortKind, &str)> + '_ {
        self.systems
            .get(&system)
            .into_iter()
            .flat_map(|channels| {
                channels
                    .iter()
                    .map(|(port, c)| (port.kind(), c.name.as_str()))
            })
    }

    /// Append the current value of every channel of `system`, tagged `time`.
    ///
    /// Does nothing for systems with no stored ports.
    pub fn sample(
        &mut self,
        system: SystemId,
        ports: &PortRegistry,
        time: f64,
    ) -> Result<(), PortError> {
        let Some(channels) = self.systems.get_mut(&system) else {
            return Ok(());
        };
        log::trace!(
            "Recording {} channel(s) of system {} at t = {}",
            channels.len(),
            system,
            time
        );
        for (&port, channel) in channels.iter_mut() {
            let values = ports.values_at(port)?;
            channel.times.push(time);
            channel.values.extend_from_slice(values);
        }
        Ok(())
    }

    /// The samples recorded so far for `name` on `system`.
    ///
    /// Stored channels are searched in [`STORE_LOOKUP`] order. `None` if no
    /// port of that name was stored.
    pub fn series(&self, system: SystemId, name: &str) -> Option<Series<'_>> {
        STORE_LOOKUP
            .iter()
            .find_map(|&kind| self.series_kind(system, kind, name))
    }

    /// The samples recorded so far for a port in a specific namespace.
    pub fn series_kind(
        &self,
        system: SystemId,
        kind: PortKind,
        name: &str,
    ) -> Option<Series<'_>> {
        self.systems
            .get(&system)?
            .iter()
            .find(|(port, c)| port.kind() == kind && c.name == name)
            .map(|(_, c)| c.series())
    }

    /// Drop every sample taken at or after `time`.
    ///
    /// Used to discard the partial record of an aborted step.
    pub fn discard_from(&mut self, time: f64) {
        for channel in self.systems.values_mut().flat_map(|c| c.values_mut()) {
            let keep = channel.times.partition_point(|&t| t < time);
            channel.times.truncate(keep);
            channel.values.truncate(keep * channel.width);
        }
    }

    /// Discard all samples, keeping the registered channels.
    pub fn clear(&mut self) {
        for channel in self.systems.values_mut().flat_map(|c| c.values_mut()) {
            channel.times.clear();
            channel.values.clear();
        }
    }
}
