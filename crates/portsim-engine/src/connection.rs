//! Point-to-point wiring between system ports.
//!
//! A [`Connection`] copies a source port (output, state, or derivative), or
//! one element of it, into a destination input, or one element of it, every
//! step. Connections are validated when added: both ports must exist, element
//! indices must be in range, and the two ends must carry the same shape once
//! indices are applied.

use std::fmt;

use indexmap::IndexMap;
use portsim_core::{Arity, PortError, PortKind, PortRef, PortRegistry, SystemId};
use portsim_system::System;
use smallvec::SmallVec;

use crate::error::SimError;

// ── Endpoint ───────────────────────────────────────────────────────

/// One end of a connection, by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// The system owning the port.
    pub system: SystemId,
    /// Port name. Sources are looked up among outputs, then states, then
    /// derivatives; destinations among inputs.
    pub port: String,
    /// Element of a vector port, or `None` for the whole port.
    pub index: Option<usize>,
}

impl Endpoint {
    /// The whole of `port` on `system`.
    pub fn new(system: SystemId, port: impl Into<String>) -> Self {
        Self {
            system,
            port: port.into(),
            index: None,
        }
    }

    /// Element `index` of vector `port` on `system`.
    pub fn element(system: SystemId, port: impl Into<String>, index: usize) -> Self {
        Self {
            system,
            port: port.into(),
            index: Some(index),
        }
    }
}

/// A resolved endpoint together with its owner's ports and display label.
pub(crate) struct Side<'a> {
    pub(crate) endpoint: Endpoint,
    pub(crate) ports: &'a PortRegistry,
    pub(crate) system_label: &'a str,
}

impl Side<'_> {
    fn label(&self) -> String {
        match self.endpoint.index {
            Some(i) => format!("{}.{}[{}]", self.system_label, self.endpoint.port, i),
            None => format!("{}.{}", self.system_label, self.endpoint.port),
        }
    }
}

// ── Connection ─────────────────────────────────────────────────────

/// A validated connection.
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    source: SystemId,
    source_port: PortRef,
    source_index: Option<usize>,
    source_label: String,
    destination: SystemId,
    destination_port: PortRef,
    destination_index: Option<usize>,
    destination_label: String,
}

impl Connection {
    /// The system read from.
    pub fn source(&self) -> SystemId {
        self.source
    }

    /// The system written to.
    pub fn destination(&self) -> SystemId {
        self.destination
    }

    /// Namespace of the source port.
    pub fn source_kind(&self) -> PortKind {
        self.source_port.kind()
    }

    /// Source element, if only one element is copied.
    pub fn source_index(&self) -> Option<usize> {
        self.source_index
    }

    /// Destination element, if only one element is written.
    pub fn destination_index(&self) -> Option<usize> {
        self.destination_index
    }

    /// Whether the destination must be evaluated after the source within a
    /// step.
    ///
    /// State sources hold last step's integrated value for the whole step,
    /// so they impose no order.
    pub fn orders_evaluation(&self) -> bool {
        self.source_kind() != PortKind::State
    }

    fn overlaps(&self, destination: SystemId, port: PortRef, index: Option<usize>) -> bool {
        self.destination == destination
            && self.destination_port == port
            && match (self.destination_index, index) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source_label, self.destination_label)
    }
}

// ── ConnectionGraph ────────────────────────────────────────────────

/// All connections of a simulation, indexed by destination system.
#[derive(Clone, Debug, Default)]
pub struct ConnectionGraph {
    connections: Vec<Connection>,
    incoming: IndexMap<SystemId, Vec<usize>>,
}

impl ConnectionGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether there are no connections.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// All connections, in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &Connection> + '_ {
        self.connections.iter()
    }

    /// Connections writing into `destination`.
    pub fn incoming(&self, destination: SystemId) -> impl Iterator<Item = &Connection> + '_ {
        self.incoming
            .get(&destination)
            .into_iter()
            .flatten()
            .map(|&i| &self.connections[i])
    }

    /// `(source, destination)` pairs that constrain evaluation order.
    pub fn dependencies(&self) -> impl Iterator<Item = (SystemId, SystemId)> + '_ {
        self.connections
            .iter()
            .filter(|c| c.orders_evaluation())
            .map(|c| (c.source, c.destination))
    }

    /// Validate and add a connection.
    pub(crate) fn add(
        &mut self,
        source: Side<'_>,
        destination: Side<'_>,
    ) -> Result<&Connection, SimError> {
        let source_label = source.label();
        let destination_label = destination.label();
        let invalid = |e: PortError| SimError::InvalidConnection {
            connection: format!("{source_label} -> {destination_label}"),
            source: e,
        };

        let src = &source.endpoint;
        let source_port = source
            .ports
            .find(&src.port, &PortKind::SOURCES)
            .ok_or_else(|| PortError::UnknownPort {
                kind: PortKind::Output,
                name: src.port.clone(),
            })
            .map_err(&invalid)?;
        let source_arity = source.ports.port_at(source_port).map_err(&invalid)?.arity();
        let source_shape = element_arity(&src.port, source_arity, src.index).map_err(&invalid)?;

        let dst = &destination.endpoint;
        let destination_port = destination
            .ports
            .inputs()
            .port_ref(&dst.port)
            .map_err(&invalid)?;
        let destination_arity = destination
            .ports
            .port_at(destination_port)
            .map_err(&invalid)?
            .arity();
        let destination_shape =
            element_arity(&dst.port, destination_arity, dst.index).map_err(&invalid)?;

        check_compatible(&dst.port, destination_shape, source_shape).map_err(&invalid)?;

        if let Some(existing) = self
            .incoming(dst.system)
            .find(|c| c.overlaps(dst.system, destination_port, dst.index))
        {
            return Err(SimError::DuplicateDestination {
                destination: destination_label,
                existing: existing.source_label.clone(),
            });
        }

        let index = self.connections.len();
        self.connections.push(Connection {
            source: src.system,
            source_port,
            source_index: src.index,
            source_label,
            destination: dst.system,
            destination_port,
            destination_index: dst.index,
            destination_label,
        });
        self.incoming.entry(dst.system).or_default().push(index);
        Ok(&self.connections[index])
    }

    /// Copy every connection into `destination` from its current source
    /// value.
    pub(crate) fn propagate_into(
        &self,
        destination: SystemId,
        systems: &mut [Box<dyn System>],
    ) -> Result<(), SimError> {
        let Some(incoming) = self.incoming.get(&destination) else {
            return Ok(());
        };
        // Staged through a buffer so a system can feed its own input.
        let mut scratch: SmallVec<[f64; 8]> = SmallVec::new();
        for &i in incoming {
            let c = &self.connections[i];
            let failed = |e: PortError| SimError::InvalidConnection {
                connection: c.to_string(),
                source: e,
            };

            let source = systems
                .get(c.source.index())
                .ok_or(SimError::UnknownSystem(c.source))?;
            let values = source.ports().values_at(c.source_port).map_err(failed)?;
            scratch.clear();
            match c.source_index {
                Some(k) => scratch.push(element(values, k).map_err(failed)?),
                None => scratch.extend_from_slice(values),
            }

            let target = systems
                .get_mut(destination.index())
                .ok_or(SimError::UnknownSystem(destination))?;
            let slot = target
                .ports_mut()
                .values_at_mut(c.destination_port)
                .map_err(failed)?;
            match c.destination_index {
                Some(k) => {
                    let len = slot.len();
                    let cell = slot.get_mut(k).ok_or_else(|| {
                        failed(PortError::IndexOutOfRange {
                            port: c.destination_label.clone(),
                            index: k,
                            len,
                        })
                    })?;
                    *cell = scratch.first().copied().unwrap_or_default();
                }
                None if slot.len() == scratch.len() => slot.copy_from_slice(&scratch),
                None => {
                    return Err(failed(PortError::ShapeMismatch {
                        port: c.destination_label.clone(),
                        expected: slot.len(),
                        found: scratch.len(),
                    }))
                }
            }
        }
        Ok(())
    }
}

fn element(values: &[f64], index: usize) -> Result<f64, PortError> {
    values
        .get(index)
        .copied()
        .ok_or(PortError::IndexOutOfRange {
            port: String::from("<source>"),
            index,
            len: values.len(),
        })
}

/// Shape an endpoint carries once its element index is applied.
fn element_arity(port: &str, arity: Arity, index: Option<usize>) -> Result<Arity, PortError> {
    match (arity, index) {
        (arity, None) => Ok(arity),
        (Arity::Vector { len }, Some(i)) if i < len => Ok(Arity::Scalar),
        (Arity::Vector { len }, Some(i)) => Err(PortError::IndexOutOfRange {
            port: port.to_string(),
            index: i,
            len,
        }),
        (arity, Some(_)) => Err(PortError::NotIndexable {
            port: port.to_string(),
            arity,
        }),
    }
}

fn check_compatible(port: &str, destination: Arity, source: Arity) -> Result<(), PortError> {
    match (destination, source) {
        (Arity::Scalar, Arity::Scalar) => Ok(()),
        (Arity::Vector { len: expected }, Arity::Vector { len: found }) if expected == found => {
            Ok(())
        }
        (Arity::Vector { len: expected }, Arity::Vector { len: found }) => {
            Err(PortError::ShapeMismatch {
                port: port.to_string(),
                expected,
                found,
            })
        }
        (expected, found) => Err(PortError::KindMismatch {
            port: port.to_string(),
            expected,
            found,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portsim_core::PortDecl;

    fn source_ports() -> PortRegistry {
        let mut ports = PortRegistry::new();
        ports.add_output("y").unwrap();
        ports.add_output(PortDecl::vector("v", 3)).unwrap();
        ports.add_state(PortDecl::vector("x", 2), "dx").unwrap();
        ports
    }

    fn destination_ports() -> PortRegistry {
        let mut ports = PortRegistry::new();
        ports.add_input("u").unwrap();
        ports.add_input("w").unwrap();
        ports.add_input(PortDecl::vector("uv", 3)).unwrap();
        ports
    }

    fn side<'a>(endpoint: Endpoint, ports: &'a PortRegistry, label: &'a str) -> Side<'a> {
        Side {
            endpoint,
            ports,
            system_label: label,
        }
    }

    fn connect(
        graph: &mut ConnectionGraph,
        src: &PortRegistry,
        source: Endpoint,
        dst: &PortRegistry,
        destination: Endpoint,
    ) -> Result<(), SimError> {
        graph
            .add(side(source, src, "a#0"), side(destination, dst, "b#1"))
            .map(|_| ())
    }

    const A: SystemId = SystemId(0);
    const B: SystemId = SystemId(1);

    #[test]
    fn matching_shapes_connect() {
        let (src, dst) = (source_ports(), destination_ports());
        let mut g = ConnectionGraph::new();
        connect(&mut g, &src, Endpoint::new(A, "y"), &dst, Endpoint::new(B, "u")).unwrap();
        connect(&mut g, &src, Endpoint::new(A, "v"), &dst, Endpoint::new(B, "uv")).unwrap();
        connect(
            &mut g,
            &src,
            Endpoint::element(A, "x", 1),
            &dst,
            Endpoint::new(B, "w"),
        )
        .unwrap();
        assert_eq!(g.len(), 3);
        assert_eq!(g.incoming(B).count(), 3);
        assert_eq!(g.iter().next().unwrap().to_string(), "a#0.y -> b#1.u");
    }

    #[test]
    fn vector_into_scalar_is_kind_mismatch() {
        let (src, dst) = (source_ports(), destination_ports());
        let mut g = ConnectionGraph::new();
        let err = connect(&mut g, &src, Endpoint::new(A, "v"), &dst, Endpoint::new(B, "u"))
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidConnection {
                source: PortError::KindMismatch { .. },
                ..
            }
        ));
        assert!(g.is_empty());
    }

    #[test]
    fn vector_length_mismatch_is_shape_mismatch() {
        let (src, dst) = (source_ports(), destination_ports());
        let mut g = ConnectionGraph::new();
        let err = connect(&mut g, &src, Endpoint::new(A, "x"), &dst, Endpoint::new(B, "uv"))
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidConnection {
                source: PortError::ShapeMismatch {
                    expected: 3,
                    found: 2,
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn scalar_into_vector_element() {
        let (src, dst) = (source_ports(), destination_ports());
        let mut g = ConnectionGraph::new();
        connect(
            &mut g,
            &src,
            Endpoint::new(A, "y"),
            &dst,
            Endpoint::element(B, "uv", 2),
        )
        .unwrap();
        let err = connect(
            &mut g,
            &src,
            Endpoint::new(A, "y"),
            &dst,
            Endpoint::element(B, "uv", 3),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidConnection {
                source: PortError::IndexOutOfRange { index: 3, len: 3, .. },
                ..
            }
        ));
    }

    #[test]
    fn unknown_ports_rejected() {
        let (src, dst) = (source_ports(), destination_ports());
        let mut g = ConnectionGraph::new();
        let err = connect(&mut g, &src, Endpoint::new(A, "nope"), &dst, Endpoint::new(B, "u"))
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidConnection {
                source: PortError::UnknownPort { .. },
                ..
            }
        ));
        // Destinations must be inputs.
        let err = connect(&mut g, &src, Endpoint::new(A, "y"), &src, Endpoint::new(B, "y"))
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidConnection {
                source: PortError::UnknownPort {
                    kind: PortKind::Input,
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn index_on_scalar_source_rejected() {
        let (src, dst) = (source_ports(), destination_ports());
        let mut g = ConnectionGraph::new();
        let err = connect(
            &mut g,
            &src,
            Endpoint::element(A, "y", 0),
            &dst,
            Endpoint::new(B, "u"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidConnection {
                source: PortError::NotIndexable { .. },
                ..
            }
        ));
    }

    #[test]
    fn overlapping_destinations_rejected() {
        let (src, dst) = (source_ports(), destination_ports());
        let mut g = ConnectionGraph::new();
        connect(&mut g, &src, Endpoint::new(A, "y"), &dst, Endpoint::new(B, "u")).unwrap();
        let err = connect(&mut g, &src, Endpoint::new(A, "y"), &dst, Endpoint::new(B, "u"))
            .unwrap_err();
        assert_eq!(
            err,
            SimError::DuplicateDestination {
                destination: "b#1.u".into(),
                existing: "a#0.y".into(),
            }
        );

        connect(
            &mut g,
            &src,
            Endpoint::element(A, "v", 0),
            &dst,
            Endpoint::element(B, "uv", 0),
        )
        .unwrap();
        connect(
            &mut g,
            &src,
            Endpoint::element(A, "v", 1),
            &dst,
            Endpoint::element(B, "uv", 1),
        )
        .unwrap();
        // Same element again, then the whole port over existing elements.
        assert!(matches!(
            connect(
                &mut g,
                &src,
                Endpoint::element(A, "v", 2),
                &dst,
                Endpoint::element(B, "uv", 1),
            ),
            Err(SimError::DuplicateDestination { .. })
        ));
        assert!(matches!(
            connect(&mut g, &src, Endpoint::new(A, "v"), &dst, Endpoint::new(B, "uv")),
            Err(SimError::DuplicateDestination { .. })
        ));
        assert_eq!(g.len(), 3);
    }

    #[test]
    fn state_sources_impose_no_order() {
        let (src, dst) = (source_ports(), destination_ports());
        let mut g = ConnectionGraph::new();
        connect(
            &mut g,
            &src,
            Endpoint::element(A, "x", 0),
            &dst,
            Endpoint::new(B, "u"),
        )
        .unwrap();
        connect(
            &mut g,
            &src,
            Endpoint::element(A, "dx", 0),
            &dst,
            Endpoint::new(B, "w"),
        )
        .unwrap();
        let deps: Vec<_> = g.dependencies().collect();
        assert_eq!(deps, vec![(A, B)]);
        assert_eq!(g.iter().next().unwrap().source_kind(), PortKind::State);
    }

    #[test]
    fn sources_resolve_outputs_before_states() {
        let mut src = PortRegistry::new();
        src.add_state("x", "dx").unwrap();
        src.add_output("x").unwrap();
        let dst = destination_ports();
        let mut g = ConnectionGraph::new();
        connect(&mut g, &src, Endpoint::new(A, "x"), &dst, Endpoint::new(B, "u")).unwrap();
        assert_eq!(g.iter().next().unwrap().source_kind(), PortKind::Output);
    }
}
