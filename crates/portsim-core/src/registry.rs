//! Per-system port storage: [`PortRegistry`], [`PortGroup`], and [`Port`].
//!
//! A registry owns five independent namespaces, one per [`PortKind`]. Every
//! write is checked against the arity fixed at declaration, so a vector port
//! can never change length and a scalar port can never hold a vector.
//!
//! Ports are declared while a system is being constructed. Once the system is
//! registered with a simulation the registry is [frozen](PortRegistry::freeze):
//! values remain writable but new declarations are rejected.

use std::fmt;

use indexmap::IndexMap;

use crate::error::PortError;
use crate::format::render_value;
use crate::port::{Arity, PortDecl, PortKind, PortRef, Value};

// ── Port ───────────────────────────────────────────────────────────

/// A declared port: fixed arity, current value, default, and documentation.
#[derive(Clone, Debug, PartialEq)]
pub struct Port {
    name: String,
    kind: PortKind,
    arity: Arity,
    value: Value,
    default: Value,
    doc: String,
}

impl Port {
    /// The port name, unique within its namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The namespace this port belongs to.
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// The arity fixed at declaration.
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// The current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The declared default value.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// The documentation string.
    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// Numeric storage as a slice (scalars have length 1). `None` for text.
    pub fn values(&self) -> Option<&[f64]> {
        self.value.as_slice()
    }

    fn check_assign(&self, value: &Value) -> Result<(), PortError> {
        check_arity(&self.name, self.arity, value.arity())
    }

    fn assign(&mut self, value: Value) -> Result<(), PortError> {
        self.check_assign(&value)?;
        self.value = value;
        Ok(())
    }

    fn element_slot(&self, index: usize) -> Result<usize, PortError> {
        match self.arity {
            Arity::Vector { len } if index < len => Ok(index),
            Arity::Vector { len } => Err(PortError::IndexOutOfRange {
                port: self.name.clone(),
                index,
                len,
            }),
            arity => Err(PortError::NotIndexable {
                port: self.name.clone(),
                arity,
            }),
        }
    }
}

fn check_arity(port: &str, expected: Arity, found: Arity) -> Result<(), PortError> {
    match (expected, found) {
        (Arity::Scalar, Arity::Scalar) | (Arity::Text, Arity::Text) => Ok(()),
        (Arity::Vector { len: expected }, Arity::Vector { len: found }) => {
            if expected == found {
                Ok(())
            } else {
                Err(PortError::ShapeMismatch {
                    port: port.to_string(),
                    expected,
                    found,
                })
            }
        }
        (expected, found) => Err(PortError::KindMismatch {
            port: port.to_string(),
            expected,
            found,
        }),
    }
}

// ── PortGroup ──────────────────────────────────────────────────────

/// One namespace of a registry (all inputs, all outputs, ...).
///
/// Ports are kept in declaration order. The `Display` impl renders the
/// introspection listing, one column-aligned row per port:
///
/// ```
/// use portsim_core::{PortDecl, PortRegistry};
///
/// let mut ports = PortRegistry::new();
/// ports
///     .add_input(PortDecl::scalar("b").with_default(1.0).with_doc("Scaling coefficient"))
///     .unwrap();
/// assert_eq!(
///     ports.inputs().to_string(),
///     "         b       1.0  Scaling coefficient\n"
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PortGroup {
    kind: PortKind,
    ports: IndexMap<String, Port>,
}

impl PortGroup {
    fn new(kind: PortKind) -> Self {
        Self {
            kind,
            ports: IndexMap::new(),
        }
    }

    /// The namespace of this group.
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// Number of declared ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Whether no ports are declared.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Whether `name` is declared in this namespace.
    pub fn contains(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }

    /// Declared names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.ports.keys().map(String::as_str)
    }

    /// Declared ports, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Port> + '_ {
        self.ports.values()
    }

    /// Look up a port by name.
    pub fn port(&self, name: &str) -> Result<&Port, PortError> {
        self.ports.get(name).ok_or_else(|| self.unknown(name))
    }

    /// A handle for `name`, for repeated access without hashing.
    pub fn port_ref(&self, name: &str) -> Result<PortRef, PortError> {
        self.ports
            .get_index_of(name)
            .map(|index| PortRef {
                kind: self.kind,
                index: index as u32,
            })
            .ok_or_else(|| self.unknown(name))
    }

    /// The current value of `name`.
    pub fn get(&self, name: &str) -> Result<&Value, PortError> {
        self.port(name).map(Port::value)
    }

    /// The current value of a scalar port.
    pub fn scalar(&self, name: &str) -> Result<f64, PortError> {
        let port = self.port(name)?;
        match port.value {
            Value::Scalar(x) => Ok(x),
            ref other => Err(PortError::KindMismatch {
                port: port.name.clone(),
                expected: Arity::Scalar,
                found: other.arity(),
            }),
        }
    }

    /// The current elements of a vector port.
    pub fn vector(&self, name: &str) -> Result<&[f64], PortError> {
        let port = self.port(name)?;
        match &port.value {
            Value::Vector(v) => Ok(v.as_slice()),
            other => Err(PortError::KindMismatch {
                port: port.name.clone(),
                expected: port.arity,
                found: other.arity(),
            }),
        }
    }

    /// The current value of a text port.
    pub fn text(&self, name: &str) -> Result<&str, PortError> {
        let port = self.port(name)?;
        match &port.value {
            Value::Text(s) => Ok(s),
            other => Err(PortError::KindMismatch {
                port: port.name.clone(),
                expected: Arity::Text,
                found: other.arity(),
            }),
        }
    }

    /// One element of a vector port.
    pub fn get_element(&self, name: &str, index: usize) -> Result<f64, PortError> {
        let port = self.port(name)?;
        let slot = port.element_slot(index)?;
        Ok(port.values().map(|v| v[slot]).unwrap_or_default())
    }

    /// Replace the value of `name`.
    ///
    /// # Errors
    ///
    /// - [`PortError::UnknownPort`] if `name` is not declared here.
    /// - [`PortError::ShapeMismatch`] if a vector of the wrong length is offered.
    /// - [`PortError::KindMismatch`] if a scalar is offered to a vector port,
    ///   a vector to a scalar port, or numeric and text are mixed.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), PortError> {
        let kind = self.kind;
        let port = self.ports.get_mut(name).ok_or_else(|| PortError::UnknownPort {
            kind,
            name: name.to_string(),
        })?;
        port.assign(value.into())
    }

    /// Replace one element of a vector port.
    pub fn set_element(&mut self, name: &str, index: usize, value: f64) -> Result<(), PortError> {
        let kind = self.kind;
        let port = self.ports.get_mut(name).ok_or_else(|| PortError::UnknownPort {
            kind,
            name: name.to_string(),
        })?;
        let slot = port.element_slot(index)?;
        if let Some(values) = port.value.as_mut_slice() {
            values[slot] = value;
        }
        Ok(())
    }

    /// Restore every port in this group to its default.
    pub fn reset(&mut self) {
        for port in self.ports.values_mut() {
            port.value = port.default.clone();
        }
    }

    fn unknown(&self, name: &str) -> PortError {
        PortError::UnknownPort {
            kind: self.kind,
            name: name.to_string(),
        }
    }

    fn at(&self, index: u32) -> Option<&Port> {
        self.ports.get_index(index as usize).map(|(_, p)| p)
    }

    fn at_mut(&mut self, index: u32) -> Option<&mut Port> {
        self.ports.get_index_mut(index as usize).map(|(_, p)| p)
    }

    fn insert(&mut self, decl: PortDecl) -> Result<PortRef, PortError> {
        if self.ports.contains_key(&decl.name) {
            return Err(PortError::DuplicatePort {
                kind: self.kind,
                name: decl.name,
            });
        }
        let default = match decl.default {
            Some(default) => {
                check_arity(&decl.name, decl.arity, default.arity())?;
                default
            }
            None => Value::zero(decl.arity),
        };
        let index = self.ports.len() as u32;
        let port = Port {
            name: decl.name.clone(),
            kind: self.kind,
            arity: decl.arity,
            value: default.clone(),
            default,
            doc: decl.doc,
        };
        self.ports.insert(decl.name, port);
        Ok(PortRef {
            kind: self.kind,
            index,
        })
    }
}

impl fmt::Display for PortGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for port in self.ports.values() {
            writeln!(
                f,
                "{:>10}  {:>8}  {}",
                port.name,
                render_value(&port.default),
                port.doc
            )?;
        }
        Ok(())
    }
}

// ── PortRegistry ───────────────────────────────────────────────────

/// All ports of one system, split into five independent namespaces.
///
/// State and derivative ports are always declared together through
/// [`add_state`](Self::add_state), so the n-th state is paired with the n-th
/// derivative and both share one arity.
///
/// ```
/// use portsim_core::{PortDecl, PortRegistry};
///
/// let mut ports = PortRegistry::new();
/// ports.add_input(PortDecl::vector("input1", 3)).unwrap();
/// ports.add_output(PortDecl::vector("output1", 3)).unwrap();
///
/// ports.inputs_mut().set("input1", [1.0, 2.0, 3.0]).unwrap();
/// assert_eq!(ports.inputs().vector("input1").unwrap(), &[1.0, 2.0, 3.0]);
/// assert!(ports.inputs_mut().set("input1", [1.0, 2.0]).is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PortRegistry {
    groups: [PortGroup; 5],
    frozen: bool,
}

impl Default for PortRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PortRegistry {
    /// An empty, open registry.
    pub fn new() -> Self {
        Self {
            groups: PortKind::ALL.map(PortGroup::new),
            frozen: false,
        }
    }

    // ── Declaration ────────────────────────────────────────────

    /// Declare a port in the `kind` namespace.
    ///
    /// Derivatives cannot be declared on their own; use
    /// [`add_state`](Self::add_state). Text ports are only allowed among
    /// parameters.
    pub fn declare(&mut self, kind: PortKind, decl: PortDecl) -> Result<PortRef, PortError> {
        self.check_open(&decl)?;
        if kind == PortKind::Derivative
            || (decl.arity == Arity::Text && kind != PortKind::Parameter)
        {
            return Err(PortError::InvalidDeclaration {
                kind,
                port: decl.name,
                arity: decl.arity,
            });
        }
        self.groups[kind.slot()].insert(decl)
    }

    /// Declare an input port.
    pub fn add_input(&mut self, decl: impl Into<PortDecl>) -> Result<PortRef, PortError> {
        self.declare(PortKind::Input, decl.into())
    }

    /// Declare an output port.
    pub fn add_output(&mut self, decl: impl Into<PortDecl>) -> Result<PortRef, PortError> {
        self.declare(PortKind::Output, decl.into())
    }

    /// Declare a parameter port.
    pub fn add_parameter(&mut self, decl: impl Into<PortDecl>) -> Result<PortRef, PortError> {
        self.declare(PortKind::Parameter, decl.into())
    }

    /// Declare a state and its paired derivative.
    ///
    /// The derivative takes the state's arity and documentation and starts
    /// at zero. Nothing is declared if either name is already taken.
    pub fn add_state(
        &mut self,
        state: impl Into<PortDecl>,
        derivative: impl Into<String>,
    ) -> Result<(PortRef, PortRef), PortError> {
        let state = state.into();
        self.check_open(&state)?;
        if state.arity == Arity::Text {
            return Err(PortError::InvalidDeclaration {
                kind: PortKind::State,
                port: state.name,
                arity: state.arity,
            });
        }
        let derivative = PortDecl {
            name: derivative.into(),
            arity: state.arity,
            default: None,
            doc: state.doc.clone(),
        };
        let derivatives = &self.groups[PortKind::Derivative.slot()];
        if derivatives.contains(&derivative.name) {
            return Err(PortError::DuplicatePort {
                kind: PortKind::Derivative,
                name: derivative.name,
            });
        }
        let state_ref = self.groups[PortKind::State.slot()].insert(state)?;
        let derivative_ref = self.groups[PortKind::Derivative.slot()].insert(derivative)?;
        Ok((state_ref, derivative_ref))
    }

    /// Close the registry to further declarations. Values stay writable.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Whether declarations are closed.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn check_open(&self, decl: &PortDecl) -> Result<(), PortError> {
        if self.frozen {
            return Err(PortError::DeclarationClosed {
                port: decl.name.clone(),
            });
        }
        if decl.arity == (Arity::Vector { len: 0 }) {
            return Err(PortError::ZeroLengthVector {
                port: decl.name.clone(),
            });
        }
        Ok(())
    }

    // ── Namespaces ─────────────────────────────────────────────

    /// The namespace for `kind`.
    pub fn group(&self, kind: PortKind) -> &PortGroup {
        &self.groups[kind.slot()]
    }

    /// The namespace for `kind`, mutably.
    pub fn group_mut(&mut self, kind: PortKind) -> &mut PortGroup {
        &mut self.groups[kind.slot()]
    }

    /// Input ports.
    pub fn inputs(&self) -> &PortGroup {
        self.group(PortKind::Input)
    }

    /// Input ports, mutably.
    pub fn inputs_mut(&mut self) -> &mut PortGroup {
        self.group_mut(PortKind::Input)
    }

    /// Output ports.
    pub fn outputs(&self) -> &PortGroup {
        self.group(PortKind::Output)
    }

    /// Output ports, mutably.
    pub fn outputs_mut(&mut self) -> &mut PortGroup {
        self.group_mut(PortKind::Output)
    }

    /// State ports.
    pub fn states(&self) -> &PortGroup {
        self.group(PortKind::State)
    }

    /// State ports, mutably.
    pub fn states_mut(&mut self) -> &mut PortGroup {
        self.group_mut(PortKind::State)
    }

    /// Derivative ports.
    pub fn derivatives(&self) -> &PortGroup {
        self.group(PortKind::Derivative)
    }

    /// Derivative ports, mutably.
    pub fn derivatives_mut(&mut self) -> &mut PortGroup {
        self.group_mut(PortKind::Derivative)
    }

    /// Parameter ports.
    pub fn parameters(&self) -> &PortGroup {
        self.group(PortKind::Parameter)
    }

    /// Parameter ports, mutably.
    pub fn parameters_mut(&mut self) -> &mut PortGroup {
        self.group_mut(PortKind::Parameter)
    }

    /// Find `name` in the first of `kinds` that declares it.
    pub fn find(&self, name: &str, kinds: &[PortKind]) -> Option<PortRef> {
        kinds
            .iter()
            .find_map(|&kind| self.group(kind).port_ref(name).ok())
    }

    /// Restore every port to its declared default.
    pub fn reset(&mut self) {
        for group in &mut self.groups {
            group.reset();
        }
    }

    // ── Access by handle ───────────────────────────────────────

    /// The port behind a handle.
    pub fn port_at(&self, r: PortRef) -> Result<&Port, PortError> {
        self.group(r.kind)
            .at(r.index)
            .ok_or_else(|| stale_ref(r))
    }

    fn port_at_mut(&mut self, r: PortRef) -> Result<&mut Port, PortError> {
        self.group_mut(r.kind)
            .at_mut(r.index)
            .ok_or_else(|| stale_ref(r))
    }

    /// Numeric storage behind a handle; scalars are a one-element slice.
    pub fn values_at(&self, r: PortRef) -> Result<&[f64], PortError> {
        let port = self.port_at(r)?;
        port.values().ok_or_else(|| PortError::KindMismatch {
            port: port.name.clone(),
            expected: Arity::Scalar,
            found: port.arity,
        })
    }

    /// Mutable numeric storage behind a handle. The length cannot change.
    pub fn values_at_mut(&mut self, r: PortRef) -> Result<&mut [f64], PortError> {
        let port = self.port_at_mut(r)?;
        let arity = port.arity;
        match port.value.as_mut_slice() {
            Some(values) => Ok(values),
            None => Err(PortError::KindMismatch {
                port: port.name.clone(),
                expected: Arity::Scalar,
                found: arity,
            }),
        }
    }

    /// The value of a scalar port.
    pub fn scalar_at(&self, r: PortRef) -> Result<f64, PortError> {
        let port = self.port_at(r)?;
        match port.value {
            Value::Scalar(x) => Ok(x),
            ref other => Err(PortError::KindMismatch {
                port: port.name.clone(),
                expected: Arity::Scalar,
                found: other.arity(),
            }),
        }
    }

    /// Write a scalar port.
    pub fn set_scalar_at(&mut self, r: PortRef, value: f64) -> Result<(), PortError> {
        self.port_at_mut(r)?.assign(Value::Scalar(value))
    }

    /// The elements of a vector port.
    pub fn vector_at(&self, r: PortRef) -> Result<&[f64], PortError> {
        let port = self.port_at(r)?;
        match &port.value {
            Value::Vector(v) => Ok(v.as_slice()),
            other => Err(PortError::KindMismatch {
                port: port.name.clone(),
                expected: port.arity,
                found: other.arity(),
            }),
        }
    }

    /// Overwrite the elements of a vector port.
    ///
    /// `values` must have exactly the declared length.
    pub fn set_vector_at(&mut self, r: PortRef, values: &[f64]) -> Result<(), PortError> {
        let port = self.port_at_mut(r)?;
        check_arity(&port.name, port.arity, Arity::Vector { len: values.len() })?;
        if let Some(slot) = port.value.as_mut_slice() {
            slot.copy_from_slice(values);
        }
        Ok(())
    }

    /// Every state paired with its derivative, in declaration order.
    ///
    /// Yields `(state, derivative)` storage of equal length.
    pub fn state_pairs_mut(&mut self) -> impl Iterator<Item = (&mut [f64], &[f64])> + '_ {
        let [_, _, states, derivatives, _] = &mut self.groups;
        states
            .ports
            .values_mut()
            .zip(derivatives.ports.values())
            .filter_map(|(state, derivative)| {
                Some((state.value.as_mut_slice()?, derivative.values()?))
            })
    }
}

fn stale_ref(r: PortRef) -> PortError {
    PortError::UnknownPort {
        kind: r.kind,
        name: format!("#{}", r.index),
    }
}
