//! Port kinds, arities, values, and declarations.

use std::fmt;
use std::ops::{Deref, DerefMut};

use smallvec::SmallVec;

use crate::error::PortError;

// ── PortKind ───────────────────────────────────────────────────────

/// The namespace a port lives in.
///
/// Each kind is an independent namespace: an input and an output may share a
/// name without conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortKind {
    /// Written by connections, read by the owning system.
    Input,
    /// Written by the owning system's evaluation, read by connections.
    Output,
    /// Advanced by the integrator from its paired derivative.
    State,
    /// Written by evaluation; paired one-to-one with a state.
    Derivative,
    /// Configuration set by the user before or between runs.
    Parameter,
}

impl PortKind {
    /// All kinds, in registry storage order.
    pub const ALL: [PortKind; 5] = [
        PortKind::Input,
        PortKind::Output,
        PortKind::State,
        PortKind::Derivative,
        PortKind::Parameter,
    ];

    /// Kinds a connection may read from, in lookup order.
    pub const SOURCES: [PortKind; 3] = [PortKind::Output, PortKind::State, PortKind::Derivative];

    pub(crate) fn slot(self) -> usize {
        match self {
            Self::Input => 0,
            Self::Output => 1,
            Self::State => 2,
            Self::Derivative => 3,
            Self::Parameter => 4,
        }
    }

    /// Plural namespace label, as used in listings and error messages.
    pub fn namespace(self) -> &'static str {
        match self {
            Self::Input => "inputs",
            Self::Output => "outputs",
            Self::State => "states",
            Self::Derivative => "derivatives",
            Self::Parameter => "parameters",
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::State => "state",
            Self::Derivative => "derivative",
            Self::Parameter => "parameter",
        };
        f.write_str(s)
    }
}

// ── Arity ──────────────────────────────────────────────────────────

/// Shape of a port's value. Fixed at declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arity {
    /// A single `f64`.
    Scalar,
    /// A fixed-length vector of `f64`.
    Vector {
        /// Number of elements; never zero.
        len: usize,
    },
    /// A string. Only valid for parameters.
    Text,
}

impl Arity {
    /// Number of `f64` slots a value of this arity occupies.
    ///
    /// Text occupies none.
    pub fn width(&self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vector { len } => *len,
            Self::Text => 0,
        }
    }

    /// Whether values of this arity are numeric.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.write_str("scalar"),
            Self::Vector { len } => write!(f, "vector[{len}]"),
            Self::Text => f.write_str("text"),
        }
    }
}

// ── FixedVector ────────────────────────────────────────────────────

/// A vector value whose length is decided when it is built.
///
/// Short vectors (up to 4 elements) are stored inline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FixedVector(SmallVec<[f64; 4]>);

impl FixedVector {
    /// A vector of `len` zeros.
    pub fn zeros(len: usize) -> Self {
        Self(SmallVec::from_elem(0.0, len))
    }

    /// Build a vector from `values`, requiring exactly `len` elements.
    pub fn try_with_len<I>(values: I, len: usize) -> Result<Self, PortError>
    where
        I: IntoIterator<Item = f64>,
    {
        let v: SmallVec<[f64; 4]> = values.into_iter().collect();
        if v.len() != len {
            return Err(PortError::ShapeMismatch {
                port: String::from("<value>"),
                expected: len,
                found: v.len(),
            });
        }
        Ok(Self(v))
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// The elements as a mutable slice. The length cannot change.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.0
    }
}

impl Deref for FixedVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl DerefMut for FixedVector {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.0
    }
}

impl<const N: usize> From<[f64; N]> for FixedVector {
    fn from(values: [f64; N]) -> Self {
        Self(values.into_iter().collect())
    }
}

impl From<Vec<f64>> for FixedVector {
    fn from(values: Vec<f64>) -> Self {
        Self(SmallVec::from_vec(values))
    }
}

impl From<&[f64]> for FixedVector {
    fn from(values: &[f64]) -> Self {
        Self(SmallVec::from_slice(values))
    }
}

impl FromIterator<f64> for FixedVector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl PartialEq<[f64]> for FixedVector {
    fn eq(&self, other: &[f64]) -> bool {
        self.as_slice() == other
    }
}

impl<const N: usize> PartialEq<[f64; N]> for FixedVector {
    fn eq(&self, other: &[f64; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

// ── Value ──────────────────────────────────────────────────────────

/// A shape-tagged port value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A scalar value.
    Scalar(f64),
    /// A vector value.
    Vector(FixedVector),
    /// A text value.
    Text(String),
}

impl Value {
    /// The arity this value would fill.
    pub fn arity(&self) -> Arity {
        match self {
            Self::Scalar(_) => Arity::Scalar,
            Self::Vector(v) => Arity::Vector { len: v.len() },
            Self::Text(_) => Arity::Text,
        }
    }

    /// The zero value for `arity`: `0.0`, a zero vector, or an empty string.
    pub fn zero(arity: Arity) -> Self {
        match arity {
            Arity::Scalar => Self::Scalar(0.0),
            Arity::Vector { len } => Self::Vector(FixedVector::zeros(len)),
            Arity::Text => Self::Text(String::new()),
        }
    }

    /// The scalar, if this is one.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(x) => Some(*x),
            _ => None,
        }
    }

    /// The vector elements, if this is a vector.
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Self::Vector(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// The text, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric storage viewed as a slice. Scalars are a one-element slice.
    pub fn as_slice(&self) -> Option<&[f64]> {
        match self {
            Self::Scalar(x) => Some(std::slice::from_ref(x)),
            Self::Vector(v) => Some(v.as_slice()),
            Self::Text(_) => None,
        }
    }

    /// Mutable numeric storage. Scalars are a one-element slice.
    pub fn as_mut_slice(&mut self) -> Option<&mut [f64]> {
        match self {
            Self::Scalar(x) => Some(std::slice::from_mut(x)),
            Self::Vector(v) => Some(v.as_mut_slice()),
            Self::Text(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Scalar(x)
    }
}

impl From<FixedVector> for Value {
    fn from(v: FixedVector) -> Self {
        Self::Vector(v)
    }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(values: [f64; N]) -> Self {
        Self::Vector(values.into())
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Self::Vector(values.into())
    }
}

impl From<&[f64]> for Value {
    fn from(values: &[f64]) -> Self {
        Self::Vector(values.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ── PortRef ────────────────────────────────────────────────────────

/// A resolved handle to a declared port.
///
/// Returned by every declaration. Lookups through a `PortRef` skip the name
/// hash and are what `do_step` implementations should use on hot paths.
/// A `PortRef` is only meaningful for the registry that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub(crate) kind: PortKind,
    pub(crate) index: u32,
}

impl PortRef {
    /// The namespace of the referenced port.
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// Declaration index within its namespace.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

// ── PortDecl ───────────────────────────────────────────────────────

/// Declaration of a port: name, arity, optional default, and documentation.
///
/// ```
/// use portsim_core::{Arity, PortDecl};
///
/// let gain: PortDecl = "gain".into();
/// assert_eq!(gain.arity(), Arity::Scalar);
///
/// let pos = PortDecl::vector("position", 3).with_doc("Position in metres");
/// assert_eq!(pos.arity(), Arity::Vector { len: 3 });
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PortDecl {
    pub(crate) name: String,
    pub(crate) arity: Arity,
    pub(crate) default: Option<Value>,
    pub(crate) doc: String,
}

impl PortDecl {
    /// A scalar port defaulting to `0.0`.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::with_arity(name, Arity::Scalar)
    }

    /// A vector port of `len` elements defaulting to zeros.
    pub fn vector(name: impl Into<String>, len: usize) -> Self {
        Self::with_arity(name, Arity::Vector { len })
    }

    /// A text port defaulting to the empty string.
    pub fn text(name: impl Into<String>) -> Self {
        Self::with_arity(name, Arity::Text)
    }

    /// A port of arbitrary arity.
    pub fn with_arity(name: impl Into<String>, arity: Arity) -> Self {
        Self {
            name: name.into(),
            arity,
            default: None,
            doc: String::new(),
        }
    }

    /// Set the default value. Checked against the arity at declaration.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the documentation string shown in listings.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// The declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared arity.
    pub fn arity(&self) -> Arity {
        self.arity
    }
}

impl From<&str> for PortDecl {
    fn from(name: &str) -> Self {
        Self::scalar(name)
    }
}

impl From<String> for PortDecl {
    fn from(name: String) -> Self {
        Self::scalar(name)
    }
}
