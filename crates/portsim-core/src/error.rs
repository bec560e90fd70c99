//! Error types for port access and system evaluation.
//!
//! [`PortError`] covers every failure of the port registry: unknown names,
//! duplicate declarations, shape and kind disagreements, and element indices
//! out of range. [`SystemError`] is what a system's evaluation returns; it
//! wraps port errors so `?` works inside `do_step`.

use crate::port::{Arity, PortKind};

/// Errors raised by port declaration and access.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PortError {
    /// The name is not declared in the requested namespace.
    #[error("unknown {kind} port '{name}'")]
    UnknownPort {
        /// Namespace that was searched.
        kind: PortKind,
        /// The missing name.
        name: String,
    },

    /// The name is already declared in that namespace.
    #[error("{kind} port '{name}' is already declared")]
    DuplicatePort {
        /// Namespace of the clash.
        kind: PortKind,
        /// The duplicated name.
        name: String,
    },

    /// A vector value's length disagrees with the declared length.
    #[error("port '{port}' expects {expected} elements, got {found}")]
    ShapeMismatch {
        /// Port being written or connected.
        port: String,
        /// Declared length.
        expected: usize,
        /// Length of the offered value.
        found: usize,
    },

    /// Scalar offered to a vector port, vector offered to a scalar port,
    /// or numeric and text mixed.
    #[error("port '{port}' is {expected}, got {found}")]
    KindMismatch {
        /// Port being written or connected.
        port: String,
        /// Declared arity.
        expected: Arity,
        /// Arity of the offered value.
        found: Arity,
    },

    /// Element index outside `[0, len)`.
    #[error("index {index} is out of range for port '{port}' of length {len}")]
    IndexOutOfRange {
        /// Port being indexed.
        port: String,
        /// The offending index.
        index: usize,
        /// Declared length.
        len: usize,
    },

    /// An element index was applied to a scalar or text port.
    #[error("port '{port}' is {arity} and has no elements")]
    NotIndexable {
        /// Port being indexed.
        port: String,
        /// Its declared arity.
        arity: Arity,
    },

    /// A vector port was declared with length zero.
    #[error("vector port '{port}' must have at least one element")]
    ZeroLengthVector {
        /// The port being declared.
        port: String,
    },

    /// A port was declared with an arity its namespace does not allow
    /// (text outside parameters) or a derivative was declared on its own.
    #[error("{kind} port '{port}' cannot be declared as {arity}")]
    InvalidDeclaration {
        /// Namespace of the declaration.
        kind: PortKind,
        /// The port being declared.
        port: String,
        /// The rejected arity.
        arity: Arity,
    },

    /// The registry was frozen when its system was registered.
    #[error("cannot declare port '{port}': declarations are closed")]
    DeclarationClosed {
        /// The port that was being declared.
        port: String,
    },
}

/// Errors returned from a system's evaluation.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SystemError {
    /// A port access inside the evaluation failed.
    #[error(transparent)]
    Port(#[from] PortError),

    /// The system's own computation failed.
    #[error("evaluation failed: {reason}")]
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// A non-finite value was produced.
    #[error("non-finite value in port '{port}'")]
    NonFinite {
        /// The port holding the value.
        port: String,
    },
}
