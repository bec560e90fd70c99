//! Core types for the portsim simulation kernel.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! port model shared by every other crate in the workspace: identifiers,
//! port kinds and arities, the shape-tagged [`Value`] type, the per-system
//! [`PortRegistry`], and the error types raised by port access.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod format;
pub mod id;
pub mod port;
pub mod registry;

pub use error::{PortError, SystemError};
pub use id::{StepId, SystemId};
pub use port::{Arity, FixedVector, PortDecl, PortKind, PortRef, Value};
pub use registry::{Port, PortGroup, PortRegistry};
