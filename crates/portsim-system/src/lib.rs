//! System trait and step context for portsim simulations.
//!
//! A [`System`] owns a [`PortRegistry`](portsim_core::PortRegistry) and an
//! evaluation routine. The engine calls the evaluation once per step with a
//! [`StepContext`] describing the current time.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod system;

pub use context::StepContext;
pub use system::{Evaluation, System};
