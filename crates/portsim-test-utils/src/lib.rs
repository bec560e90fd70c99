//! Test fixture systems for portsim development.
//!
//! Small, deterministic [`System`](portsim_system::System) implementations
//! for exercising the engine: constant and vector sources, a gain, a
//! passthrough, an integrating accumulator, a discrete counter, a hook
//! probe, and a system that fails on demand.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    Accumulator, ConstantSource, DiscreteCounter, FailingSystem, Gain, HookProbe, Passthrough,
    VectorSource,
};

/// Whether `a` and `b` agree to within `tol`, relative to the larger
/// magnitude (absolute below 1).
pub fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * a.abs().max(b.abs()).max(1.0)
}

/// Element-wise [`close`] over two equal-length slices.
pub fn all_close(a: &[f64], b: &[f64], tol: f64) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| close(*x, *y, tol))
}
