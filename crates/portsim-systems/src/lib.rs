//! Reference systems for the portsim simulation kernel.
//!
//! Small, well-understood models that exercise the whole port contract:
//! scalar and vector inputs, states with derivatives, parameters, and
//! discrete evaluation.
//!
//! | System | Ports |
//! |--------|-------|
//! | [`Adder`] | `input1 + input2 -> output1` |
//! | [`Adder3D`] | element-wise sum of two 3-vectors |
//! | [`InOutTestSystem`] | copies inputs and states to outputs |
//! | [`MassSpringDamper`] | second-order oscillator with an `acceleration` output |
//! | [`VanDerPol`] | the Van der Pol oscillator |
//! | [`DiscretePid`] | sampled PID controller with output limiting and anti-windup |
//!
//! Every constructor declares its ports up front and returns the
//! declaration error, if any.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod adder;
pub mod discrete_pid;
pub mod inout;
pub mod mass_spring_damper;
pub mod van_der_pol;

pub use adder::{Adder, Adder3D};
pub use discrete_pid::DiscretePid;
pub use inout::InOutTestSystem;
pub use mass_spring_damper::MassSpringDamper;
pub use van_der_pol::VanDerPol;
