//! Result recording for portsim simulations.
//!
//! A [`Recorder`] holds one channel per stored port. After every step the
//! engine samples each channel, tagging the value with the simulated time.
//! Recorded data is read back through [`Series`], a borrowed, restartable
//! view over the samples collected so far.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod recorder;
pub mod series;

pub use recorder::Recorder;
pub use series::{Sample, Series};
