//! Drive the GULP lattice-simulation program as a calculator backend:
//! serialize a structure to an input deck, launch the external process,
//! parse the textual report, and cache the computed properties until the
//! structure or settings change.

pub mod core;
pub mod engine;
pub mod error;

pub use error::{CalcError, Result};
