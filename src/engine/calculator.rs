use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::core::domain::Structure;
use crate::error::{CalcError, Result};

/// The result of a physical evaluation. Every quantity is optional: a
/// backend reports what its run actually produced, nothing more.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    /// The potential energy (eV).
    pub energy: Option<f64>,
    /// Per-atom derivative vectors (eV/Å), one entry per atom of the input
    /// structure. Shell sites never appear here.
    pub forces: Option<Vec<Vector3<f64>>>,
    /// Stress in Voigt order xx yy zz yz xz xy (eV/Å³), already
    /// sign-flipped and divided by the cell volume.
    pub stress: Option<[f64; 6]>,
    /// Dipole moment (e·Å).
    pub dipole: Option<Vector3<f64>>,
    /// Optimiser cycles the run took.
    pub iterations: Option<usize>,
    /// Version string of the backend program.
    pub version: Option<String>,
    /// Whether the run satisfied its completion/convergence markers.
    pub converged: bool,
}

/// A generic interface for physics backends.
///
/// `compute` is the single entry point; the getters below are lazy
/// conveniences that recompute only when the implementation decides the
/// cached result no longer covers `structure`. A getter for a quantity the
/// run did not produce returns `CalcError::NotAvailable` rather than a
/// made-up zero.
pub trait Calculator {
    /// Returns the name of the backend (e.g. "GULP").
    fn name(&self) -> &str;

    /// Returns properties for `structure`, running the backend if required.
    fn compute(&mut self, structure: &Structure) -> Result<Properties>;

    // --- Lazy Getters ---

    fn potential_energy(&mut self, structure: &Structure) -> Result<f64> {
        self.compute(structure)?
            .energy
            .ok_or(CalcError::NotAvailable { quantity: "potential energy" })
    }

    fn forces(&mut self, structure: &Structure) -> Result<Vec<Vector3<f64>>> {
        self.compute(structure)?
            .forces
            .ok_or(CalcError::NotAvailable { quantity: "forces" })
    }

    fn stress(&mut self, structure: &Structure) -> Result<[f64; 6]> {
        self.compute(structure)?
            .stress
            .ok_or(CalcError::NotAvailable { quantity: "stress" })
    }

    fn dipole_moment(&mut self, structure: &Structure) -> Result<Vector3<f64>> {
        self.compute(structure)?
            .dipole
            .ok_or(CalcError::NotAvailable { quantity: "dipole moment" })
    }

    fn iteration_count(&mut self, structure: &Structure) -> Result<usize> {
        self.compute(structure)?
            .iterations
            .ok_or(CalcError::NotAvailable { quantity: "iteration count" })
    }

    fn version(&mut self, structure: &Structure) -> Result<String> {
        self.compute(structure)?
            .version
            .ok_or(CalcError::NotAvailable { quantity: "program version" })
    }
}
