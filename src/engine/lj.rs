use log::warn;
use nalgebra::Vector3;

use crate::core::domain::Structure;
use crate::engine::calculator::{Calculator, Properties};
use crate::error::Result;

/// In-process Lennard-Jones pair potential. Exists so the calculator
/// interface can be exercised without an external program; it treats every
/// structure as a gas-phase cluster.
#[derive(Debug, Clone, Copy)]
pub struct LennardJones {
    /// Energy constant (eV).
    pub epsilon: f64,
    /// Distance constant (Å).
    pub sigma: f64,
}

impl Default for LennardJones {
    fn default() -> Self {
        Self { epsilon: 1.0, sigma: 1.0 }
    }
}

impl LennardJones {
    // vij
    fn pair_energy(&self, r: f64) -> f64 {
        let s6 = (self.sigma / r).powi(6);
        4.0 * self.epsilon * (s6 * s6 - s6)
    }

    // dvij
    fn pair_gradient(&self, r: f64) -> f64 {
        let s6 = (self.sigma / r).powi(6);
        24.0 * self.epsilon * (s6 - 2.0 * s6 * s6) / r
    }
}

impl Calculator for LennardJones {
    fn name(&self) -> &str {
        "Lennard-Jones"
    }

    fn compute(&mut self, structure: &Structure) -> Result<Properties> {
        if structure.lattice.is_some() {
            warn!("Lennard-Jones backend ignores the periodic cell");
        }

        let n = structure.natoms();
        let mut energy = 0.0;
        let mut forces = vec![Vector3::zeros(); n];

        for i in 0..n {
            for j in 0..i {
                let rij = structure.atoms[j].position - structure.atoms[i].position;
                let r = rij.norm();
                energy += self.pair_energy(r);

                let g = self.pair_gradient(r) / r;
                forces[i] += g * rij;
                forces[j] -= g * rij;
            }
        }

        Ok(Properties {
            energy: Some(energy),
            forces: Some(forces),
            converged: true,
            ..Default::default()
        })
    }
}
