use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};

// --- Physics Types ---

/// A single atom: chemical symbol plus Cartesian position.
///
/// Equality is by value, which is what the calculator cache keys on: two
/// atoms are the same iff symbol and all three coordinates match exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub symbol: String,
    pub position: Point3<f64>, // Å
}

impl Atom {
    pub fn new(symbol: &str, x: f64, y: f64, z: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            position: Point3::new(x, y, z),
        }
    }
}

/// Defines the Periodic Boundary Conditions (if any).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    pub vectors: Matrix3<f64>, // Columns are a, b, c
    pub inverse: Matrix3<f64>, // Precomputed for fractional conversion
}

impl Lattice {
    /// Returns None for a singular (degenerate) cell.
    pub fn new(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Option<Self> {
        let vectors = Matrix3::from_columns(&[a, b, c]);
        let inverse = vectors.try_inverse()?;
        Some(Self { vectors, inverse })
    }

    /// Builds a lattice from three row-wise cell vectors, the layout used by
    /// structure files and program reports (row i holds the components of
    /// cell vector i).
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Option<Self> {
        Self::new(
            Vector3::from(rows[0]),
            Vector3::from(rows[1]),
            Vector3::from(rows[2]),
        )
    }

    /// Cell vector i (0 = a, 1 = b, 2 = c).
    pub fn vector(&self, i: usize) -> Vector3<f64> {
        self.vectors.column(i).into_owned()
    }

    pub fn to_fractional(&self, p: &Point3<f64>) -> Point3<f64> {
        let v = self.inverse * p.coords;
        Point3::from(v)
    }

    pub fn to_cartesian(&self, p: &Point3<f64>) -> Point3<f64> {
        let v = self.vectors * p.coords;
        Point3::from(v)
    }

    /// Cell volume in Å³.
    pub fn volume(&self) -> f64 {
        self.vectors.determinant().abs()
    }
}

// --- The Core Entity ---

/// An ordered list of atoms with an optional periodic cell. Atom order is
/// significant: input decks are written in it and per-atom results are
/// reported back in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub atoms: Vec<Atom>,
    pub lattice: Option<Lattice>,
}

impl Structure {
    pub fn new(atoms: Vec<Atom>, lattice: Option<Lattice>) -> Self {
        Self { atoms, lattice }
    }

    pub fn natoms(&self) -> usize {
        self.atoms.len()
    }

    /// Cell volume, if the structure is periodic.
    pub fn volume(&self) -> Option<f64> {
        self.lattice.as_ref().map(|l| l.volume())
    }

    /// Distinct symbols in first-appearance order.
    pub fn unique_symbols(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for atom in &self.atoms {
            if !seen.contains(&atom.symbol.as_str()) {
                seen.push(atom.symbol.as_str());
            }
        }
        seen
    }
}
