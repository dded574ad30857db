use log::warn;

use crate::core::domain::Structure;
use crate::error::{CalcError, Result};

use super::GulpSettings;

/// Resolves the per-atom species labels: base symbol plus any setup suffix.
/// Fails if a setup points past the end of the atom list.
pub fn resolve_labels(structure: &Structure, settings: &GulpSettings) -> Result<Vec<String>> {
    let natoms = structure.natoms();
    let mut labels: Vec<String> = structure.atoms.iter().map(|a| a.symbol.clone()).collect();

    for setup in &settings.setups {
        for &index in &setup.indices {
            if index >= natoms {
                return Err(CalcError::SetupOutOfRange { index, natoms });
            }
            labels[index].push_str(&setup.suffix);
        }
    }
    Ok(labels)
}

/// The deck header alone: keywords and title, no structure. A continuation
/// run keeps this part and takes its structure block from a dump file.
pub fn render_header(settings: &GulpSettings) -> String {
    let mut s = String::new();
    s.push_str(&settings.keywords.join(" "));
    s.push('\n');
    s.push_str("title\n");
    s.push_str(&settings.title);
    s.push('\n');
    s.push_str("end\n");
    s
}

/// Constructs the complete GULP input deck for one structure.
pub fn render_deck(structure: &Structure, settings: &GulpSettings) -> Result<String> {
    let labels = resolve_labels(structure, settings)?;

    let symbols = structure.unique_symbols();
    for species in settings.shells.keys() {
        if !symbols.contains(&species.as_str()) {
            warn!("shell charge for '{}' matches no atom in the structure", species);
        }
    }

    let mut s = String::with_capacity(1024);

    // 1. Header Keywords
    s.push_str(&settings.keywords.join(" "));
    s.push('\n');

    // 2. Title Block
    s.push_str("title\n");
    s.push_str(&settings.title);
    s.push('\n');
    s.push_str("end\n\n");

    // 3. Lattice Vectors (if periodic)
    if let Some(lat) = &structure.lattice {
        s.push_str("vectors\n");
        // GULP reads vectors as rows
        for i in 0..3 {
            let v = lat.vector(i);
            s.push_str(&format!("{:.9} {:.9} {:.9}\n", v.x, v.y, v.z));
        }
    }

    // 4. Coordinates. A species that carries a shell gets a shel row right
    // after its core row, at the same position.
    if let Some(lat) = &structure.lattice {
        s.push_str("fractional\n");
        for (atom, label) in structure.atoms.iter().zip(&labels) {
            let frac = lat.to_fractional(&atom.position);
            s.push_str(&format!("{:<4} core {:.9} {:.9} {:.9}\n", label, frac.x, frac.y, frac.z));
            if settings.shells.contains_key(atom.symbol.as_str()) {
                s.push_str(&format!("{:<4} shel {:.9} {:.9} {:.9}\n", label, frac.x, frac.y, frac.z));
            }
        }
    } else {
        s.push_str("cartesian\n");
        for (atom, label) in structure.atoms.iter().zip(&labels) {
            let p = atom.position;
            s.push_str(&format!("{:<4} core {:.9} {:.9} {:.9}\n", label, p.x, p.y, p.z));
            if settings.shells.contains_key(atom.symbol.as_str()) {
                s.push_str(&format!("{:<4} shel {:.9} {:.9} {:.9}\n", label, p.x, p.y, p.z));
            }
        }
    }

    // 5. Shell Charges
    if !settings.shells.is_empty() {
        s.push('\n');
        s.push_str("species\n");
        for (symbol, charge) in &settings.shells {
            s.push_str(&format!("{:<4} shel {:.6}\n", symbol, charge));
        }
    }

    // 6. Option Lines (potentials, dump directives, ...)
    if !settings.options.is_empty() {
        s.push('\n');
        for option in &settings.options {
            s.push_str(option);
            s.push('\n');
        }
    }

    Ok(s)
}
