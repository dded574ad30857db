use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use regex::Regex;

use crate::core::domain::{Atom, Lattice, Structure};
use crate::error::{CalcError, Result};

/// Reads a structure from an XYZ file.
///
/// The comment line may carry an extended-XYZ cell annotation,
/// `Lattice="ax ay az bx by bz cx cy cz"`, one row per cell vector.
pub fn read_xyz(path: &Path) -> Result<Structure> {
    let text = fs::read_to_string(path)?;
    parse_xyz(&text)
}

pub fn parse_xyz(text: &str) -> Result<Structure> {
    let mut lines = text.lines();

    let natoms: usize = lines
        .next()
        .ok_or_else(|| CalcError::InvalidFormat("empty XYZ document".to_string()))?
        .trim()
        .parse()
        .map_err(|_| CalcError::InvalidFormat("XYZ line 1 is not an atom count".to_string()))?;

    let comment = lines
        .next()
        .ok_or_else(|| CalcError::InvalidFormat("XYZ document has no comment line".to_string()))?;
    let lattice = parse_lattice_annotation(comment)?;

    let mut atoms = Vec::with_capacity(natoms);
    for _ in 0..natoms {
        let line = lines
            .next()
            .ok_or_else(|| CalcError::InvalidFormat("XYZ atom list is truncated".to_string()))?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(CalcError::InvalidFormat(format!("bad XYZ atom line: '{line}'")));
        }
        let mut coords = [0.0f64; 3];
        for (k, token) in parts[1..4].iter().enumerate() {
            coords[k] = token
                .parse()
                .map_err(|_| CalcError::InvalidFormat(format!("bad XYZ coordinate: '{token}'")))?;
        }
        atoms.push(Atom::new(parts[0], coords[0], coords[1], coords[2]));
    }

    Ok(Structure::new(atoms, lattice))
}

fn parse_lattice_annotation(comment: &str) -> Result<Option<Lattice>> {
    let re = Regex::new(r#"Lattice="([^"]+)""#).unwrap();
    let Some(caps) = re.captures(comment) else {
        return Ok(None);
    };

    let tokens: Vec<&str> = caps[1].split_whitespace().collect();
    if tokens.len() != 9 {
        return Err(CalcError::InvalidFormat(format!(
            "Lattice annotation holds {} numbers, expected 9",
            tokens.len()
        )));
    }
    let mut nums = [0.0f64; 9];
    for (k, token) in tokens.iter().enumerate() {
        nums[k] = token
            .parse()
            .map_err(|_| CalcError::InvalidFormat(format!("bad Lattice number: '{token}'")))?;
    }

    let lattice = Lattice::new(
        Vector3::new(nums[0], nums[1], nums[2]),
        Vector3::new(nums[3], nums[4], nums[5]),
        Vector3::new(nums[6], nums[7], nums[8]),
    )
    .ok_or_else(|| CalcError::InvalidFormat("Lattice annotation is singular".to_string()))?;

    Ok(Some(lattice))
}

/// Formats a structure as XYZ text; periodic cells go into the extended-XYZ
/// comment annotation.
pub fn format_xyz(structure: &Structure, comment: &str) -> String {
    let mut s = String::new();
    s.push_str(&format!("{}\n", structure.natoms()));

    if let Some(lat) = &structure.lattice {
        let mut cell = String::new();
        for i in 0..3 {
            let v = lat.vector(i);
            if i > 0 {
                cell.push(' ');
            }
            cell.push_str(&format!("{:.9} {:.9} {:.9}", v.x, v.y, v.z));
        }
        s.push_str(&format!("Lattice=\"{}\" {}\n", cell, comment));
    } else {
        s.push_str(&format!("{}\n", comment));
    }

    for atom in &structure.atoms {
        let p = &atom.position;
        s.push_str(&format!("{:<3} {:>15.9} {:>15.9} {:>15.9}\n", atom.symbol, p.x, p.y, p.z));
    }
    s
}

pub fn write_xyz(path: &Path, structure: &Structure, comment: &str) -> Result<()> {
    fs::write(path, format_xyz(structure, comment))?;
    Ok(())
}
