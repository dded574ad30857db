use nalgebra::{Point3, Vector3};

use regex::Regex;

use crate::error::{CalcError, Result};

// --- Report Markers ---
// Each marker anchors exactly one extraction rule below; rules never depend
// on each other's line positions.

pub const TOTAL_ENERGY: &str = "Total lattice energy";
pub const PRIMITIVE_ENERGY: &str = "Primitive unit cell";
pub const ENERGY_UNIT: &str = "eV";
pub const SITE_COUNT: &str = "Total number atoms/shells";
pub const DERIVATIVE_TABLE: &str = "Final internal derivatives :";
pub const STRAIN_MARKERS: [&str; 6] = [
    "dE/de1(xx)",
    "dE/de2(yy)",
    "dE/de3(zz)",
    "dE/de4(yz)",
    "dE/de5(xz)",
    "dE/de6(xy)",
];
pub const CYCLE: &str = "Cycle:";
pub const VERSION: &str = "* Version =";
pub const ENERGY_SECTION: &str = "Components of energy";
pub const OPTIMISATION_ACHIEVED: &str = "**** Optimisation achieved ****";
pub const CYCLE_LIMIT: &str = "**** Maximum number of function calls has been reached ****";
pub const FINAL_FRACTIONAL: &str = "Final fractional coordinates of atoms";
pub const FINAL_CARTESIAN: &str = "Final cartesian coordinates of atoms";
pub const FINAL_VECTORS: &str = "Final Cartesian lattice vectors (Angstroms) :";

/// Coordinate convention of a read-back geometry table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordKind {
    Fractional,
    Cartesian,
}

/// Everything one report can yield: one field per extraction rule, `None`
/// when the rule's marker never appears. A present-but-unparsable value is
/// an error, never a default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// Energy in eV; the textually last energy line wins.
    pub energy: Option<f64>,
    /// Raw first derivatives per core site (eV/Å); shells excluded.
    pub derivatives: Option<Vec<Vector3<f64>>>,
    /// Raw dE/de strain derivatives, Voigt order (eV per unit strain).
    pub strain_derivatives: Option<[f64; 6]>,
    /// Last optimiser cycle number seen.
    pub cycles: Option<usize>,
    /// Program version from the banner.
    pub version: Option<String>,
    /// Core + shell count the report declares for itself.
    pub sites: Option<usize>,
    /// The energy summary section was printed (the run reached the end).
    pub energy_section: bool,
    pub optimisation_achieved: bool,
    /// The optimiser ran out of function calls before converging.
    pub cycle_limit_hit: bool,
    /// Relaxed core positions from the last final-coordinates table.
    pub final_positions: Option<(CoordKind, Vec<Point3<f64>>)>,
    /// Relaxed cell, one row per cell vector.
    pub final_cell: Option<[[f64; 3]; 3]>,
}

/// Runs every extraction rule over a report. Rules are independent: a
/// missing marker leaves its field `None` without disturbing the others.
pub fn parse_report(text: &str) -> Result<Report> {
    let lines: Vec<&str> = text.lines().collect();

    let sites = extract_site_count(&lines)?;
    Ok(Report {
        energy: extract_energy(&lines)?,
        derivatives: extract_derivatives(&lines, sites)?,
        strain_derivatives: extract_strain_derivatives(&lines)?,
        cycles: extract_cycles(text)?,
        version: extract_version(&lines),
        sites,
        energy_section: text.contains(ENERGY_SECTION),
        optimisation_achieved: text.contains(OPTIMISATION_ACHIEVED),
        cycle_limit_hit: text.contains(CYCLE_LIMIT),
        final_positions: extract_final_positions(&lines)?,
        final_cell: extract_final_cell(&lines)?,
    })
}

fn parse_value(quantity: &'static str, token: &str) -> Result<f64> {
    token.parse().map_err(|_| CalcError::MalformedField {
        quantity,
        token: token.to_string(),
    })
}

/// Energy rule: a line containing `Total lattice energy` or `Primitive unit
/// cell` together with `eV`; the value is the second-to-last token (the last
/// is the unit). Later lines override earlier ones, so after a relaxation
/// the final energy is reported, not the starting one. Lines quoting other
/// units (kJ/mol) carry no `eV` and are skipped.
fn extract_energy(lines: &[&str]) -> Result<Option<f64>> {
    let mut energy = None;
    for line in lines {
        let marked = line.contains(ENERGY_UNIT)
            && (line.contains(TOTAL_ENERGY) || line.contains(PRIMITIVE_ENERGY));
        if !marked {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            return Err(CalcError::MalformedField {
                quantity: "energy",
                token: line.to_string(),
            });
        }
        energy = Some(parse_value("energy", parts[parts.len() - 2])?);
    }
    Ok(energy)
}

/// Site-count rule: `Total number atoms/shells = N`; the value follows the
/// equals sign. Counts cores and shells together, which is what the
/// derivative table's row total must match.
fn extract_site_count(lines: &[&str]) -> Result<Option<usize>> {
    let mut sites = None;
    for line in lines {
        if !line.contains(SITE_COUNT) {
            continue;
        }
        let token = line
            .split('=')
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .ok_or_else(|| CalcError::MalformedField {
                quantity: "site count",
                token: line.to_string(),
            })?;
        let n = token.parse().map_err(|_| CalcError::MalformedField {
            quantity: "site count",
            token: token.to_string(),
        })?;
        sites = Some(n);
    }
    Ok(sites)
}

/// Derivative rule: body rows of the last `Final internal derivatives`
/// table. Core rows contribute a vector from columns 4-6; shell rows only
/// count towards the row total, which is validated against the declared
/// site count when one was extracted.
fn extract_derivatives(lines: &[&str], sites: Option<usize>) -> Result<Option<Vec<Vector3<f64>>>> {
    let Some(start) = lines.iter().rposition(|l| l.contains(DERIVATIVE_TABLE)) else {
        return Ok(None);
    };

    let mut derivatives = Vec::new();
    let mut total_rows = 0usize;
    for row in table_rows(&lines[start + 1..])? {
        let parts: Vec<&str> = row.split_whitespace().collect();
        if parts.len() < 6 {
            return Err(CalcError::MalformedField {
                quantity: "derivative row",
                token: row.to_string(),
            });
        }
        total_rows += 1;
        match parts[2] {
            "c" => derivatives.push(Vector3::new(
                parse_value("derivative", parts[3])?,
                parse_value("derivative", parts[4])?,
                parse_value("derivative", parts[5])?,
            )),
            "s" => continue,
            other => {
                return Err(CalcError::MalformedField {
                    quantity: "site flag",
                    token: other.to_string(),
                })
            }
        }
    }

    if let Some(expected) = sites {
        if total_rows != expected {
            return Err(CalcError::TableMismatch {
                quantity: "derivative",
                expected,
                found: total_rows,
            });
        }
    }
    Ok(Some(derivatives))
}

/// Strain rule: each `dE/deN(..)` marker contributes the token that follows
/// it on its line. All six must appear or none; a partial set means a
/// mangled report.
fn extract_strain_derivatives(lines: &[&str]) -> Result<Option<[f64; 6]>> {
    let mut values = [None::<f64>; 6];
    for line in lines {
        for (slot, marker) in STRAIN_MARKERS.iter().enumerate() {
            let Some(pos) = line.find(marker) else { continue };
            let token = line[pos + marker.len()..]
                .split_whitespace()
                .next()
                .ok_or_else(|| CalcError::MalformedField {
                    quantity: "strain derivative",
                    token: line.to_string(),
                })?;
            values[slot] = Some(parse_value("strain derivative", token)?);
        }
    }

    if values.iter().all(|v| v.is_none()) {
        return Ok(None);
    }
    let mut out = [0.0f64; 6];
    for (slot, value) in values.iter().enumerate() {
        out[slot] = value.ok_or(CalcError::MarkerNotFound { marker: STRAIN_MARKERS[slot] })?;
    }
    Ok(Some(out))
}

/// Cycle rule: the number after the last `Cycle:` marker.
fn extract_cycles(text: &str) -> Result<Option<usize>> {
    let re = Regex::new(r"Cycle:\s+(\d+)").unwrap();
    let mut cycles = None;
    for caps in re.captures_iter(text) {
        let n = caps[1].parse().map_err(|_| CalcError::MalformedField {
            quantity: "cycle count",
            token: caps[1].to_string(),
        })?;
        cycles = Some(n);
    }
    Ok(cycles)
}

/// Version rule: first `* Version =` banner line; the token right after the
/// marker (trailing banner decoration is dropped).
fn extract_version(lines: &[&str]) -> Option<String> {
    for line in lines {
        if let Some(pos) = line.find(VERSION) {
            if let Some(token) = line[pos + VERSION.len()..].split_whitespace().next() {
                return Some(token.to_string());
            }
        }
    }
    None
}

/// Geometry read-back rule: the LAST final-coordinates table, core rows
/// only. Fractional and Cartesian tables share one layout; which one GULP
/// prints depends on the periodicity of the run.
fn extract_final_positions(lines: &[&str]) -> Result<Option<(CoordKind, Vec<Point3<f64>>)>> {
    let mut found = None;
    for (i, line) in lines.iter().enumerate().rev() {
        if line.contains(FINAL_FRACTIONAL) {
            found = Some((CoordKind::Fractional, i));
            break;
        }
        if line.contains(FINAL_CARTESIAN) {
            found = Some((CoordKind::Cartesian, i));
            break;
        }
    }
    let Some((kind, start)) = found else {
        return Ok(None);
    };

    let mut positions = Vec::new();
    for row in table_rows(&lines[start + 1..])? {
        let parts: Vec<&str> = row.split_whitespace().collect();
        if parts.len() < 6 {
            return Err(CalcError::MalformedField {
                quantity: "coordinate row",
                token: row.to_string(),
            });
        }
        // Skip shells (we only read back cores)
        if parts[2].starts_with('s') {
            continue;
        }
        positions.push(Point3::new(
            parse_value("coordinate", parts[3])?,
            parse_value("coordinate", parts[4])?,
            parse_value("coordinate", parts[5])?,
        ));
    }
    Ok(Some((kind, positions)))
}

/// Cell read-back rule: three numeric rows after the last
/// `Final Cartesian lattice vectors` marker.
fn extract_final_cell(lines: &[&str]) -> Result<Option<[[f64; 3]; 3]>> {
    let Some(start) = lines.iter().rposition(|l| l.contains(FINAL_VECTORS)) else {
        return Ok(None);
    };

    let mut rows = [[0.0f64; 3]; 3];
    let mut filled = 0;
    for line in &lines[start + 1..] {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(CalcError::MalformedField {
                quantity: "lattice vector row",
                token: line.to_string(),
            });
        }
        for (k, token) in parts.iter().enumerate() {
            rows[filled][k] = parse_value("lattice vector", token)?;
        }
        filled += 1;
        if filled == 3 {
            return Ok(Some(rows));
        }
    }
    Err(CalcError::MarkerNotFound { marker: FINAL_VECTORS })
}

/// Collects the body rows of a dashed GULP table. Layout is always: a rule
/// of dashes, header lines, a second rule, the body, a closing rule. Only
/// the body is returned.
fn table_rows<'a>(lines: &[&'a str]) -> Result<Vec<&'a str>> {
    let is_rule = |line: &str| {
        let t = line.trim();
        !t.is_empty() && t.chars().all(|c| c == '-')
    };

    let mut rules_seen = 0;
    let mut rows = Vec::new();
    for line in lines {
        if is_rule(line) {
            rules_seen += 1;
            if rules_seen == 3 {
                return Ok(rows);
            }
            continue;
        }
        if rules_seen == 2 {
            rows.push(*line);
        }
    }
    Err(CalcError::MarkerNotFound { marker: "table closing dashes" })
}
