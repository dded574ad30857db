use std::path::Path;

use crate::error::{CalcError, Result};

use super::output;

/// Start of the structure block in a GULP dump file.
pub const OPTIONS_MARKER: &str = "# Options";
/// First record after the structure block.
pub const ENERGY_RECORD: &str = "totalenergy";

/// True when a report stopped on the optimiser's function-call limit, the
/// case the dump-splice continuation exists for.
pub fn hit_cycle_limit(report: &str) -> bool {
    report.contains(output::CYCLE_LIMIT)
}

/// Cuts the structure block out of a dump file: everything from the
/// `# Options` line up to (excluding) the `totalenergy` record.
pub fn extract_structure_block(dump: &str, origin: &Path) -> Result<String> {
    let lines: Vec<&str> = dump.lines().collect();

    let start = lines
        .iter()
        .position(|l| l.contains(OPTIONS_MARKER))
        .ok_or_else(|| CalcError::BadDump {
            path: origin.to_path_buf(),
            reason: format!("no '{}' line", OPTIONS_MARKER),
        })?;
    let end = lines
        .iter()
        .position(|l| l.contains(ENERGY_RECORD))
        .ok_or_else(|| CalcError::BadDump {
            path: origin.to_path_buf(),
            reason: format!("no '{}' record", ENERGY_RECORD),
        })?;
    if end <= start {
        return Err(CalcError::BadDump {
            path: origin.to_path_buf(),
            reason: "energy record precedes the options block".to_string(),
        });
    }

    let mut block = lines[start..end].join("\n");
    block.push('\n');
    Ok(block)
}

/// Composes a continuation deck: the caller's header (keywords, title,
/// options), a dump directive so the next run can also be continued, then
/// the structure block recovered from the previous run's dump.
pub fn compose_restart_deck(header: &str, dump: &str, origin: &Path, dump_target: &str) -> Result<String> {
    let block = extract_structure_block(dump, origin)?;

    let mut s = String::with_capacity(header.len() + block.len() + 32);
    s.push_str(header);
    if !header.ends_with('\n') {
        s.push('\n');
    }
    s.push_str(&format!("\ndump {}\n", dump_target));
    s.push_str(&block);
    Ok(s)
}
