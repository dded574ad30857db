use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::domain::Structure;
use crate::engine::calculator::Properties;
use crate::error::{CalcError, Result};

use super::GulpSettings;

pub const SNAPSHOT_FORMAT_VERSION: &str = "1";

/// A completed run frozen to a JSON file. Loading one primes a calculator
/// cache, so property queries on the same structure and settings need no
/// new external run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: String,
    /// RFC 3339 timestamp of the save.
    pub saved_at: String,
    /// The input structure the run was performed for.
    pub structure: Structure,
    pub settings: GulpSettings,
    pub properties: Properties,
    /// Relaxed geometry, if the run produced one.
    pub relaxed: Option<Structure>,
    /// The run stopped on the optimiser's function-call limit.
    #[serde(default)]
    pub cycle_limit_hit: bool,
}

impl Snapshot {
    pub fn new(
        structure: Structure,
        settings: GulpSettings,
        properties: Properties,
        relaxed: Option<Structure>,
        cycle_limit_hit: bool,
    ) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION.to_string(),
            saved_at: Utc::now().to_rfc3339(),
            structure,
            settings,
            properties,
            relaxed,
            cycle_limit_hit,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(&fs::read_to_string(path)?)?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(CalcError::UnsupportedSnapshot(snapshot.format_version));
        }
        Ok(snapshot)
    }
}
