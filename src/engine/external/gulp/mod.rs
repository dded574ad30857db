use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::domain::{Lattice, Structure};
use crate::engine::calculator::{Calculator, Properties};
use crate::error::{CalcError, Result};

use self::launch::{EnvLaunch, Launch};
use self::output::{CoordKind, Report};
use self::snapshot::Snapshot;

pub mod input;
pub mod launch;
pub mod output;
pub mod restart;
pub mod snapshot;

/// Keywords that turn a run into a relaxation; only such runs must print
/// the achieved marker to count as converged.
const RELAXATION_KEYWORDS: [&str; 5] = ["opti", "optimise", "grad", "gradient", "fit"];

/// Appends a suffix to the species label of specific atoms, so they can be
/// bound to their own potential entries (e.g. indices [0, 2] + "1" makes
/// those oxygens "O1" in the deck).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    pub indices: Vec<usize>,
    pub suffix: String,
}

/// One run's worth of configuration. Any field change makes the cached
/// result stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GulpSettings {
    /// Flags on the first deck line ("sing", "opti conp", ...).
    pub keywords: Vec<String>,
    /// Option lines appended after the structure (potentials, dump, ...).
    pub options: Vec<String>,
    /// Species that carry a shell, mapped to the shell charge (e).
    pub shells: BTreeMap<String, f64>,
    /// Label suffixes for specific atom indices.
    pub setups: Vec<Setup>,
    /// Base name of the `<stem>.gin` / `<stem>.gout` pair.
    pub stem: String,
    /// Title line inside the deck's title block.
    pub title: String,
    /// Directory all run files live in.
    pub directory: PathBuf,
}

impl Default for GulpSettings {
    fn default() -> Self {
        Self {
            keywords: vec!["sing".to_string()],
            options: Vec::new(),
            shells: BTreeMap::new(),
            setups: Vec::new(),
            stem: "gulp-job".to_string(),
            title: "gulp-driver run".to_string(),
            directory: PathBuf::from("."),
        }
    }
}

impl GulpSettings {
    /// True when the keywords ask for an optimisation or fit, i.e. the run
    /// only counts as converged once the achieved marker appears.
    pub fn requests_relaxation(&self) -> bool {
        self.keywords.iter().any(|k| RELAXATION_KEYWORDS.contains(&k.as_str()))
    }

    pub fn gin_path(&self) -> PathBuf {
        self.directory.join(format!("{}.gin", self.stem))
    }

    pub fn gout_path(&self) -> PathBuf {
        self.directory.join(format!("{}.gout", self.stem))
    }
}

/// A finished run: the inputs it was performed for plus everything parsed
/// out of its report.
#[derive(Debug, Clone)]
struct CachedRun {
    structure: Structure,
    settings: GulpSettings,
    properties: Properties,
    relaxed: Option<Structure>,
    cycle_limit_hit: bool,
}

/// The GULP backend: writes the input deck, launches the program, parses
/// the report, and caches the result until structure or settings change.
/// One instance drives one run directory; it is not thread-safe.
pub struct GulpCalculator {
    settings: GulpSettings,
    launcher: Box<dyn Launch>,
    cache: Option<CachedRun>,
    /// Completed external runs so far.
    run_counts: usize,
    /// Number capture files (gulp0.out, gulp1.out, ...) instead of
    /// overwriting a single one.
    track_output: bool,
    /// Base name of the stdout capture file.
    capture: String,
}

impl GulpCalculator {
    pub fn new(settings: GulpSettings) -> Self {
        Self::with_launcher(settings, Box::new(EnvLaunch))
    }

    /// Injects a custom launch mechanism. Tests use this to fake runs;
    /// queue systems can use it to wrap submissions.
    pub fn with_launcher(settings: GulpSettings, launcher: Box<dyn Launch>) -> Self {
        Self {
            settings,
            launcher,
            cache: None,
            run_counts: 0,
            track_output: false,
            capture: "gulp".to_string(),
        }
    }

    /// Builds a calculator whose run directory is a fresh scratch dir under
    /// the system temp dir, so parallel jobs cannot trample each other's
    /// files.
    pub fn sandboxed(mut settings: GulpSettings) -> Result<Self> {
        let dir = std::env::temp_dir().join(format!("gulp-run-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir)?;
        settings.directory = dir;
        Ok(Self::new(settings))
    }

    /// Restores a calculator from a saved snapshot; the cache is primed, so
    /// queries for the snapshot's structure run nothing.
    pub fn from_snapshot(path: &Path) -> Result<Self> {
        let snapshot = Snapshot::load(path)?;
        let mut calc = Self::new(snapshot.settings.clone());
        calc.cache = Some(CachedRun {
            structure: snapshot.structure,
            settings: snapshot.settings,
            properties: snapshot.properties,
            relaxed: snapshot.relaxed,
            cycle_limit_hit: snapshot.cycle_limit_hit,
        });
        Ok(calc)
    }

    /// Freezes the cached run to a JSON snapshot.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let run = self.cache.as_ref().ok_or(CalcError::NothingComputed)?;
        Snapshot::new(
            run.structure.clone(),
            run.settings.clone(),
            run.properties.clone(),
            run.relaxed.clone(),
            run.cycle_limit_hit,
        )
        .save(path)
    }

    pub fn settings(&self) -> &GulpSettings {
        &self.settings
    }

    /// Mutable access; edits take effect at the next staleness check.
    pub fn settings_mut(&mut self) -> &mut GulpSettings {
        &mut self.settings
    }

    pub fn set_track_output(&mut self, track: bool) {
        self.track_output = track;
    }

    pub fn run_counts(&self) -> usize {
        self.run_counts
    }

    /// Relaxed geometry read back from the last run, if it produced one.
    /// The structure handed to `compute` is never modified.
    pub fn relaxed_structure(&self) -> Option<&Structure> {
        self.cache.as_ref().and_then(|run| run.relaxed.as_ref())
    }

    /// Convergence verdict of the last run; None before any run.
    pub fn converged(&self) -> Option<bool> {
        self.cache.as_ref().map(|run| run.properties.converged)
    }

    /// True when the last run stopped on the optimiser's function-call
    /// limit; a dump-splice continuation (see [`restart`]) can resume it.
    pub fn stopped_on_cycle_limit(&self) -> bool {
        self.cache.as_ref().map_or(false, |run| run.cycle_limit_hit)
    }

    /// True when a fresh external run is needed for `structure`: nothing is
    /// cached, the structure or settings changed by value, or the previous
    /// run never converged.
    pub fn calculation_required(&self, structure: &Structure) -> bool {
        match &self.cache {
            None => true,
            Some(run) => {
                run.structure != *structure
                    || run.settings != self.settings
                    || !run.properties.converged
            }
        }
    }

    /// Removes the input/report pair of the current stem. Best effort:
    /// missing files are not an error.
    pub fn clean(&self) {
        for path in [self.settings.gin_path(), self.settings.gout_path()] {
            let _ = fs::remove_file(path);
        }
    }

    fn capture_path(&self) -> PathBuf {
        let name = if self.track_output {
            format!("{}{}.out", self.capture, self.run_counts)
        } else {
            format!("{}.out", self.capture)
        };
        self.settings.directory.join(name)
    }

    /// One full run: serialize, launch, parse, cache.
    fn calculate(&mut self, structure: &Structure) -> Result<()> {
        // 1. Serialize the input deck
        fs::create_dir_all(&self.settings.directory)?;
        let deck = input::render_deck(structure, &self.settings)?;
        fs::write(self.settings.gin_path(), &deck)?;
        debug!("wrote input deck {:?}", self.settings.gin_path());

        // 2. Launch and wait
        let capture = self.capture_path();
        self.launcher.launch(&self.settings.directory, &self.settings.stem, &capture)?;
        self.run_counts += 1;

        // 3. Parse the report
        let text = fs::read_to_string(self.settings.gout_path())?;
        let report = output::parse_report(&text)?;

        // 4. Assemble the cached result
        let relaxed = self.read_back_geometry(structure, &report)?;
        let properties = self.assemble(structure, relaxed.as_ref(), &report)?;
        if properties.converged {
            info!(
                "run {} finished: energy {:?} eV, {} cycles",
                self.run_counts, properties.energy, report.cycles.unwrap_or(0)
            );
        } else {
            warn!("run {} did not converge; next query will rerun it", self.run_counts);
        }

        self.cache = Some(CachedRun {
            structure: structure.clone(),
            settings: self.settings.clone(),
            properties,
            relaxed,
            cycle_limit_hit: report.cycle_limit_hit,
        });
        Ok(())
    }

    /// Rebuilds a full structure from the report's final coordinates (and
    /// final cell, when the run relaxed it). Single-point runs return None.
    fn read_back_geometry(&self, structure: &Structure, report: &Report) -> Result<Option<Structure>> {
        if !self.settings.requests_relaxation() {
            return Ok(None);
        }
        let Some((kind, positions)) = &report.final_positions else {
            return Ok(None);
        };

        if positions.len() != structure.natoms() {
            return Err(CalcError::TableMismatch {
                quantity: "final coordinates",
                expected: structure.natoms(),
                found: positions.len(),
            });
        }

        let lattice = match report.final_cell {
            Some(rows) => Some(Lattice::from_rows(rows).ok_or_else(|| {
                CalcError::InvalidFormat("final lattice vectors are singular".to_string())
            })?),
            None => structure.lattice.clone(),
        };

        let mut atoms = structure.atoms.clone();
        for (atom, position) in atoms.iter_mut().zip(positions) {
            atom.position = match kind {
                CoordKind::Fractional => {
                    let lat = lattice
                        .as_ref()
                        .ok_or(CalcError::MissingCell { quantity: "fractional read-back" })?;
                    lat.to_cartesian(position)
                }
                CoordKind::Cartesian => *position,
            };
        }
        Ok(Some(Structure::new(atoms, lattice)))
    }

    fn assemble(
        &self,
        structure: &Structure,
        relaxed: Option<&Structure>,
        report: &Report,
    ) -> Result<Properties> {
        let converged = report.energy_section
            && (!self.settings.requests_relaxation() || report.optimisation_achieved);

        // Raw dE/de is eV per unit strain; stress is -dE/de / V in eV/Å³.
        // The relaxed cell's volume applies when the run changed the cell.
        let stress = match report.strain_derivatives {
            Some(raw) => {
                let volume = relaxed
                    .and_then(|s| s.volume())
                    .or_else(|| structure.volume())
                    .ok_or(CalcError::MissingCell { quantity: "stress" })?;
                let mut out = [0.0f64; 6];
                for (slot, value) in raw.iter().enumerate() {
                    out[slot] = -value / volume;
                }
                Some(out)
            }
            None => None,
        };

        Ok(Properties {
            energy: report.energy,
            forces: report.derivatives.clone(),
            stress,
            dipole: None,
            iterations: report.cycles,
            version: report.version.clone(),
            converged,
        })
    }
}

impl Calculator for GulpCalculator {
    fn name(&self) -> &str {
        "GULP"
    }

    fn compute(&mut self, structure: &Structure) -> Result<Properties> {
        if self.calculation_required(structure) {
            // A different atom count means this calculator is being reused
            // for a new system; drop the stale file pair first.
            if let Some(run) = &self.cache {
                if run.structure.natoms() != structure.natoms() {
                    self.clean();
                }
            }
            self.calculate(structure)?;
        }
        self.cache
            .as_ref()
            .map(|run| run.properties.clone())
            .ok_or(CalcError::NothingComputed)
    }
}
