#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nalgebra::Vector3;
use uuid::Uuid;

use gulp_driver::core::domain::{Atom, Lattice, Structure};
use gulp_driver::engine::external::gulp::launch::Launch;
use gulp_driver::engine::external::gulp::GulpSettings;
use gulp_driver::error::Result;

/// Launcher double: instead of running GULP it writes a canned report as
/// `<stem>.gout` (and a line of fake stdout to the capture file) and counts
/// how often it was invoked. With a sequence of reports, call n gets report
/// n; extra calls repeat the last one.
pub struct ScriptedLauncher {
    reports: Vec<String>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedLauncher {
    pub fn new(report: &str) -> Self {
        Self::sequence(vec![report.to_string()])
    }

    pub fn sequence(reports: Vec<String>) -> Self {
        Self {
            reports,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Clone of the invocation counter; grab it before boxing the launcher.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Launch for ScriptedLauncher {
    fn launch(&self, dir: &Path, stem: &str, capture: &Path) -> Result<()> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let report = self
            .reports
            .get(n)
            .or_else(|| self.reports.last())
            .expect("ScriptedLauncher needs at least one report");
        fs::write(dir.join(format!("{}.gout", stem)), report)?;
        fs::write(capture, "scripted run\n")?;
        Ok(())
    }
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gulp-driver-test-{}-{}", tag, Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("failed to create scratch dir");
    dir
}

/// Two-atom periodic MgO toy cell: Mg at the origin, O at the cube centre,
/// cube edge 4.2 Å.
pub fn mgo_structure() -> Structure {
    let a = 4.2;
    let lattice = Lattice::new(
        Vector3::new(a, 0.0, 0.0),
        Vector3::new(0.0, a, 0.0),
        Vector3::new(0.0, 0.0, a),
    )
    .expect("cubic cell is invertible");
    Structure::new(
        vec![Atom::new("Mg", 0.0, 0.0, 0.0), Atom::new("O", a / 2.0, a / 2.0, a / 2.0)],
        Some(lattice),
    )
}

/// Gas-phase homonuclear dimer along x at separation `r`.
pub fn dimer(symbol: &str, r: f64) -> Structure {
    Structure::new(
        vec![Atom::new(symbol, 0.0, 0.0, 0.0), Atom::new(symbol, r, 0.0, 0.0)],
        None,
    )
}

/// Relaxation settings pointing at `dir`.
pub fn opti_settings(dir: &Path) -> GulpSettings {
    GulpSettings {
        keywords: vec!["opti".to_string(), "conp".to_string()],
        directory: dir.to_path_buf(),
        ..Default::default()
    }
}

/// Single-point settings pointing at `dir`.
pub fn sing_settings(dir: &Path) -> GulpSettings {
    GulpSettings {
        directory: dir.to_path_buf(),
        ..Default::default()
    }
}

/// A complete relaxation report for the two-atom MgO cell: three cycles,
/// optimisation achieved, final energy -41.16694412 eV, relaxed cube edge
/// 4.212630 Å, one oxygen shell (3 sites, 2 cores).
pub fn optimised_report() -> String {
    r#"********************************************************************************
*                       GENERAL UTILITY LATTICE PROGRAM                        *
*                                 Julian Gale                                  *
********************************************************************************
* Version = 4.5.3 * Last modified = 5th September 2017                         *
********************************************************************************

  Total number atoms/shells =       3

  Formula = MgO

--------------------------------------------------------------------------------

  Components of energy :

--------------------------------------------------------------------------------
  Interatomic potentials     =           6.27186959 eV
  Monopole - monopole (total)=         -47.02469306 eV
--------------------------------------------------------------------------------
  Total lattice energy       =         -40.75282347 eV
--------------------------------------------------------------------------------
  Total lattice energy       =           -3932.0567 kJ/(mole unit cells)
--------------------------------------------------------------------------------


  Number of variables =        7

  Start of bulk optimisation :

  Cycle:      0 Energy:       -40.752823  Gnorm:      0.123456  CPU:    0.013
  Cycle:      1 Energy:       -41.100234  Gnorm:      0.023456  CPU:    0.021
  Cycle:      2 Energy:       -41.166944  Gnorm:      0.000123  CPU:    0.029


  **** Optimisation achieved ****


  Final energy =     -41.16694412 eV
  Final Gnorm  =       0.00001234

  Components of energy :

--------------------------------------------------------------------------------
  Interatomic potentials     =           6.30127431 eV
  Monopole - monopole (total)=         -47.46821843 eV
--------------------------------------------------------------------------------
  Total lattice energy       =         -41.16694412 eV
--------------------------------------------------------------------------------
  Total lattice energy       =           -3972.0163 kJ/(mole unit cells)
--------------------------------------------------------------------------------

  Final fractional coordinates of atoms :

--------------------------------------------------------------------------------
   No.  Atomic        x           y          z          Radius
        Label       (Frac)      (Frac)     (Frac)       (Angs)
--------------------------------------------------------------------------------
     1  Mg    c     0.000000    0.000000    0.000000    0.000000
     2  O     c     0.498000    0.502000    0.500000    0.000000
     3  O     s     0.498100    0.501900    0.500000    0.000000
--------------------------------------------------------------------------------

  Final Cartesian lattice vectors (Angstroms) :

        4.212630    0.000000    0.000000
        0.000000    4.212630    0.000000
        0.000000    0.000000    4.212630


  Final cell parameters and derivatives :

--------------------------------------------------------------------------------
       a            4.212630 Angstrom     dE/de1(xx)    -0.000104 eV/strain
       b            4.212630 Angstrom     dE/de2(yy)    -0.000208 eV/strain
       c            4.212630 Angstrom     dE/de3(zz)     0.000312 eV/strain
       alpha       90.000000 Degrees      dE/de4(yz)     0.000040 eV/strain
       beta        90.000000 Degrees      dE/de5(xz)    -0.000050 eV/strain
       gamma       90.000000 Degrees      dE/de6(xy)     0.000060 eV/strain
--------------------------------------------------------------------------------

  Final internal derivatives :

--------------------------------------------------------------------------------
   No.  Atomic          x             y             z           Radius
        Label          (eV)          (eV)          (eV)        (eV/Angs)
--------------------------------------------------------------------------------
      1 Mg    c       0.001043     -0.000563      0.000210      0.000000
      2 O     c      -0.001043      0.000563     -0.000210      0.000000
      3 O     s       0.000001      0.000002     -0.000003      0.000000
--------------------------------------------------------------------------------


  Job Finished at 10:41.25  5th November 2025
"#
    .to_string()
}

/// A relaxation that ran out of optimiser cycles: no achieved marker, the
/// function-call-limit banner instead. Energy sections are still printed.
pub fn unconverged_report() -> String {
    r#"********************************************************************************
*                       GENERAL UTILITY LATTICE PROGRAM                        *
********************************************************************************
* Version = 4.5.3 * Last modified = 5th September 2017                         *
********************************************************************************

  Total number atoms/shells =       3

  Cycle:      0 Energy:       -40.752823  Gnorm:      0.123456  CPU:    0.013
  Cycle:      1 Energy:       -40.901122  Gnorm:      0.089123  CPU:    0.019
  Cycle:      5 Energy:       -41.002341  Gnorm:      0.034567  CPU:    0.101


  **** Maximum number of function calls has been reached ****


  Components of energy :

--------------------------------------------------------------------------------
  Interatomic potentials     =           6.29011213 eV
  Monopole - monopole (total)=         -47.29245313 eV
--------------------------------------------------------------------------------
  Total lattice energy       =         -41.00234100 eV
--------------------------------------------------------------------------------

  Final fractional coordinates of atoms :

--------------------------------------------------------------------------------
   No.  Atomic        x           y          z          Radius
        Label       (Frac)      (Frac)     (Frac)       (Angs)
--------------------------------------------------------------------------------
     1  Mg    c     0.000000    0.000000    0.000000    0.000000
     2  O     c     0.490000    0.510000    0.500000    0.000000
     3  O     s     0.490200    0.509800    0.500000    0.000000
--------------------------------------------------------------------------------

  Final Cartesian lattice vectors (Angstroms) :

        4.200000    0.000000    0.000000
        0.000000    4.200000    0.000000
        0.000000    0.000000    4.200000

  Job Finished at 10:44.01  5th November 2025
"#
    .to_string()
}

/// A plain single-point report: energy section and total energy only, no
/// optimiser output, no derivative tables.
pub fn single_point_report(energy: f64) -> String {
    format!(
        r#"********************************************************************************
*                       GENERAL UTILITY LATTICE PROGRAM                        *
********************************************************************************
* Version = 4.5.3 * Last modified = 5th September 2017                         *
********************************************************************************

  Total number atoms/shells =       2

  Components of energy :

--------------------------------------------------------------------------------
  Interatomic potentials     =           6.27186959 eV
  Monopole - monopole (total)=         -47.02469306 eV
--------------------------------------------------------------------------------
  Total lattice energy       =         {energy:.8} eV
--------------------------------------------------------------------------------
  Total lattice energy       =           -3932.0567 kJ/(mole unit cells)
--------------------------------------------------------------------------------

  Job Finished at 10:39.17  5th November 2025
"#
    )
}
