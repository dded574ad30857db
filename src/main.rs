use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::Parser;

use gulp_driver::core::io;
use gulp_driver::engine::calculator::{Calculator, Properties};
use gulp_driver::engine::external::gulp::launch::LaunchMode;
use gulp_driver::engine::external::gulp::{GulpCalculator, GulpSettings};

// --- CLI Definitions ---

#[derive(Parser, Debug)]
#[command(author, version, about = "Run GULP on a structure and report energy, forces and stress", long_about = None)]
struct Args {
    /// Structure file (XYZ; comment line may carry Lattice="..." cell)
    input: PathBuf,

    /// Keyword line of the input deck, e.g. "opti conp"
    #[arg(short, long, default_value = "sing")]
    keywords: String,

    /// Extra option line appended to the deck (repeatable)
    #[arg(short, long = "option")]
    options: Vec<String>,

    /// Attach a shell to a species: SYMBOL=CHARGE (repeatable)
    #[arg(long = "shell")]
    shells: Vec<String>,

    /// Base name of the .gin/.gout file pair
    #[arg(long, default_value = "gulp-job")]
    stem: String,

    /// Directory the run files are written to
    #[arg(short, long, default_value = ".")]
    directory: PathBuf,

    /// Run in a fresh scratch directory under the system temp dir
    #[arg(long)]
    sandbox: bool,

    /// Print the computed properties as JSON instead of a text summary
    #[arg(long)]
    json: bool,

    /// Write the relaxed structure to this XYZ file (relaxation runs only)
    #[arg(long)]
    relaxed: Option<PathBuf>,

    /// Save the completed run as a JSON snapshot
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

// --- Initialization Helpers ---

fn parse_shell_flag(flag: &str) -> Result<(String, f64)> {
    let (symbol, charge) = flag
        .split_once('=')
        .ok_or_else(|| anyhow!("--shell takes SYMBOL=CHARGE, got '{}'", flag))?;
    let charge: f64 = charge
        .trim()
        .parse()
        .with_context(|| format!("bad shell charge in '{}'", flag))?;
    Ok((symbol.trim().to_string(), charge))
}

fn build_settings(args: &Args) -> Result<GulpSettings> {
    let mut settings = GulpSettings {
        keywords: args.keywords.split_whitespace().map(str::to_string).collect(),
        options: args.options.clone(),
        stem: args.stem.clone(),
        directory: args.directory.clone(),
        ..Default::default()
    };
    for flag in &args.shells {
        let (symbol, charge) = parse_shell_flag(flag)?;
        settings.shells.insert(symbol, charge);
    }
    Ok(settings)
}

fn print_summary(calc: &GulpCalculator, properties: &Properties) {
    println!(
        "Backend: GULP {}",
        properties.version.as_deref().unwrap_or("(version unknown)")
    );
    match properties.energy {
        Some(e) => println!("Energy:  {:.8} eV", e),
        None => println!("Energy:  n/a"),
    }
    if let Some(n) = properties.iterations {
        println!("Cycles:  {}", n);
    }
    if let Some(forces) = &properties.forces {
        let fmax = forces.iter().map(|f| f.norm()).fold(0.0f64, f64::max);
        println!("Max |F|: {:.6} eV/A", fmax);
    }
    if let Some(s) = properties.stress {
        println!(
            "Stress:  {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} eV/A^3 (xx yy zz yz xz xy)",
            s[0], s[1], s[2], s[3], s[4], s[5]
        );
    }
    println!("Converged: {}", properties.converged);
    if calc.stopped_on_cycle_limit() {
        println!("Note: the optimiser ran out of cycles; a continuation run can resume it.");
    }
    println!("Finished: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
}

// --- Main ---

fn main() -> Result<()> {
    // 1. Logging & Parsing
    env_logger::init();
    let args = Args::parse();

    // 2. Pre-flight Checks: fail before writing anything if no launch
    //    mechanism is configured.
    if let Err(e) = LaunchMode::from_env() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // 3. Load the structure
    let structure = io::read_xyz(&args.input)
        .with_context(|| format!("failed to read structure {:?}", args.input))?;

    // 4. Configure the calculator
    let settings = build_settings(&args)?;
    let mut calc = if args.sandbox {
        GulpCalculator::sandboxed(settings)?
    } else {
        GulpCalculator::new(settings)
    };

    // 5. Run
    let properties = calc.compute(&structure)?;
    if !properties.converged {
        eprintln!("WARNING: the run did not converge");
    }

    // 6. Report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&properties)?);
    } else {
        print_summary(&calc, &properties);
    }

    // 7. Optional Outputs
    if let Some(path) = &args.relaxed {
        match calc.relaxed_structure() {
            Some(relaxed) => {
                io::write_xyz(path, relaxed, "relaxed by GULP")?;
                println!("Relaxed structure written to {:?}", path);
            }
            None => eprintln!("no relaxed geometry in this run; {:?} not written", path),
        }
    }
    if let Some(path) = &args.snapshot {
        calc.save_snapshot(path)?;
        println!("Snapshot written to {:?}", path);
    }

    Ok(())
}
