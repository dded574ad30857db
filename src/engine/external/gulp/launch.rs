use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::info;

use crate::error::{CalcError, Result};

/// Shell command prefix; the input stem is appended as its argument.
pub const COMMAND_VAR: &str = "GULP_COMMAND";
/// Launcher script run as-is; it reads the stem from `GULP_STEM`.
pub const SCRIPT_VAR: &str = "GULP_SCRIPT";

/// How the external program gets started. Exactly one of the two
/// environment variables selects the mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// `sh -c "<command> <stem>"` with stdout redirected to the capture file.
    Command(String),
    /// The script runs as its own process and owns all redirection; its exit
    /// status stands for the program's.
    Script(PathBuf),
}

impl LaunchMode {
    /// Reads the launch configuration from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(env::var(COMMAND_VAR).ok(), env::var(SCRIPT_VAR).ok())
    }

    /// Resolves a launch mode from the two configuration values. Empty
    /// strings count as absent, the same as unset variables.
    pub fn from_vars(command: Option<String>, script: Option<String>) -> Result<Self> {
        let command = command.filter(|v| !v.is_empty());
        let script = script.filter(|v| !v.is_empty());
        match (command, script) {
            (Some(_), Some(_)) => Err(CalcError::LaunchAmbiguous),
            (Some(c), None) => Ok(LaunchMode::Command(c)),
            (None, Some(s)) => Ok(LaunchMode::Script(PathBuf::from(s))),
            (None, None) => Err(CalcError::LaunchNotConfigured),
        }
    }
}

/// Starts the external program for one prepared input deck and blocks until
/// it exits. Implementations other than [`EnvLaunch`] exist for tests and
/// queue wrappers.
pub trait Launch: Send + Sync {
    /// `dir` holds `<stem>.gin`; a `<stem>.gout` report must exist in `dir`
    /// once this returns Ok. `capture` receives stdout in command mode;
    /// script mode manages its own redirection.
    fn launch(&self, dir: &Path, stem: &str, capture: &Path) -> Result<()>;
}

/// Launcher configured through `GULP_COMMAND` / `GULP_SCRIPT`.
#[derive(Debug, Default)]
pub struct EnvLaunch;

impl Launch for EnvLaunch {
    fn launch(&self, dir: &Path, stem: &str, capture: &Path) -> Result<()> {
        let status = match LaunchMode::from_env()? {
            LaunchMode::Command(cmd) => {
                let line = format!("{} {}", cmd, stem);
                info!("launching '{}' in {:?}", line, dir);
                let stdout = File::create(capture)?;
                Command::new("sh")
                    .arg("-c")
                    .arg(&line)
                    .current_dir(dir)
                    .stdout(Stdio::from(stdout))
                    .status()
                    .map_err(|e| CalcError::LaunchFailed { command: line, source: e })?
            }
            LaunchMode::Script(script) => {
                info!("launching script {:?} in {:?}", script, dir);
                Command::new(&script)
                    .current_dir(dir)
                    .env("GULP_STEM", stem)
                    .status()
                    .map_err(|e| CalcError::LaunchFailed {
                        command: script.display().to_string(),
                        source: e,
                    })?
            }
        };

        if !status.success() {
            return Err(CalcError::ExternalFailure { status });
        }
        Ok(())
    }
}
