use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the whole crate.
///
/// Parser rules return `MalformedField`/`TableMismatch` instead of silently
/// substituting sentinel values: a report that lies about a number is a hard
/// failure, not a quiet zero.
#[derive(Error, Debug)]
pub enum CalcError {
    // --- Launch Configuration ---
    #[error("neither GULP_COMMAND nor GULP_SCRIPT is set; export exactly one before running")]
    LaunchNotConfigured,

    #[error("GULP_COMMAND and GULP_SCRIPT are both set; they are mutually exclusive")]
    LaunchAmbiguous,

    #[error("failed to start '{command}'")]
    LaunchFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("external program exited with {status}")]
    ExternalFailure { status: std::process::ExitStatus },

    // --- Report Parsing ---
    #[error("malformed {quantity} value in report: '{token}'")]
    MalformedField {
        quantity: &'static str,
        token: String,
    },

    #[error("marker '{marker}' not found where the report format requires it")]
    MarkerNotFound { marker: &'static str },

    #[error("{quantity} table holds {found} rows, expected {expected}")]
    TableMismatch {
        quantity: &'static str,
        expected: usize,
        found: usize,
    },

    // --- Calculator Contract ---
    #[error("{quantity} is not available from this calculation")]
    NotAvailable { quantity: &'static str },

    #[error("{quantity} requires a periodic cell, but the structure has none")]
    MissingCell { quantity: &'static str },

    #[error("setup index {index} is out of range for {natoms} atoms")]
    SetupOutOfRange { index: usize, natoms: usize },

    #[error("no completed run is cached")]
    NothingComputed,

    // --- File Formats ---
    #[error("invalid structure data: {0}")]
    InvalidFormat(String),

    #[error("unsupported snapshot format version '{0}'")]
    UnsupportedSnapshot(String),

    #[error("restart dump {path:?} is unusable: {reason}")]
    BadDump { path: PathBuf, reason: String },

    // --- Wrapped Sources ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CalcError>;
