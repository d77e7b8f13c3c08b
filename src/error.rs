// RAPL-SWEEP ERROR TAXONOMY
// EVERY FAILURE IS FATAL TO THE SWEEP. NO RETRIES, NO PARTIAL RESULTS.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // PROFILER PROCESS EXITED WITH A FAILURE STATUS
    #[error("profiler invocation failed (exit status {}): {stderr}", exit_label(.status))]
    ProfilerInvocation {
        status: Option<i32>,
        stderr: String,
    },

    // PROFILER REPORTED SUCCESS BUT ITS OUTPUT FILE IS MISSING OR UNUSABLE
    #[error("profiler output {} unusable: {reason}", .path.display())]
    ProfilerOutput { path: PathBuf, reason: String },

    // ZERO, NEGATIVE OR NON-FINITE MEAN SAMPLE DELTA WOULD FEED A RECIPROCAL
    #[error("degenerate measure delta {mean_delta_ms} ms at expected frequency {expected_frequency} Hz")]
    DegenerateDelta {
        expected_frequency: f64,
        mean_delta_ms: f64,
    },

    #[error("elevation credential missing: set ${var} or use policy \"assume-elevated\"")]
    CredentialMissing { var: String },

    #[error("column {column:?} not found (available: {})", .available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("malformed table: {0}")]
    MalformedTable(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "killed by signal".to_string(),
    }
}
