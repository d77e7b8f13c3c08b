// RAPL-SWEEP PROFILER INVOCATION
// ONE CALL = ONE ELEVATED PROFILER PROCESS WRAPPING ONE WORKLOAD RUN.
//
// THE PROFILER WRITES ITS RESULTS TO A FILE INSIDE A PRIVATE SCRATCH
// DIRECTORY. THE DIRECTORY IS A tempfile::TempDir: IT IS REMOVED WHEN run()
// RETURNS, ON SUCCESS AND ON EVERY ERROR PATH.
//
// NO TIMEOUT: A HUNG PROFILER HANGS THE SWEEP.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::sweep::hz_to_interval;
use crate::table::Table;

const OUTPUT_FILE: &str = "results.csv";
const SCRATCH_PREFIX: &str = "rapl-sweep-";

// THE PROFILING CAPABILITY THE COLLECTOR IS GIVEN.
// TESTS SUBSTITUTE SYNTHETIC RUNNERS; PRODUCTION USES JouleProfiler.
pub trait ProfilerRunner {
    // ONE PROFILED RUN OF workload. None OR 0 DISABLES POLLING.
    fn run(&mut self, workload: &[String], frequency: Option<f64>, extra_args: &[String]) -> Result<Table>;
}

impl<R: ProfilerRunner + ?Sized> ProfilerRunner for &mut R {
    fn run(&mut self, workload: &[String], frequency: Option<f64>, extra_args: &[String]) -> Result<Table> {
        (**self).run(workload, frequency, extra_args)
    }
}

// ELEVATION CREDENTIAL. NEVER PRINTED, NEVER PASSED ON A COMMAND LINE.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    // UNSET AND EMPTY VARIABLES BOTH COUNT AS MISSING
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var).ok().filter(|s| !s.is_empty()).map(Self)
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialPolicy {
    // MISSING CREDENTIAL IS A HARD ERROR
    #[default]
    Require,
    // MISSING CREDENTIAL FALLS BACK TO NON-INTERACTIVE sudo -n
    AssumeElevated,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Elevation {
    // ALREADY ROOT: RUN THE PROFILER AS-IS
    Direct,
    // WRAPPED IN AN ELEVATION COMMAND. A CREDENTIAL IS FED ON STDIN (-S);
    // WITHOUT ONE THE WRAPPER MUST NOT PROMPT (-n).
    Sudo {
        command: String,
        credential: Option<Credential>,
    },
}

impl Elevation {
    pub fn resolve(
        policy: CredentialPolicy,
        command: &str,
        credential_var: &str,
        credential: Option<Credential>,
        running_as_root: bool,
    ) -> Result<Self> {
        if running_as_root {
            return Ok(Self::Direct);
        }
        match (credential, policy) {
            (Some(c), _) => Ok(Self::Sudo {
                command: command.to_string(),
                credential: Some(c),
            }),
            (None, CredentialPolicy::AssumeElevated) => Ok(Self::Sudo {
                command: command.to_string(),
                credential: None,
            }),
            (None, CredentialPolicy::Require) => Err(Error::CredentialMissing {
                var: credential_var.to_string(),
            }),
        }
    }

    fn wrapper_args(&self) -> &'static [&'static str] {
        match self {
            Self::Direct => &[],
            Self::Sudo { credential: Some(_), .. } => &["-S", "-p", ""],
            Self::Sudo { credential: None, .. } => &["-n"],
        }
    }
}

pub fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

// PROFILER COMMAND-LINE SHAPE:
// <binary> <subcommand> --csv <output_flag> <path> [<polling_flag> <seconds>] <extra...> -- <workload...>
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfilerCommand {
    pub binary: PathBuf,
    pub subcommand: String,
    pub output_flag: String,
    pub polling_flag: String,
}

impl ProfilerCommand {
    pub fn args(&self, output: &Path, frequency: Option<f64>, extra_args: &[String], workload: &[String]) -> Vec<String> {
        let mut args = vec![
            self.subcommand.clone(),
            "--csv".to_string(),
            self.output_flag.clone(),
            output.display().to_string(),
        ];
        // DISABLED POLLING OMITS THE FLAG ENTIRELY, NEVER "0" OR "inf"
        let interval = frequency.map(hz_to_interval).filter(|s| s.is_finite() && *s > 0.0);
        if let Some(seconds) = interval {
            args.push(self.polling_flag.clone());
            args.push(seconds.to_string());
        }
        args.extend(extra_args.iter().cloned());
        args.push("--".to_string());
        args.extend(workload.iter().cloned());
        args
    }
}

pub struct JouleProfiler {
    command: ProfilerCommand,
    elevation: Elevation,
    delimiter: char,
}

impl JouleProfiler {
    pub fn new(command: ProfilerCommand, elevation: Elevation, delimiter: char) -> Self {
        Self {
            command,
            elevation,
            delimiter,
        }
    }

    // FULL ARGV (PROGRAM FIRST) FOR ONE INVOCATION. CONTAINS NO SECRET.
    pub fn argv(&self, output: &Path, frequency: Option<f64>, extra_args: &[String], workload: &[String]) -> Vec<String> {
        let mut argv = Vec::new();
        if let Elevation::Sudo { command, .. } = &self.elevation {
            argv.push(command.clone());
            argv.extend(self.elevation.wrapper_args().iter().map(|a| a.to_string()));
        }
        argv.push(self.command.binary.display().to_string());
        argv.extend(self.command.args(output, frequency, extra_args, workload));
        argv
    }
}

impl ProfilerRunner for JouleProfiler {
    fn run(&mut self, workload: &[String], frequency: Option<f64>, extra_args: &[String]) -> Result<Table> {
        if workload.is_empty() {
            return Err(Error::InvalidArgument("workload command is empty".to_string()));
        }

        let scratch = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()?;
        let output = scratch.path().join(OUTPUT_FILE);

        let argv = self.argv(&output, frequency, extra_args, workload);
        debug!(argv = %argv.join(" "), "invoking profiler");

        let credential = match &self.elevation {
            Elevation::Sudo { credential, .. } => credential.as_ref(),
            Elevation::Direct => None,
        };

        let mut child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(if credential.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::ProfilerInvocation {
                status: None,
                stderr: format!("failed to start {}: {}", argv[0], e),
            })?;

        if let (Some(secret), Some(mut stdin)) = (credential, child.stdin.take()) {
            // A REJECTED WRITE SHOWS UP AGAIN AS A FAILED EXIT STATUS
            if let Err(e) = writeln!(stdin, "{}", secret.expose()) {
                debug!("credential write failed: {}", e);
            }
        }

        let result = child.wait_with_output()?;
        if !result.status.success() {
            return Err(Error::ProfilerInvocation {
                status: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        read_output(&output, self.delimiter)
    }
}

// ONLY CALLED AFTER A SUCCESSFUL EXIT: ANY PROBLEM HERE IS THE PROFILER
// BREAKING ITS OUTPUT CONTRACT, NOT "NO DATA".
pub fn read_output(path: &Path, delimiter: char) -> Result<Table> {
    let unusable = |reason: String| Error::ProfilerOutput {
        path: path.to_path_buf(),
        reason,
    };
    if !path.exists() {
        return Err(unusable("missing after successful exit".to_string()));
    }
    let text = std::fs::read_to_string(path).map_err(|e| unusable(e.to_string()))?;
    let table = Table::parse(&text, delimiter).map_err(|e| unusable(e.to_string()))?;
    if table.is_empty() {
        return Err(unusable("no data rows".to_string()));
    }
    Ok(table)
}
