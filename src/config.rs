// RAPL-SWEEP CONFIGURATION (TOML)
// EVERY SECTION AND FIELD IS OPTIONAL; THE COMMAND LINE OVERRIDES WHATEVER
// THE FILE SETS.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::profiler::{CredentialPolicy, ProfilerCommand};
use crate::sweep::{Sweep, SweepKind};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub profiler: ProfilerConfig,
    pub elevation: ElevationConfig,
    pub sweep: SweepConfig,
    pub workload: WorkloadConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    pub binary: PathBuf,
    pub subcommand: String,
    pub output_flag: String,
    pub polling_flag: String,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationConfig {
    // ENVIRONMENT VARIABLE HOLDING THE ELEVATION PASSWORD. NEVER THE PASSWORD.
    pub credential_env: String,
    pub policy: CredentialPolicy,
    pub command: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SweepKindConfig {
    Linear,
    Fibonacci,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub kind: SweepKindConfig,
    pub step: f64,
    pub count: u32,
    pub trials: u32,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    // ENERGY DOMAIN COLUMN REPORTED IN JOULES
    pub domain: String,
    pub raw: PathBuf,
    pub aggregated: PathBuf,
    // CHART INPUT FOR AN EXTERNAL RENDERER
    pub chart: PathBuf,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        ProfilerConfig {
            binary: PathBuf::from("./joule-profiler/target/debug/joule-profiler"),
            subcommand: "simple".to_string(),
            output_flag: "--output-file".to_string(),
            polling_flag: "--polling-interval".to_string(),
            extra_args: vec![],
        }
    }
}

impl Default for ElevationConfig {
    fn default() -> Self {
        ElevationConfig {
            credential_env: "SUDO_PASSWORD".to_string(),
            policy: CredentialPolicy::Require,
            command: "sudo".to_string(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            kind: SweepKindConfig::Linear,
            step: 1000.0,
            count: 30,
            trials: 100,
            delay_ms: 10,
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        WorkloadConfig {
            command: vec!["python3".to_string(), "nbody.py".to_string(), "50000".to_string()],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            domain: "CORE_0".to_string(),
            raw: PathBuf::from("data.csv"),
            aggregated: PathBuf::from("aggregated.csv"),
            chart: PathBuf::from("chart.toml"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sweep.trials == 0 {
            return Err(Error::InvalidArgument("sweep.trials must be >= 1".to_string()));
        }
        if self.workload.command.is_empty() {
            return Err(Error::InvalidArgument("workload.command must not be empty".to_string()));
        }
        if self.output.domain.is_empty() {
            return Err(Error::InvalidArgument("output.domain must not be empty".to_string()));
        }
        self.build_sweep().map(|_| ())
    }

    pub fn build_sweep(&self) -> Result<Sweep> {
        let kind = match self.sweep.kind {
            SweepKindConfig::Linear => SweepKind::Linear,
            SweepKindConfig::Fibonacci => SweepKind::Fibonacci,
        };
        Sweep::new(kind, self.sweep.step, self.sweep.count)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.sweep.delay_ms)
    }

    pub fn profiler_command(&self) -> ProfilerCommand {
        ProfilerCommand {
            binary: self.profiler.binary.clone(),
            subcommand: self.profiler.subcommand.clone(),
            output_flag: self.profiler.output_flag.clone(),
            polling_flag: self.profiler.polling_flag.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sweep.trials, 100);
        assert_eq!(config.elevation.policy, CredentialPolicy::Require);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
[sweep]
kind = "fibonacci"
step = 10
trials = 2

[elevation]
policy = "assume-elevated"
"#,
        )
        .unwrap();
        assert_eq!(config.sweep.kind, SweepKindConfig::Fibonacci);
        assert_eq!(config.sweep.step, 10.0);
        assert_eq!(config.sweep.count, 30);
        assert_eq!(config.elevation.policy, CredentialPolicy::AssumeElevated);
        assert_eq!(config.elevation.credential_env, "SUDO_PASSWORD");
        assert_eq!(config.build_sweep().unwrap().kind(), SweepKind::Fibonacci);
    }

    #[test]
    fn validate_rejects_zero_trials() {
        let mut config = Config::default();
        config.sweep.trials = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn validate_rejects_negative_step() {
        let mut config = Config::default();
        config.sweep.step = -5.0;
        assert!(config.validate().is_err());
    }
}
