use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use rapl_sweep::aggregate::{aggregate, sorted_by_frequency, strip_process_metadata, to_table, AggregatedRow};
use rapl_sweep::chart::ChartInput;
use rapl_sweep::collector::TrialCollector;
use rapl_sweep::config::{Config, SweepKindConfig};
use rapl_sweep::profiler::{running_as_root, Credential, Elevation, JouleProfiler};
use rapl_sweep::report;
use rapl_sweep::sweep::{hz_to_interval, Sweep};
use rapl_sweep::table::DELIMITER;

#[derive(Args)]
pub struct RunArgs {
    // FREQUENCY STEP IN HZ
    #[arg(long)]
    step: Option<f64>,

    // NUMBER OF STEPS ABOVE ZERO (COUNT + 1 POINTS)
    #[arg(long)]
    count: Option<u32>,

    // FIBONACCI MULTIPLIERS (0, 1, 2, 3, 5, ...) INSTEAD OF LINEAR
    #[arg(long)]
    fibonacci: bool,

    // PROFILER INVOCATIONS PER FREQUENCY POINT
    #[arg(short = 'n', long)]
    trials: Option<u32>,

    // PAUSE BETWEEN INVOCATIONS
    #[arg(long)]
    delay_ms: Option<u64>,

    // ENERGY DOMAIN COLUMN TO REPORT (e.g. CORE_0, PACKAGE_0)
    #[arg(long)]
    domain: Option<String>,

    // PROFILER BINARY
    #[arg(long)]
    profiler: Option<PathBuf>,

    // RAW TRIAL TABLE (PROCESS METADATA STRIPPED)
    #[arg(long)]
    raw_output: Option<PathBuf>,

    // AGGREGATED TABLE
    #[arg(short, long)]
    output: Option<PathBuf>,

    // CHART INPUT (TOML)
    #[arg(long)]
    chart: Option<PathBuf>,

    // ARGUMENTS APPENDED TO THE WORKLOAD COMMAND (REPEATABLE)
    #[arg(long = "workload-arg")]
    workload_args: Vec<String>,

    // PRINT THE PLAN AND PROFILER COMMAND LINES, SPAWN NOTHING
    #[arg(long)]
    dry_run: bool,

    // WORKLOAD COMMAND (EVERYTHING AFTER `--`)
    #[arg(last = true)]
    workload: Vec<String>,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(step) = self.step {
            config.sweep.step = step;
        }
        if let Some(count) = self.count {
            config.sweep.count = count;
        }
        if self.fibonacci {
            config.sweep.kind = SweepKindConfig::Fibonacci;
        }
        if let Some(trials) = self.trials {
            config.sweep.trials = trials;
        }
        if let Some(delay) = self.delay_ms {
            config.sweep.delay_ms = delay;
        }
        if let Some(domain) = &self.domain {
            config.output.domain = domain.clone();
        }
        if let Some(binary) = &self.profiler {
            config.profiler.binary = binary.clone();
        }
        if let Some(raw) = &self.raw_output {
            config.output.raw = raw.clone();
        }
        if let Some(out) = &self.output {
            config.output.aggregated = out.clone();
        }
        if let Some(chart) = &self.chart {
            config.output.chart = chart.clone();
        }
        if !self.workload.is_empty() {
            config.workload.command = self.workload.clone();
        }
    }
}

pub fn run_sweep(args: RunArgs, mut config: Config) -> Result<()> {
    args.apply(&mut config);
    config.validate()?;
    let sweep = config.build_sweep()?;

    let mut workload = config.workload.command.clone();
    workload.extend(args.workload_args.iter().cloned());

    println!("RAPL-SWEEP");
    println!("PROFILER:        {}", config.profiler.binary.display());
    println!("WORKLOAD:        {}", workload.join(" "));
    println!(
        "SWEEP:           {} STEP {} HZ, {} POINTS",
        sweep.kind().label(),
        sweep.step(),
        sweep.iter().len()
    );
    println!("TRIALS:          {} PER POINT, {} MS APART", config.sweep.trials, config.sweep.delay_ms);
    println!("DOMAIN:          {}", config.output.domain);
    println!();

    let credential = Credential::from_env(&config.elevation.credential_env);
    let elevation = Elevation::resolve(
        config.elevation.policy,
        &config.elevation.command,
        &config.elevation.credential_env,
        credential,
        running_as_root(),
    );

    if args.dry_run {
        return print_plan(&config, &sweep, &workload, elevation);
    }

    let profiler = JouleProfiler::new(config.profiler_command(), elevation?, DELIMITER);
    let mut collector = TrialCollector::new(profiler, config.profiler.extra_args.clone(), config.delay());

    let started = Instant::now();
    let trials = collector
        .collect(sweep.iter(), config.sweep.trials, &config.workload.command, &args.workload_args)
        .context("SWEEP ABORTED")?;
    info!(rows = trials.len(), elapsed_s = started.elapsed().as_secs(), "collection complete");

    // RAW DATA GOES TO DISK BEFORE AGGREGATION CAN FAIL
    let raw = strip_process_metadata(&trials);
    raw.write(&config.output.raw, DELIMITER)
        .with_context(|| format!("FAILED TO WRITE {}", config.output.raw.display()))?;
    println!("RAW DATA SAVED TO {}", config.output.raw.display());

    let domains = raw.energy_domains();
    if !domains.contains(&config.output.domain.as_str()) {
        warn!("domain {} not in profiler output (found: {})", config.output.domain, domains.join(", "));
    }

    let rows = aggregate(&trials, &config.output.domain)?;
    let table = to_table(&sorted_by_frequency(&rows), &config.output.domain)?;
    table
        .write(&config.output.aggregated, DELIMITER)
        .with_context(|| format!("FAILED TO WRITE {}", config.output.aggregated.display()))?;

    write_chart(&rows, &config.output.chart)?;

    println!();
    report::print(&rows, &config.output.domain);
    println!("\nSAVED TO {}", config.output.aggregated.display());
    Ok(())
}

pub fn write_chart(rows: &[AggregatedRow], path: &Path) -> Result<()> {
    if let Some(chart) = ChartInput::from_rows(rows) {
        chart
            .save(path)
            .with_context(|| format!("FAILED TO WRITE {}", path.display()))?;
        info!("chart input written to {}", path.display());
    }
    Ok(())
}

fn print_plan(
    config: &Config,
    sweep: &Sweep,
    workload: &[String],
    elevation: rapl_sweep::Result<Elevation>,
) -> Result<()> {
    let elevation = match elevation {
        Ok(e) => e,
        Err(e) => {
            println!("ELEVATION:       {} (A REAL RUN WOULD FAIL)", e);
            Elevation::Sudo {
                command: config.elevation.command.clone(),
                credential: None,
            }
        }
    };
    let profiler = JouleProfiler::new(config.profiler_command(), elevation, DELIMITER);
    let scratch = PathBuf::from("<scratch>/results.csv");

    println!("{:>4} {:>12} {:>12}  COMMAND", "#", "HZ", "INTERVAL_S");
    println!("{} {} {}  {}", "-".repeat(4), "-".repeat(12), "-".repeat(12), "-".repeat(7));
    for (i, hz) in sweep.iter().enumerate() {
        let argv = profiler.argv(&scratch, Some(hz), &config.profiler.extra_args, workload);
        println!("{:>4} {:>12} {:>12}  {}", i, hz, hz_to_interval(hz), argv.join(" "));
    }
    Ok(())
}
