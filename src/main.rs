// RAPL-SWEEP -- POLLING-FREQUENCY SWEEPS OVER AN EXTERNAL ENERGY PROFILER
// RUNS A WORKLOAD UNDER THE PROFILER AT EVERY REQUESTED POLLING RATE,
// THEN COMPARES REQUESTED VS ACHIEVED RATE AND THE ENERGY MEASURED.
//
// ONE MEASUREMENT AT A TIME. THE PROFILER SEES SYSTEM-WIDE POWER.

mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rapl_sweep::config::Config;

#[derive(Parser)]
#[command(name = "rapl-sweep")]
#[command(about = "RAPL-SWEEP -- REQUESTED VS ACHIEVED PROFILER POLLING, WITH ENERGY")]
struct Cli {
    // TOML CONFIG FILE (ANYTHING IT LEAVES OUT TAKES THE DEFAULT)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    // DEBUG-LEVEL LOGGING (RUST_LOG WINS IF SET)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "SWEEP POLLING FREQUENCIES, WRITE RAW AND AGGREGATED TABLES")]
    Run(cli::run::RunArgs),
    #[command(about = "RE-AGGREGATE A RAW TABLE WRITTEN BY A PREVIOUS RUN")]
    Aggregate(cli::aggregate::AggregateArgs),
    #[command(about = "CHECK THAT THE PROFILER, ELEVATION AND RAPL ARE USABLE")]
    Check,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Run(args) => cli::run::run_sweep(args, config),
        Command::Aggregate(args) => cli::aggregate::run_aggregate(args, config),
        Command::Check => cli::check::run_check(&config),
    }
}
