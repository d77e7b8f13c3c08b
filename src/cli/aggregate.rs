use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use rapl_sweep::aggregate::{aggregate, sorted_by_frequency, to_table};
use rapl_sweep::config::Config;
use rapl_sweep::report;
use rapl_sweep::table::{Table, DELIMITER};

#[derive(Args)]
pub struct AggregateArgs {
    // RAW TABLE FROM A PREVIOUS RUN (DEFAULT: output.raw FROM CONFIG)
    input: Option<PathBuf>,

    // ENERGY DOMAIN COLUMN TO REPORT
    #[arg(long)]
    domain: Option<String>,

    // AGGREGATED TABLE
    #[arg(short, long)]
    output: Option<PathBuf>,

    // CHART INPUT (TOML)
    #[arg(long)]
    chart: Option<PathBuf>,
}

pub fn run_aggregate(args: AggregateArgs, config: Config) -> Result<()> {
    let input = args.input.unwrap_or(config.output.raw);
    let domain = args.domain.unwrap_or(config.output.domain);
    let output = args.output.unwrap_or(config.output.aggregated);
    let chart = args.chart.unwrap_or(config.output.chart);

    let raw = Table::read(&input, DELIMITER).with_context(|| format!("FAILED TO READ {}", input.display()))?;
    info!(
        rows = raw.len(),
        domains = %raw.energy_domains().join(","),
        "loaded {}",
        input.display()
    );

    let rows = aggregate(&raw, &domain)?;
    let table = to_table(&sorted_by_frequency(&rows), &domain)?;
    table
        .write(&output, DELIMITER)
        .with_context(|| format!("FAILED TO WRITE {}", output.display()))?;
    super::run::write_chart(&rows, &chart)?;

    report::print(&rows, &domain);
    println!("\nSAVED TO {}", output.display());
    Ok(())
}
