// RAPL-SWEEP LIVE SWEEP
// END-TO-END AGAINST A REAL PROFILER BINARY AND REAL RAPL COUNTERS.
//
// REQUIRES JOULE_PROFILER (PATH TO THE BINARY) AND EITHER ROOT OR
// SUDO_PASSWORD IN THE ENVIRONMENT.
// RUN: JOULE_PROFILER=/path/to/joule-profiler cargo test --test live -- --ignored --test-threads=1
//
// SMALL SWEEP [0, 500, 1000] HZ, 3 TRIALS EACH, WORKLOAD `sleep 0.2`.
// REPORTS THE AGGREGATED TABLE AND CHECKS TRACKING IS PLAUSIBLE.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use rapl_sweep::aggregate::{aggregate, sorted_by_frequency};
use rapl_sweep::collector::TrialCollector;
use rapl_sweep::profiler::{
    running_as_root, Credential, CredentialPolicy, Elevation, JouleProfiler, ProfilerCommand,
};
use rapl_sweep::report;
use rapl_sweep::sweep::Sweep;
use rapl_sweep::table::DELIMITER;

const CREDENTIAL_ENV: &str = "SUDO_PASSWORD";
const STEP_HZ: f64 = 500.0;
const TRIALS: u32 = 3;

fn profiler_binary() -> Option<PathBuf> {
    std::env::var_os("JOULE_PROFILER").map(PathBuf::from)
}

// FIRST ENERGY DOMAIN THE PROFILER REPORTS (CORE_0 ON MOST INTEL PARTS)
fn pick_domain(trials: &rapl_sweep::table::Table) -> Option<String> {
    let domains = trials.energy_domains();
    domains
        .iter()
        .find(|d| d.starts_with("CORE"))
        .or_else(|| domains.first())
        .map(|d| d.to_string())
}

#[test]
#[ignore]
fn live_sweep() {
    let Some(binary) = profiler_binary() else {
        eprintln!("SKIPPED: JOULE_PROFILER NOT SET");
        return;
    };
    let elevation = match Elevation::resolve(
        CredentialPolicy::Require,
        "sudo",
        CREDENTIAL_ENV,
        Credential::from_env(CREDENTIAL_ENV),
        running_as_root(),
    ) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("SKIPPED: {}", e);
            return;
        }
    };

    let command = ProfilerCommand {
        binary,
        subcommand: "simple".to_string(),
        output_flag: "--output-file".to_string(),
        polling_flag: "--polling-interval".to_string(),
    };
    let profiler = JouleProfiler::new(command, elevation, DELIMITER);
    let mut collector = TrialCollector::new(profiler, vec![], Duration::from_millis(10));

    let sweep = Sweep::linear(STEP_HZ, 2).unwrap();
    let workload = vec!["sleep".to_string(), "0.2".to_string()];

    let started = Instant::now();
    let trials = collector
        .collect(sweep.iter(), TRIALS, &workload, &[])
        .expect("sweep failed");
    eprintln!("COLLECTED {} ROWS IN {:.1}S", trials.len(), started.elapsed().as_secs_f64());
    assert_eq!(trials.len(), 3 * TRIALS as usize);

    let domain = pick_domain(&trials).expect("profiler reported no energy domain");
    let rows = sorted_by_frequency(&aggregate(&trials, &domain).unwrap());
    report::print(&rows, &domain);

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].expected_frequency, 0.0);
    assert_eq!(rows[0].real_frequency, 0.0);
    for r in &rows[1..] {
        assert!(r.real_frequency > 0.0, "{} HZ: NO POLLING OBSERVED", r.expected_frequency);
        assert!(r.energy_joules >= 0.0);
    }
}
