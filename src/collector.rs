// RAPL-SWEEP TRIAL COLLECTION
// STRICTLY SEQUENTIAL: OUTER LOOP OVER FREQUENCY POINTS, INNER LOOP OVER
// TRIALS. THE PROFILER MEASURES SYSTEM-WIDE POWER, SO TWO MEASUREMENTS MUST
// NEVER OVERLAP.
//
// FAIL-FAST: THE FIRST FAILED INVOCATION ABORTS THE WHOLE COLLECTION.
// DOWNSTREAM STATISTICS ASSUME EVERY POINT HAS THE SAME TRIAL COUNT.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::profiler::ProfilerRunner;
use crate::table::{Cell, Table};

pub const EXPECTED_FREQUENCY: &str = "expected_frequency";
pub const MEASURE_DELTA: &str = "measure_delta";

// PROFILER REPORTS measure_delta IN MICROSECONDS; TABLES CARRY MILLISECONDS
pub const US_PER_MS: f64 = 1000.0;

pub struct TrialCollector<R: ProfilerRunner> {
    runner: R,
    extra_args: Vec<String>,
    delay: Duration,
}

impl<R: ProfilerRunner> TrialCollector<R> {
    pub fn new(runner: R, extra_args: Vec<String>, delay: Duration) -> Self {
        Self {
            runner,
            extra_args,
            delay,
        }
    }

    pub fn into_runner(self) -> R {
        self.runner
    }

    // EVERY TRIAL ROW, ORDERED BY (FREQUENCY POINT, TRIAL INDEX), TAGGED WITH
    // expected_frequency, measure_delta IN MILLISECONDS.
    pub fn collect<I>(&mut self, frequencies: I, trials: u32, workload: &[String], workload_args: &[String]) -> Result<Table>
    where
        I: IntoIterator<Item = f64>,
    {
        if trials == 0 {
            return Err(Error::InvalidArgument("trials per frequency must be >= 1".to_string()));
        }
        let command: Vec<String> = workload.iter().chain(workload_args).cloned().collect();
        if command.is_empty() {
            return Err(Error::InvalidArgument("workload command is empty".to_string()));
        }

        let mut points = Vec::new();
        for (n, hz) in frequencies.into_iter().enumerate() {
            if !hz.is_finite() || hz < 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "frequency must be a finite number >= 0 Hz, got {hz}"
                )));
            }
            let started = Instant::now();
            let mut runs = Vec::with_capacity(trials as usize);
            for trial in 0..trials {
                if n > 0 || trial > 0 {
                    std::thread::sleep(self.delay);
                }
                debug!(frequency = hz, trial, "profiling trial");
                runs.push(self.runner.run(&command, Some(hz), &self.extra_args)?);
            }
            let point = Table::concat(runs)?.with_constant(EXPECTED_FREQUENCY, Cell::Num(hz));
            info!(
                point = n + 1,
                frequency = hz,
                rows = point.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "frequency point collected"
            );
            points.push(point);
        }

        let all = Table::concat(points)?;
        normalize_delta(&all)
    }
}

// APPLIED ONCE, UNIFORMLY, TO EVERY ROW OF THE CONCATENATED SET
fn normalize_delta(table: &Table) -> Result<Table> {
    if table.column_index(MEASURE_DELTA).is_none() {
        return Ok(table.clone());
    }
    table.map_numeric(MEASURE_DELTA, |us| us / US_PER_MS)
}
