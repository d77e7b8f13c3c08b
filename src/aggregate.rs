// RAPL-SWEEP AGGREGATION
// PURE FUNCTIONS: TRIAL SET -> PER-FREQUENCY MEANS -> DERIVED METRICS.
//
//   strip_process_metadata   DROP command / exit_code (NON-NUMERIC, MEANINGLESS AS MEANS)
//   group_by_mean            ONE ROW PER expected_frequency, EVERY OTHER COLUMN AVERAGED
//   derive_metrics           real_frequency = 1000 / mean_delta_ms, energy in joules
//
// A ZERO REQUEST MEANS POLLING WAS DISABLED: ITS real_frequency IS 0 BY
// DEFINITION AND THE RECIPROCAL IS NEVER TAKEN FOR IT.

use std::collections::HashMap;

use crate::collector::{EXPECTED_FREQUENCY, MEASURE_DELTA};
use crate::error::{Error, Result};
use crate::table::{Cell, Table};

pub const REAL_FREQUENCY: &str = "real_frequency";
pub const ENERGY_JOULES: &str = "energy_joules";
pub const MEASURE_COUNT: &str = "measure_count";
pub const DURATION_MS: &str = "duration_ms";
pub const PROCESS_METADATA: [&str; 2] = ["command", "exit_code"];

pub const MS_PER_S: f64 = 1000.0;
pub const UJ_PER_J: f64 = 1_000_000.0;

#[derive(Clone, Debug, PartialEq)]
pub struct AggregatedRow {
    pub expected_frequency: f64,
    pub real_frequency: f64,
    // MEAN READING OF THE SELECTED DOMAIN, MICROJOULES
    pub domain_energy_uj: f64,
    pub mean_delta_ms: f64,
    pub energy_joules: f64,
}

pub fn strip_process_metadata(trials: &Table) -> Table {
    trials.drop_columns(&PROCESS_METADATA)
}

// PARTITIONS ARE EMITTED IN FIRST-APPEARANCE ORDER. CALLERS THAT NEED A
// STABLE ORDER SORT BY THE KEY THEMSELVES.
pub fn group_by_mean(table: &Table, key: &str) -> Result<Table> {
    let key_idx = table.require(key)?;
    let value_idx: Vec<usize> = (0..table.columns().len()).filter(|&i| i != key_idx).collect();

    let mut order: Vec<f64> = Vec::new();
    let mut partitions: HashMap<u64, Vec<&[Cell]>> = HashMap::new();
    for (r, row) in table.rows().iter().enumerate() {
        let k = row[key_idx].as_num().filter(|k| !k.is_nan()).ok_or_else(|| {
            Error::MalformedTable(format!("row {} has non-numeric {key:?}: {}", r + 1, row[key_idx]))
        })?;
        // FOLD -0.0 INTO 0.0 SO BOTH LAND IN THE "POLLING DISABLED" PARTITION
        let k = if k == 0.0 { 0.0 } else { k };
        partitions
            .entry(k.to_bits())
            .or_insert_with(|| {
                order.push(k);
                Vec::new()
            })
            .push(row);
    }

    let mut columns = vec![key.to_string()];
    columns.extend(value_idx.iter().map(|&i| table.columns()[i].clone()));
    let mut out = Table::new(columns);

    for k in order {
        let rows = &partitions[&k.to_bits()];
        let mut cells = vec![Cell::Num(k)];
        for &i in &value_idx {
            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                let v = row[i].as_num().ok_or_else(|| {
                    Error::MalformedTable(format!(
                        "column {:?} is not numeric ({}); strip process metadata before grouping",
                        table.columns()[i],
                        row[i]
                    ))
                })?;
                values.push(v);
            }
            cells.push(Cell::Num(mean(&mut values)));
        }
        out.push_row(cells)?;
    }
    Ok(out)
}

// SORTED SUMMATION: THE MEAN IS BIT-IDENTICAL HOWEVER THE ROWS WERE ORDERED
fn mean(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn derive_metrics(grouped: &Table, domain: &str) -> Result<Vec<AggregatedRow>> {
    let t = grouped.select(&[EXPECTED_FREQUENCY, domain, MEASURE_COUNT, DURATION_MS, MEASURE_DELTA])?;
    let expected = t.numeric_column(EXPECTED_FREQUENCY)?;
    let energy = t.numeric_column(domain)?;
    let delta = t.numeric_column(MEASURE_DELTA)?;
    // measure_count AND duration_ms ARE ONLY CHECKED FOR PRESENCE, THEN DROPPED

    expected
        .into_iter()
        .zip(energy)
        .zip(delta)
        .map(|((hz, uj), delta_ms)| {
            let real_frequency = if hz == 0.0 {
                0.0
            } else if delta_ms > 0.0 && delta_ms.is_finite() {
                MS_PER_S / delta_ms
            } else {
                return Err(Error::DegenerateDelta {
                    expected_frequency: hz,
                    mean_delta_ms: delta_ms,
                });
            };
            Ok(AggregatedRow {
                expected_frequency: hz,
                real_frequency,
                domain_energy_uj: uj,
                mean_delta_ms: delta_ms,
                energy_joules: uj / UJ_PER_J,
            })
        })
        .collect()
}

pub fn aggregate(trials: &Table, domain: &str) -> Result<Vec<AggregatedRow>> {
    let stripped = strip_process_metadata(trials);
    let grouped = group_by_mean(&stripped, EXPECTED_FREQUENCY)?;
    derive_metrics(&grouped, domain)
}

pub fn sorted_by_frequency(rows: &[AggregatedRow]) -> Vec<AggregatedRow> {
    let mut rows = rows.to_vec();
    rows.sort_by(|a, b| a.expected_frequency.total_cmp(&b.expected_frequency));
    rows
}

// real_frequency FIRST; THE DOMAIN COLUMN KEEPS ITS PROFILER NAME (MICROJOULES)
pub fn to_table(rows: &[AggregatedRow], domain: &str) -> Result<Table> {
    let columns = [REAL_FREQUENCY, EXPECTED_FREQUENCY, domain, MEASURE_DELTA, ENERGY_JOULES]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let cells = rows
        .iter()
        .map(|r| {
            vec![
                Cell::Num(r.real_frequency),
                Cell::Num(r.expected_frequency),
                Cell::Num(r.domain_energy_uj),
                Cell::Num(r.mean_delta_ms),
                Cell::Num(r.energy_joules),
            ]
        })
        .collect();
    Table::from_rows(columns, cells)
}
