// RAPL-SWEEP TERMINAL REPORT
// FIXED-WIDTH TABLE, ONE LINE PER REQUESTED FREQUENCY (ASCENDING),
// FOLLOWED BY THE ENERGY TREND WHEN THERE ARE AT LEAST TWO POINTS.

use crate::aggregate::{sorted_by_frequency, AggregatedRow};
use crate::chart::ChartInput;

pub fn render(rows: &[AggregatedRow], domain: &str) -> Vec<String> {
    let sep = "=".repeat(60);
    let mut out = Vec::new();
    out.push(sep.clone());
    out.push(format!("RAPL-SWEEP SUMMARY ({} FREQUENCY POINTS, DOMAIN {})", rows.len(), domain));
    out.push(sep.clone());
    out.push(format!(
        "{:>12} {:>12} {:>10} {:>10} {:>12}",
        "EXPECTED_HZ", "REAL_HZ", "TRACKING", "DELTA_MS", "ENERGY_J"
    ));
    out.push(format!(
        "{} {} {} {} {}",
        "-".repeat(12),
        "-".repeat(12),
        "-".repeat(10),
        "-".repeat(10),
        "-".repeat(12),
    ));
    for r in sorted_by_frequency(rows) {
        // POLLING DISABLED: NO RATE TO TRACK
        let tracking = if r.expected_frequency > 0.0 {
            format!("{:.1}%", r.real_frequency / r.expected_frequency * 100.0)
        } else {
            "-".to_string()
        };
        out.push(format!(
            "{:>12.1} {:>12.1} {:>10} {:>10.3} {:>12.4}",
            r.expected_frequency, r.real_frequency, tracking, r.mean_delta_ms, r.energy_joules,
        ));
    }

    if let Some(trend) = ChartInput::from_rows(rows).and_then(|c| c.energy_trend) {
        out.push(String::new());
        out.push(format!(
            "ENERGY TREND:  {:+.6} J PER KHZ  (INTERCEPT {:.4} J)",
            trend.slope * 1000.0,
            trend.intercept
        ));
    }
    out.push(sep);
    out
}

pub fn print(rows: &[AggregatedRow], domain: &str) {
    for line in render(rows, domain) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(hz: f64, real: f64) -> AggregatedRow {
        AggregatedRow {
            expected_frequency: hz,
            real_frequency: real,
            domain_energy_uj: 1_500_000.0,
            mean_delta_ms: if real > 0.0 { 1000.0 / real } else { 0.0 },
            energy_joules: 1.5,
        }
    }

    #[test]
    fn zero_hz_has_no_tracking() {
        let lines = render(&[row(0.0, 0.0)], "CORE_0");
        let data = &lines[5];
        assert!(data.trim_end().contains(" - "), "{}", data);
        assert!(!lines.iter().any(|l| l.starts_with("ENERGY TREND")));
    }

    #[test]
    fn rows_ascending_with_trend() {
        let lines = render(&[row(1000.0, 500.0), row(0.0, 0.0)], "PACKAGE_0");
        assert!(lines[1].contains("2 FREQUENCY POINTS, DOMAIN PACKAGE_0"));
        assert!(lines[5].trim_start().starts_with("0.0"));
        assert!(lines[6].contains("50.0%"));
        assert!(lines.iter().any(|l| l.starts_with("ENERGY TREND")));
    }
}
