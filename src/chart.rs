// RAPL-SWEEP CHART INPUT
// EVERYTHING A RENDERER NEEDS FROM THE AGGREGATED TABLE, NOTHING ABOUT
// HOW IT DRAWS. TWO CHARTS ARE FED FROM THIS:
//   FREQUENCY: REAL VS EXPECTED, WITH AN IDENTITY LINE (PERFECT TRACKING)
//   ENERGY:    JOULES VS EXPECTED FREQUENCY, WITH A LINEAR TREND
//
// WRITTEN AS TOML NEXT TO THE AGGREGATED TABLE FOR AN EXTERNAL RENDERER.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::aggregate::AggregatedRow;
use crate::error::{Error, Result};

// ENERGY AXIS PADDING, AS A FRACTION OF THE OBSERVED RANGE
pub const ENERGY_MARGIN: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ChartPoint {
    pub expected_frequency: f64,
    pub real_frequency: f64,
    pub energy_joules: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AxisDomain {
    pub min: f64,
    pub max: f64,
}

// LEAST SQUARES: energy_joules = slope * expected_frequency + intercept
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
}

impl Trend {
    pub fn fit(xs: &[f64], ys: &[f64]) -> Option<Self> {
        let n = xs.len().min(ys.len());
        if n < 2 {
            return None;
        }
        let nf = n as f64;
        let mx = xs[..n].iter().sum::<f64>() / nf;
        let my = ys[..n].iter().sum::<f64>() / nf;
        let mut sxy = 0.0;
        let mut sxx = 0.0;
        for (x, y) in xs[..n].iter().zip(&ys[..n]) {
            sxy += (x - mx) * (y - my);
            sxx += (x - mx) * (x - mx);
        }
        // ALL POINTS AT ONE FREQUENCY: NO SLOPE TO SPEAK OF
        if sxx == 0.0 {
            return None;
        }
        let slope = sxy / sxx;
        Some(Self {
            slope,
            intercept: my - slope * mx,
        })
    }
}

// PLAIN VALUES FIRST, THEN TABLES: TOML CANNOT PUT A VALUE AFTER A TABLE
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartInput {
    // IDENTITY LINE RUNS FROM 0 TO THE HIGHEST REQUESTED FREQUENCY
    pub identity_max: f64,
    pub frequency_domain: AxisDomain,
    pub energy_domain: AxisDomain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_trend: Option<Trend>,
    // SORTED BY EXPECTED FREQUENCY
    pub points: Vec<ChartPoint>,
}

impl ChartInput {
    pub fn from_rows(rows: &[AggregatedRow]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let mut points: Vec<ChartPoint> = rows
            .iter()
            .map(|r| ChartPoint {
                expected_frequency: r.expected_frequency,
                real_frequency: r.real_frequency,
                energy_joules: r.energy_joules,
            })
            .collect();
        points.sort_by(|a, b| a.expected_frequency.total_cmp(&b.expected_frequency));

        let freqs = points.iter().flat_map(|p| [p.expected_frequency, p.real_frequency]);
        let frequency_domain = span(freqs)?;

        let energy = span(points.iter().map(|p| p.energy_joules))?;
        let margin = (energy.max - energy.min) * ENERGY_MARGIN;
        let energy_domain = AxisDomain {
            min: energy.min - margin,
            max: energy.max + margin,
        };

        let xs: Vec<f64> = points.iter().map(|p| p.expected_frequency).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.energy_joules).collect();
        let identity_max = xs.iter().copied().fold(0.0, f64::max);

        Some(Self {
            energy_trend: Trend::fit(&xs, &ys),
            points,
            frequency_domain,
            energy_domain,
            identity_max,
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}

fn span(values: impl Iterator<Item = f64>) -> Option<AxisDomain> {
    values.fold(None, |acc, v| match acc {
        None => Some(AxisDomain { min: v, max: v }),
        Some(d) => Some(AxisDomain {
            min: d.min.min(v),
            max: d.max.max(v),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(hz: f64, real: f64, joules: f64) -> AggregatedRow {
        AggregatedRow {
            expected_frequency: hz,
            real_frequency: real,
            domain_energy_uj: joules * 1e6,
            mean_delta_ms: if real > 0.0 { 1000.0 / real } else { 0.0 },
            energy_joules: joules,
        }
    }

    #[test]
    fn trend_exact_line() {
        let t = Trend::fit(&[0.0, 1000.0, 2000.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!((t.slope - 0.001).abs() < 1e-12);
        assert!((t.intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn trend_needs_two_distinct_frequencies() {
        assert!(Trend::fit(&[5.0], &[1.0]).is_none());
        assert!(Trend::fit(&[5.0, 5.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn empty_rows_no_chart() {
        assert!(ChartInput::from_rows(&[]).is_none());
    }

    #[test]
    fn domains_and_ordering() {
        let rows = [row(2000.0, 1800.0, 3.0), row(0.0, 0.0, 1.0), row(1000.0, 1100.0, 2.0)];
        let c = ChartInput::from_rows(&rows).unwrap();
        let hz: Vec<f64> = c.points.iter().map(|p| p.expected_frequency).collect();
        assert_eq!(hz, vec![0.0, 1000.0, 2000.0]);
        assert_eq!(c.frequency_domain, AxisDomain { min: 0.0, max: 2000.0 });
        assert!((c.energy_domain.min - 0.9).abs() < 1e-12);
        assert!((c.energy_domain.max - 3.1).abs() < 1e-12);
        assert_eq!(c.identity_max, 2000.0);
        assert!(c.energy_trend.is_some());
    }

    #[test]
    fn saved_chart_input_reads_back() {
        let rows = [row(0.0, 0.0, 1.0), row(1000.0, 900.0, 2.0)];
        let c = ChartInput::from_rows(&rows).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots/chart.toml");
        c.save(&path).unwrap();

        let doc: toml::Value = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["identity_max"].as_float(), Some(1000.0));
        assert_eq!(doc["frequency_domain"]["max"].as_float(), Some(1000.0));
        let points = doc["points"].as_array().unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1]["real_frequency"].as_float(), Some(900.0));
        assert!(doc.get("energy_trend").is_some());
    }

    #[test]
    fn chart_without_trend_omits_it() {
        let c = ChartInput::from_rows(&[row(0.0, 0.0, 2.5)]).unwrap();
        let doc: toml::Value = toml::from_str(&c.to_toml().unwrap()).unwrap();
        assert!(doc.get("energy_trend").is_none());
        assert_eq!(doc["points"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn single_point_flat_energy_domain() {
        let c = ChartInput::from_rows(&[row(0.0, 0.0, 2.5)]).unwrap();
        assert_eq!(c.energy_domain, AxisDomain { min: 2.5, max: 2.5 });
        assert!(c.energy_trend.is_none());
    }
}
