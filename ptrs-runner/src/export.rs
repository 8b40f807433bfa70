//! JSON and CSV export for downstream chart tools.
//!
//! Persisted reports carry a `schema_version`; newer versions are rejected on load.

use std::path::Path;

use anyhow::{bail, Context, Result};
use ptrs_core::SimulationOutput;

use crate::portfolio::HistogramBin;
use crate::report::{SimulationReport, SCHEMA_VERSION};

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(report: &SimulationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize SimulationReport to JSON")
}

/// Deserialize a report, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<SimulationReport> {
    let report: SimulationReport =
        serde_json::from_str(json).context("failed to deserialize SimulationReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// One row per sample: index, composite, and any transformed outputs.
pub fn export_distribution_csv(output: &SimulationOutput) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["sample", output.composite.name()];
    let extra: Vec<&[f64]> = [&output.ptrs, &output.peak_sales]
        .into_iter()
        .flatten()
        .map(|d| {
            header.push(d.name());
            d.samples()
        })
        .collect();
    wtr.write_record(&header)?;

    for (i, v) in output.composite.samples().iter().enumerate() {
        let mut row = vec![i.to_string(), format!("{v:.6}")];
        row.extend(extra.iter().map(|s| format!("{:.6}", s[i])));
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_histogram_csv(bins: &[HistogramBin]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["lower", "upper", "midpoint", "count", "pct"])?;
    for b in bins {
        wtr.write_record([
            format!("{:.6}", b.lower),
            format!("{:.6}", b.upper),
            format!("{:.6}", b.midpoint),
            b.count.to_string(),
            format!("{:.4}", b.pct),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write `content` to `path`, creating parent directories.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::portfolio::histogram;
    use crate::report::run_pipeline;
    use ptrs_core::{FactorScore, RunControl};

    fn run() -> (SimulationReport, SimulationOutput) {
        let mut s = EngineSettings::default();
        s.simulation.iterations = 50;
        s.simulation.seed = Some(8);
        run_pipeline(
            &[FactorScore::new("a", 55.0, 1.0), FactorScore::new("b", 65.0, 1.0)],
            &s,
            &RunControl::new(),
        )
        .unwrap()
    }

    #[test]
    fn json_round_trip_preserves_report() {
        let (report, _) = run();
        let back = import_json(&export_json(&report).unwrap()).unwrap();
        assert_eq!(back.seed, report.seed);
        assert_eq!(back.generated_at, report.generated_at);
        assert_eq!(back.components, report.components);
        assert!((back.composite.statistics.mean - report.composite.statistics.mean).abs() < 1e-9);
    }

    #[test]
    fn future_schema_rejected() {
        let (mut report, _) = run();
        report.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&report).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn distribution_csv_has_one_row_per_sample() {
        let (_, output) = run();
        let csv = export_distribution_csv(&output).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "sample,composite_score");
        assert_eq!(lines.len(), 51);
        assert!(lines[1].starts_with("0,"));
    }

    #[test]
    fn histogram_csv_columns() {
        let bins = histogram(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        let csv = export_histogram_csv(&bins).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "lower,upper,midpoint,count,pct");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with(",2,50.0000"));
    }
}
