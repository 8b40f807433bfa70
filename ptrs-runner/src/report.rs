//! End-to-end pipeline: factor records → simulation → statistics and risk
//! metrics, wrapped in a versioned report envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ptrs_core::{
    ComponentUncertainty, FactorScore, OutputDistribution, RandomSource, RunControl, SimError,
    SimulationOutput,
};

use crate::config::EngineSettings;
use crate::risk::RiskMetrics;
use crate::statistics::{ConfidenceInterval, Statistics};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Statistics plus confidence interval for one named output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub name: String,
    pub statistics: Statistics,
    pub confidence_interval: ConfidenceInterval,
}

impl DistributionSummary {
    pub fn compute(dist: &OutputDistribution, confidence_level: f64) -> Result<Self, SimError> {
        Ok(Self {
            name: dist.name().to_string(),
            statistics: Statistics::compute(dist.samples())?,
            confidence_interval: ConfidenceInterval::compute(dist.samples(), confidence_level)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    /// Seed actually used; feeding it back reproduces every sample.
    pub seed: u64,
    pub iterations: usize,
    /// Components after uncertainty expansion, before weight normalization.
    pub components: Vec<ComponentUncertainty>,
    pub composite: DistributionSummary,
    pub risk_metrics: RiskMetrics,
    pub ptrs: Option<DistributionSummary>,
    pub peak_sales: Option<DistributionSummary>,
}

impl SimulationReport {
    pub fn build(
        output: &SimulationOutput,
        components: &[ComponentUncertainty],
        settings: &EngineSettings,
    ) -> Result<Self, SimError> {
        let level = settings.simulation.confidence_level;
        let summarize = |d: &Option<OutputDistribution>| {
            d.as_ref()
                .map(|d| DistributionSummary::compute(d, level))
                .transpose()
        };

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            seed: output.seed,
            iterations: output.composite.len(),
            components: components.to_vec(),
            composite: DistributionSummary::compute(&output.composite, level)?,
            risk_metrics: RiskMetrics::compute_with(
                output.composite.samples(),
                settings.risk.success_threshold,
                &settings.risk.weighting,
            )?,
            ptrs: summarize(&output.ptrs)?,
            peak_sales: summarize(&output.peak_sales)?,
        })
    }
}

/// Expand factor records into components using the configured uncertainty model.
///
/// Randomized spreads draw from the same master seed as the simulation, so a
/// seeded configuration reproduces bounds and samples together.
pub fn expand_factors(
    factors: &[FactorScore],
    settings: &EngineSettings,
) -> Result<Vec<ComponentUncertainty>, SimError> {
    let seed = settings
        .simulation
        .seed
        .ok_or_else(|| SimError::invalid_input("expand_factors needs a pinned seed"))?;
    settings
        .uncertainty_model()
        .expand_all(factors, &RandomSource::new(seed))
}

/// Run the whole pipeline for one factor set.
pub fn run_pipeline(
    factors: &[FactorScore],
    settings: &EngineSettings,
    control: &RunControl,
) -> Result<(SimulationReport, SimulationOutput), SimError> {
    let mut settings = settings.clone();
    settings.simulation = settings.simulation.pinned();

    let components = expand_factors(factors, &settings)?;
    let output = settings
        .engine()?
        .run_with_control(&components, &settings.simulation, control)?;
    let report = SimulationReport::build(&output, &components, &settings)?;
    Ok((report, output))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factors() -> Vec<FactorScore> {
        vec![
            FactorScore::new("efficacy", 80.0, 50.0),
            FactorScore::new("safety", 60.0, 30.0),
            FactorScore::new("market", 40.0, 20.0),
        ]
    }

    fn settings(seed: u64) -> EngineSettings {
        let mut s = EngineSettings::default();
        s.simulation.iterations = 4_000;
        s.simulation.seed = Some(seed);
        s
    }

    #[test]
    fn report_carries_envelope_fields() {
        let (report, output) = run_pipeline(&factors(), &settings(5), &RunControl::new()).unwrap();
        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.seed, 5);
        assert_eq!(report.iterations, 4_000);
        assert_eq!(report.components.len(), 3);
        assert_eq!(output.composite.len(), 4_000);
        assert!(report.ptrs.is_none());
    }

    #[test]
    fn factor_weights_on_hundred_scale_are_normalized() {
        let (report, _) = run_pipeline(&factors(), &settings(1), &RunControl::new()).unwrap();
        // 0.5 * 80 + 0.3 * 60 + 0.2 * 40
        assert!((report.composite.statistics.mean - 66.0).abs() < 1.0);
    }

    #[test]
    fn unseeded_pipeline_reports_replayable_seed() {
        let mut s = settings(0);
        s.simulation.seed = None;
        s.uncertainty = Some(ptrs_core::SpreadPolicy::Randomized {
            min_pct: 8.0,
            max_pct: 15.0,
        });
        let (first, _) = run_pipeline(&factors(), &s, &RunControl::new()).unwrap();

        s.simulation.seed = Some(first.seed);
        let (replay, _) = run_pipeline(&factors(), &s, &RunControl::new()).unwrap();
        assert_eq!(first.components, replay.components);
        assert_eq!(first.composite.statistics, replay.composite.statistics);
    }

    #[test]
    fn domain_profile_adds_transformed_outputs() {
        let mut s = settings(2);
        s.domain.profile = Some(ptrs_core::DevelopmentProfile {
            therapeutic_area: "neurology".into(),
            phase: "phase3".into(),
            peak_market: 1_000.0,
            max_share_pct: 20.0,
        });
        let (report, _) = run_pipeline(&factors(), &s, &RunControl::new()).unwrap();
        let ptrs = report.ptrs.unwrap();
        assert!(ptrs.statistics.mean > 0.0 && ptrs.statistics.mean <= 100.0);
        assert!(report.peak_sales.is_some());
    }

    #[test]
    fn out_of_range_factor_is_invalid_range() {
        let bad = vec![FactorScore::new("x", 140.0, 1.0)];
        let err = run_pipeline(&bad, &settings(1), &RunControl::new()).unwrap_err();
        assert!(matches!(err, SimError::InvalidRange { .. }));
    }

    #[test]
    fn report_serializes_to_json() {
        let (report, _) = run_pipeline(&factors(), &settings(3), &RunControl::new()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["schema_version"], 1);
        assert!(json["composite"]["statistics"]["percentiles"]["p95"].is_number());
        assert!(json["generated_at"].is_string());
    }
}
