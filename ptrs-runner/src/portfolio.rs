//! Side-by-side comparison of several entities (molecules, programs).
//!
//! Every entity goes through the full pipeline on the same pinned seed, so
//! differences between entities are not sampling noise from separate streams.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use ptrs_core::{ComponentUncertainty, RunControl, SimError, SimulationConfig, SimulationEngine};

use crate::risk::{RiskMetrics, RiskWeighting, DEFAULT_SUCCESS_THRESHOLD};
use crate::statistics::Statistics;

/// One entity to compare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub components: Vec<ComponentUncertainty>,
}

/// One equal-width histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub midpoint: f64,
    pub count: usize,
    /// Share of all samples in this bin, percent.
    pub pct: f64,
}

/// Bucket `samples` into `bins` equal-width bins spanning their own min..max.
///
/// Bins are half-open `[lower, upper)` except the last, which is closed.
/// When every sample is identical all mass lands in the first bin.
pub fn histogram(samples: &[f64], bins: usize) -> Result<Vec<HistogramBin>, SimError> {
    if bins == 0 {
        return Err(SimError::invalid_input("histogram needs at least one bin"));
    }
    if samples.is_empty() {
        return Err(SimError::EmptyDistribution);
    }

    let (lo, hi) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &x in samples {
        let idx = if width > 0.0 {
            (((x - lo) / width).floor() as usize).min(bins - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }

    let n = samples.len() as f64;
    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lower = lo + i as f64 * width;
            let upper = if i + 1 == bins { hi } else { lower + width };
            HistogramBin {
                lower,
                upper,
                midpoint: (lower + upper) / 2.0,
                count,
                pct: count as f64 / n * 100.0,
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub id: String,
    pub statistics: Statistics,
    pub risk_metrics: RiskMetrics,
    pub histogram: Vec<HistogramBin>,
}

/// Runs the per-entity pipeline. The entity cap is a caller policy; `None`
/// means unbounded.
#[derive(Debug, Clone)]
pub struct PortfolioComparator {
    engine: SimulationEngine,
    pub success_threshold: f64,
    pub weighting: RiskWeighting,
    pub max_entities: Option<usize>,
}

impl Default for PortfolioComparator {
    fn default() -> Self {
        Self::new(SimulationEngine::new())
    }
}

impl PortfolioComparator {
    pub fn new(engine: SimulationEngine) -> Self {
        Self {
            engine,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            weighting: RiskWeighting::default(),
            max_entities: None,
        }
    }

    pub fn with_max_entities(mut self, cap: usize) -> Self {
        self.max_entities = Some(cap);
        self
    }

    pub fn compare_many(
        &self,
        entities: &[Entity],
        config: &SimulationConfig,
        bin_count: usize,
    ) -> Result<Vec<ComparisonResult>, SimError> {
        self.compare_many_with_control(entities, config, bin_count, &RunControl::new())
    }

    /// Results come back in input order. The whole portfolio's sample count is
    /// registered on `control` before the first entity runs.
    pub fn compare_many_with_control(
        &self,
        entities: &[Entity],
        config: &SimulationConfig,
        bin_count: usize,
        control: &RunControl,
    ) -> Result<Vec<ComparisonResult>, SimError> {
        if let Some(cap) = self.max_entities {
            if entities.len() > cap {
                return Err(SimError::invalid_input(format!(
                    "{} entities exceed the comparison cap of {cap}",
                    entities.len()
                )));
            }
        }
        if bin_count == 0 {
            return Err(SimError::invalid_input("histogram needs at least one bin"));
        }
        let config = config.pinned();
        control.reserve(config.iterations.saturating_mul(entities.len()));

        tracing::info!(
            entities = entities.len(),
            bins = bin_count,
            "comparing portfolio"
        );

        entities
            .par_iter()
            .map(|entity| {
                let out = self
                    .engine
                    .run_with_control(&entity.components, &config, control)
                    .map_err(|e| tag(&entity.id, e))?;
                let samples = out.composite.samples();
                Ok(ComparisonResult {
                    id: entity.id.clone(),
                    statistics: Statistics::compute(samples)?,
                    risk_metrics: RiskMetrics::compute_with(
                        samples,
                        self.success_threshold,
                        &self.weighting,
                    )?,
                    histogram: histogram(samples, bin_count)?,
                })
            })
            .collect()
    }
}

/// Default comparator, no entity cap.
pub fn compare_many(
    entities: &[Entity],
    config: &SimulationConfig,
    bin_count: usize,
) -> Result<Vec<ComparisonResult>, SimError> {
    PortfolioComparator::default().compare_many(entities, config, bin_count)
}

/// Prefix input errors with the entity they came from.
fn tag(id: &str, err: SimError) -> SimError {
    match err {
        SimError::InvalidInput(msg) => SimError::InvalidInput(format!("entity '{id}': {msg}")),
        other => other,
    }
}
