//! Stress scenarios: multiplicative shocks to named components, measured
//! against an unstressed baseline run with the same seed.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use ptrs_core::domain::SCORE_MAX;
use ptrs_core::{
    ComponentUncertainty, RunControl, SimError, SimulationConfig, SimulationEngine,
    SimulationOutput,
};

use crate::statistics::mean_f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Moderate,
    Severe,
    Extreme,
}

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskRating {
    Low,
    Medium,
    High,
    Critical,
}

/// Cut-offs on `delta_pct`, each strictly-below. Must satisfy
/// `critical <= high <= medium`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskRatingThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for RiskRatingThresholds {
    fn default() -> Self {
        Self {
            critical: -50.0,
            high: -30.0,
            medium: -15.0,
        }
    }
}

impl RiskRatingThresholds {
    pub fn validate(&self) -> Result<(), SimError> {
        let finite = [self.critical, self.high, self.medium]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.critical > self.high || self.high > self.medium {
            return Err(SimError::invalid_input(format!(
                "risk rating thresholds must be finite and ordered critical <= high <= medium: {self:?}"
            )));
        }
        Ok(())
    }

    pub fn rate(&self, delta_pct: f64) -> RiskRating {
        if delta_pct < self.critical {
            RiskRating::Critical
        } else if delta_pct < self.high {
            RiskRating::High
        } else if delta_pct < self.medium {
            RiskRating::Medium
        } else {
            RiskRating::Low
        }
    }
}

/// Named shock: component name → percentage change of its base/min/max.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    pub id: String,
    pub name: String,
    pub severity: Severity,
    pub adjustments: BTreeMap<String, f64>,
}

impl StressScenario {
    pub fn new(id: impl Into<String>, name: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            severity,
            adjustments: BTreeMap::new(),
        }
    }

    pub fn adjust(mut self, component: impl Into<String>, delta_pct: f64) -> Self {
        self.adjustments.insert(component.into(), delta_pct);
        self
    }

    pub fn validate(&self) -> Result<(), SimError> {
        match self.adjustments.iter().find(|(_, v)| !v.is_finite()) {
            Some((k, v)) => Err(SimError::invalid_input(format!(
                "scenario '{}': adjustment for '{k}' is not finite ({v})",
                self.id
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    pub scenario: StressScenario,
    /// Mean of the baseline output (PTRS % with a domain model, else composite).
    pub base_ptrs: f64,
    pub stressed_ptrs: f64,
    pub delta_pct: f64,
    pub risk_rating: RiskRating,
}

/// Apply a scenario's shocks to a component set.
///
/// Named components have `base/min/max` scaled by `max(0, 1 + pct/100)` and
/// clamped to the score scale; weights are untouched. Scaling by a
/// non-negative factor keeps `min <= base <= max`.
pub fn stress_components(
    components: &[ComponentUncertainty],
    scenario: &StressScenario,
) -> Result<Vec<ComponentUncertainty>, SimError> {
    scenario.validate()?;
    for name in scenario.adjustments.keys() {
        if !components.iter().any(|c| &c.name == name) {
            tracing::warn!(scenario = %scenario.id, component = %name, "adjustment names no component");
        }
    }

    Ok(components
        .iter()
        .map(|c| match scenario.adjustments.get(&c.name) {
            Some(&pct) => {
                let factor = (1.0 + pct / 100.0).max(0.0);
                let scale = |v: f64| (v * factor).clamp(0.0, SCORE_MAX);
                ComponentUncertainty {
                    base_score: scale(c.base_score),
                    min_score: scale(c.min_score),
                    max_score: scale(c.max_score),
                    ..c.clone()
                }
            }
            None => c.clone(),
        })
        .collect())
}

/// Runs baseline and stressed simulations and rates the shift.
#[derive(Debug, Clone, Default)]
pub struct StressEngine {
    engine: SimulationEngine,
    thresholds: RiskRatingThresholds,
}

impl StressEngine {
    pub fn new(engine: SimulationEngine, thresholds: RiskRatingThresholds) -> Self {
        Self { engine, thresholds }
    }

    pub fn thresholds(&self) -> &RiskRatingThresholds {
        &self.thresholds
    }

    pub fn apply(
        &self,
        components: &[ComponentUncertainty],
        scenario: &StressScenario,
        config: &SimulationConfig,
    ) -> Result<StressResult, SimError> {
        let results = self.apply_all(components, std::slice::from_ref(scenario), config)?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| SimError::invalid_input("no stress result produced"))
    }

    pub fn apply_all(
        &self,
        components: &[ComponentUncertainty],
        scenarios: &[StressScenario],
        config: &SimulationConfig,
    ) -> Result<Vec<StressResult>, SimError> {
        self.apply_all_with_control(components, scenarios, config, &RunControl::new())
    }

    /// Every scenario is compared against one shared baseline; scenarios run
    /// in parallel and results keep input order. Progress on `control` covers
    /// the baseline and every scenario from the start.
    pub fn apply_all_with_control(
        &self,
        components: &[ComponentUncertainty],
        scenarios: &[StressScenario],
        config: &SimulationConfig,
        control: &RunControl,
    ) -> Result<Vec<StressResult>, SimError> {
        self.thresholds.validate()?;
        let config = config.pinned();
        control.reserve(config.iterations.saturating_mul(scenarios.len() + 1));

        let baseline = self.engine.run_with_control(components, &config, control)?;
        let base_mean = headline_mean(&baseline);

        scenarios
            .par_iter()
            .map(|scenario| {
                let stressed = stress_components(components, scenario)?;
                let out = self.engine.run_with_control(&stressed, &config, control)?;
                let stressed_mean = headline_mean(&out);
                let delta_pct = if base_mean != 0.0 {
                    (stressed_mean - base_mean) / base_mean * 100.0
                } else {
                    0.0
                };
                let risk_rating = self.thresholds.rate(delta_pct);
                tracing::debug!(
                    scenario = %scenario.id,
                    delta_pct,
                    rating = ?risk_rating,
                    "stress scenario applied"
                );
                Ok(StressResult {
                    scenario: scenario.clone(),
                    base_ptrs: base_mean,
                    stressed_ptrs: stressed_mean,
                    delta_pct,
                    risk_rating,
                })
            })
            .collect()
    }
}

fn headline_mean(out: &SimulationOutput) -> f64 {
    let dist = out.ptrs.as_ref().unwrap_or(&out.composite);
    mean_f64(dist.samples())
}

/// Built-in scenario library over the standard factor names.
pub fn default_scenarios() -> Vec<StressScenario> {
    vec![
        StressScenario::new("efficacy_miss", "Efficacy below expectations", Severity::Moderate)
            .adjust("efficacy", -20.0),
        StressScenario::new("safety_signal", "Emerging safety signal", Severity::Severe)
            .adjust("safety", -35.0)
            .adjust("regulatory", -15.0),
        StressScenario::new("competitive_entry", "Competitor launches first", Severity::Moderate)
            .adjust("market", -25.0)
            .adjust("commercial", -10.0),
        StressScenario::new("pricing_pressure", "Payer pricing pressure", Severity::Severe)
            .adjust("market", -15.0)
            .adjust("commercial", -30.0),
        StressScenario::new("regulatory_setback", "Complete response letter", Severity::Extreme)
            .adjust("regulatory", -60.0)
            .adjust("efficacy", -20.0),
        StressScenario::new("program_failure", "Pivotal trial failure", Severity::Extreme)
            .adjust("efficacy", -70.0)
            .adjust("safety", -30.0)
            .adjust("market", -40.0),
    ]
}
