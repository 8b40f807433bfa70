//! Domain transforms applied per sample after the composite is drawn.
//!
//! A composite score on the 0–100 scale is mapped to a probability of
//! technical success (PTS), a probability of regulatory success (PRS), their
//! product PTRS, and a risk-adjusted peak-sales estimate. Every rate and
//! multiplier is data supplied by the caller through [`DomainConstants`];
//! none of them are literals inside the mapping.
//!
//! ```text
//! tilt  = 1 + sensitivity * (composite / 100 - 0.5)
//! pts   = clamp(pts_base(area) * phase_multiplier(phase) * tilt, 0, 1)
//! prs   = clamp(prs_base(area) * tilt, 0, 1)
//! ptrs  = pts * prs
//! peak  = peak_market * max_share * (composite / 100) * ptrs
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{outputs, OutputDistribution, SCORE_MAX};
use crate::error::SimError;

/// Base success rates for one therapeutic area, as fractions in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaRates {
    pub pts: f64,
    pub prs: f64,
}

/// Externally supplied domain constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConstants {
    /// Therapeutic area → base PTS/PRS.
    pub area_rates: BTreeMap<String, AreaRates>,
    /// Development phase → multiplier on PTS.
    pub phase_multipliers: BTreeMap<String, f64>,
    /// How strongly the composite score tilts the base rates around the midpoint.
    pub score_sensitivity: f64,
}

impl Default for DomainConstants {
    fn default() -> Self {
        let area_rates = [
            ("oncology", 0.35, 0.82),
            ("neurology", 0.42, 0.85),
            ("cardiovascular", 0.50, 0.88),
            ("infectious_disease", 0.58, 0.90),
            ("immunology", 0.52, 0.87),
            ("rare_disease", 0.55, 0.92),
            ("metabolic", 0.48, 0.86),
        ]
        .into_iter()
        .map(|(k, pts, prs)| (k.to_string(), AreaRates { pts, prs }))
        .collect();

        let phase_multipliers = [
            ("preclinical", 0.25),
            ("phase1", 0.45),
            ("phase2", 0.70),
            ("phase3", 1.00),
            ("filed", 1.60),
        ]
        .into_iter()
        .map(|(k, m)| (k.to_string(), m))
        .collect();

        Self {
            area_rates,
            phase_multipliers,
            score_sensitivity: 1.0,
        }
    }
}

impl DomainConstants {
    /// Resolve a profile against the tables.
    pub fn resolve(&self, profile: &DevelopmentProfile) -> Result<DomainModel, SimError> {
        let rates = self
            .area_rates
            .get(&profile.therapeutic_area)
            .ok_or_else(|| {
                SimError::invalid_input(format!(
                    "unknown therapeutic area '{}'",
                    profile.therapeutic_area
                ))
            })?;
        let phase_multiplier = *self
            .phase_multipliers
            .get(&profile.phase)
            .ok_or_else(|| SimError::invalid_input(format!("unknown phase '{}'", profile.phase)))?;

        let model = DomainModel {
            pts_base: rates.pts,
            prs_base: rates.prs,
            phase_multiplier,
            score_sensitivity: self.score_sensitivity,
            peak_market: profile.peak_market,
            max_share_pct: profile.max_share_pct,
        };
        model.validate()?;
        Ok(model)
    }
}

/// Identifies which rows of [`DomainConstants`] apply to one molecule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevelopmentProfile {
    pub therapeutic_area: String,
    pub phase: String,
    /// Addressable market at peak, in the caller's currency unit.
    pub peak_market: f64,
    /// Maximum attainable market share at a perfect composite score, 0–100.
    pub max_share_pct: f64,
}

/// Fully resolved per-sample mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainModel {
    pub pts_base: f64,
    pub prs_base: f64,
    pub phase_multiplier: f64,
    pub score_sensitivity: f64,
    pub peak_market: f64,
    pub max_share_pct: f64,
}

impl DomainModel {
    fn validate(&self) -> Result<(), SimError> {
        let unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !unit(self.pts_base) || !unit(self.prs_base) {
            return Err(SimError::invalid_input(
                "base success rates must lie in [0, 1]",
            ));
        }
        if !(self.phase_multiplier.is_finite() && self.phase_multiplier >= 0.0) {
            return Err(SimError::invalid_input("phase multiplier must be >= 0"));
        }
        if !(self.peak_market.is_finite() && self.peak_market >= 0.0) {
            return Err(SimError::invalid_input("peak market must be >= 0"));
        }
        if !(0.0..=100.0).contains(&self.max_share_pct) {
            return Err(SimError::invalid_input("max share must lie in [0, 100]"));
        }
        // A negative tilt would make PTRS fall as the composite rises.
        if !(self.score_sensitivity.is_finite() && self.score_sensitivity >= 0.0) {
            return Err(SimError::invalid_input(format!(
                "score sensitivity {} must be a non-negative number",
                self.score_sensitivity
            )));
        }
        Ok(())
    }

    fn tilt(&self, composite: f64) -> f64 {
        1.0 + self.score_sensitivity * (composite / SCORE_MAX - 0.5)
    }

    pub fn pts(&self, composite: f64) -> f64 {
        (self.pts_base * self.phase_multiplier * self.tilt(composite)).clamp(0.0, 1.0)
    }

    pub fn prs(&self, composite: f64) -> f64 {
        (self.prs_base * self.tilt(composite)).clamp(0.0, 1.0)
    }

    /// PTRS as a fraction in `[0, 1]`.
    pub fn ptrs(&self, composite: f64) -> f64 {
        self.pts(composite) * self.prs(composite)
    }

    /// Peak sales weighted by the probability of reaching market.
    pub fn risk_adjusted_peak_sales(&self, composite: f64) -> f64 {
        let share = self.max_share_pct / 100.0 * (composite / SCORE_MAX).clamp(0.0, 1.0);
        self.peak_market * share * self.ptrs(composite)
    }

    /// PTRS distribution in percent.
    pub fn ptrs_distribution(&self, composite: &OutputDistribution) -> OutputDistribution {
        composite.map(outputs::PTRS, |c| self.ptrs(c) * 100.0)
    }

    pub fn peak_sales_distribution(&self, composite: &OutputDistribution) -> OutputDistribution {
        composite.map(outputs::PEAK_SALES, |c| self.risk_adjusted_peak_sales(c))
    }
}
