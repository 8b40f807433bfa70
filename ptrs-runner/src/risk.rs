//! Risk-adjusted metrics over a score distribution.
//!
//! Sharpe/Sortino are repurposed as reward-to-uncertainty ratios: the
//! distribution is a score, not a return series, so there is no risk-free
//! rate and no annualization. Ratios whose denominator vanishes resolve to
//! `None` ("not applicable") instead of letting NaN or infinity reach a report.

use serde::{Deserialize, Serialize};

use ptrs_core::SimError;

use crate::statistics::{mean_f64, negligible, percentile_sorted, sorted_copy, std_dev};

/// Composite score counted as a success when no threshold is configured.
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 50.0;

/// Tuning for the blended value metrics.
///
/// ```text
/// risk_weighted_value  = (mean - volatility_penalty * std_dev)
///                        * ((1 - success_weight) + success_weight * pos / 100)
/// certainty_equivalent = risk_weighted_value - 0.5 * risk_aversion * variance
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeighting {
    pub volatility_penalty: f64,
    /// Share of the value that is conditional on clearing the success threshold, 0–1.
    pub success_weight: f64,
    pub risk_aversion: f64,
}

impl Default for RiskWeighting {
    fn default() -> Self {
        Self {
            volatility_penalty: 0.5,
            success_weight: 0.3,
            risk_aversion: 0.05,
        }
    }
}

impl RiskWeighting {
    pub fn validate(&self) -> Result<(), SimError> {
        let ok = self.volatility_penalty.is_finite()
            && self.volatility_penalty >= 0.0
            && (0.0..=1.0).contains(&self.success_weight)
            && self.risk_aversion.is_finite()
            && self.risk_aversion >= 0.0;
        if ok {
            Ok(())
        } else {
            Err(SimError::invalid_input(format!(
                "risk weighting out of range: {self:?}"
            )))
        }
    }
}

/// Risk metrics derived from one distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// `mean / std_dev`; `None` when the distribution has no spread.
    pub sharpe_ratio: Option<f64>,
    /// `mean / downside_deviation`; `None` when nothing falls below the mean.
    pub sortino_ratio: Option<f64>,
    /// `upside_potential / (mean - value_at_risk)`; `None` when VaR equals the mean.
    pub risk_reward_ratio: Option<f64>,
    /// 5th percentile: the level not undershot with 95% confidence.
    pub value_at_risk: f64,
    /// Mean of all samples at or below the VaR (CVaR).
    pub expected_shortfall: f64,
    /// Root-mean-square distance below the mean, over samples below the mean.
    pub downside_deviation: f64,
    /// Mean of samples above the median, minus the median.
    pub upside_potential: f64,
    pub risk_weighted_value: f64,
    pub certainty_equivalent: f64,
    /// Percentage of samples at or above the success threshold.
    pub probability_of_success: f64,
}

impl RiskMetrics {
    /// Compute with default [`RiskWeighting`].
    pub fn compute(samples: &[f64], success_threshold: f64) -> Result<Self, SimError> {
        Self::compute_with(samples, success_threshold, &RiskWeighting::default())
    }

    pub fn compute_with(
        samples: &[f64],
        success_threshold: f64,
        weighting: &RiskWeighting,
    ) -> Result<Self, SimError> {
        if samples.is_empty() {
            return Err(SimError::EmptyDistribution);
        }
        weighting.validate()?;

        let n = samples.len() as f64;
        let sorted = sorted_copy(samples);
        let mean = mean_f64(samples);
        let std = std_dev(samples);
        let median = percentile_sorted(&sorted, 50.0);

        let downside = downside_deviation(samples, mean);

        let value_at_risk = percentile_sorted(&sorted, 5.0);
        let tail: Vec<f64> = sorted
            .iter()
            .copied()
            .take_while(|&x| x <= value_at_risk)
            .collect();
        // Rounding in the mean must not push CVaR above the VaR it averages under.
        let expected_shortfall = mean_f64(&tail).min(value_at_risk);

        let above_median: Vec<f64> = sorted.iter().copied().filter(|&x| x > median).collect();
        let upside_potential = if above_median.is_empty() {
            0.0
        } else {
            mean_f64(&above_median) - median
        };

        let probability_of_success =
            samples.iter().filter(|&&x| x >= success_threshold).count() as f64 / n * 100.0;

        let risk_weighted_value = (mean - weighting.volatility_penalty * std)
            * ((1.0 - weighting.success_weight)
                + weighting.success_weight * probability_of_success / 100.0);
        let certainty_equivalent =
            risk_weighted_value - 0.5 * weighting.risk_aversion * std * std;

        Ok(Self {
            sharpe_ratio: guarded_ratio(mean, std, mean),
            sortino_ratio: guarded_ratio(mean, downside, mean),
            risk_reward_ratio: guarded_ratio(upside_potential, mean - value_at_risk, mean),
            value_at_risk,
            expected_shortfall,
            downside_deviation: downside,
            upside_potential,
            risk_weighted_value,
            certainty_equivalent,
            probability_of_success,
        })
    }
}

/// Semi-deviation below the mean: RMS of `(x - mean)` over samples `x < mean`.
/// Zero when no sample lies below the mean.
fn downside_deviation(samples: &[f64], mean: f64) -> f64 {
    let below: Vec<f64> = samples
        .iter()
        .filter(|&&x| x < mean)
        .map(|&x| (x - mean).powi(2))
        .collect();
    if below.is_empty() {
        return 0.0;
    }
    mean_f64(&below).sqrt()
}

/// `None` when the denominator is rounding noise relative to `level`.
fn guarded_ratio(numerator: f64, denominator: f64, level: f64) -> Option<f64> {
    if negligible(denominator, level) {
        return None;
    }
    let r = numerator / denominator;
    r.is_finite().then_some(r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spread_samples() -> Vec<f64> {
        (0..100).map(|i| 40.0 + i as f64 * 0.4).collect()
    }

    #[test]
    fn empty_is_error() {
        assert_eq!(
            RiskMetrics::compute(&[], 50.0),
            Err(SimError::EmptyDistribution)
        );
    }

    #[test]
    fn identical_samples_use_sentinels() {
        let r = RiskMetrics::compute(&[60.0; 500], 50.0).unwrap();
        assert_eq!(r.sharpe_ratio, None);
        assert_eq!(r.sortino_ratio, None);
        assert_eq!(r.risk_reward_ratio, None);
        assert_eq!(r.downside_deviation, 0.0);
        assert_eq!(r.upside_potential, 0.0);
        assert_eq!(r.value_at_risk, 60.0);
        assert_eq!(r.expected_shortfall, 60.0);
        assert_eq!(r.probability_of_success, 100.0);
        assert!(r.risk_weighted_value.is_finite());
        assert!(r.certainty_equivalent.is_finite());
    }

    #[test]
    fn identical_non_dyadic_samples_use_sentinels() {
        let r = RiskMetrics::compute(&vec![68.3; 20_000], 50.0).unwrap();
        assert_eq!(r.sharpe_ratio, None);
        assert_eq!(r.sortino_ratio, None);
        assert_eq!(r.risk_reward_ratio, None);
        assert_eq!(r.downside_deviation, 0.0);
        assert_eq!(r.expected_shortfall, 68.3);
    }

    #[test]
    fn zero_mean_zero_variance_is_safe() {
        let r = RiskMetrics::compute(&[0.0; 10], 50.0).unwrap();
        assert_eq!(r.sharpe_ratio, None);
        assert_eq!(r.probability_of_success, 0.0);
        assert_eq!(r.risk_weighted_value, 0.0);
    }

    #[test]
    fn var_and_cvar_ordering() {
        let r = RiskMetrics::compute(&spread_samples(), 50.0).unwrap();
        // floor(0.05 * 100) = 5 → 40 + 5 * 0.4
        assert!((r.value_at_risk - 42.0).abs() < 1e-12);
        assert!(r.expected_shortfall <= r.value_at_risk);
        // mean of 40.0, 40.4, ..., 42.0
        assert!((r.expected_shortfall - 41.0).abs() < 1e-9);
    }

    #[test]
    fn sharpe_and_sortino_positive_for_positive_scores() {
        let r = RiskMetrics::compute(&spread_samples(), 50.0).unwrap();
        let sharpe = r.sharpe_ratio.unwrap();
        let sortino = r.sortino_ratio.unwrap();
        assert!(sharpe > 0.0);
        assert!(sortino > 0.0);
        assert!(r.downside_deviation > 0.0);
    }

    #[test]
    fn probability_of_success_counts_threshold_inclusively() {
        let r = RiskMetrics::compute(&[10.0, 20.0, 30.0, 40.0], 30.0).unwrap();
        assert_eq!(r.probability_of_success, 50.0);
    }

    #[test]
    fn upside_potential_is_mean_above_median_minus_median() {
        // sorted: 1 2 3 4 5 6; median index floor(3) = 3 → 4; above: 5, 6
        let r = RiskMetrics::compute(&[6.0, 1.0, 5.0, 2.0, 4.0, 3.0], 0.0).unwrap();
        assert!((r.upside_potential - 1.5).abs() < 1e-12);
    }

    #[test]
    fn weighting_changes_value_metrics_only() {
        let base = RiskMetrics::compute(&spread_samples(), 50.0).unwrap();
        let heavy = RiskMetrics::compute_with(
            &spread_samples(),
            50.0,
            &RiskWeighting {
                volatility_penalty: 2.0,
                success_weight: 0.3,
                risk_aversion: 0.5,
            },
        )
        .unwrap();
        assert_eq!(base.sharpe_ratio, heavy.sharpe_ratio);
        assert!(heavy.risk_weighted_value < base.risk_weighted_value);
        assert!(heavy.certainty_equivalent < base.certainty_equivalent);
    }

    #[test]
    fn certainty_equivalent_never_exceeds_risk_weighted_value() {
        let r = RiskMetrics::compute(&spread_samples(), 50.0).unwrap();
        assert!(r.certainty_equivalent <= r.risk_weighted_value);
    }

    #[test]
    fn invalid_weighting_rejected() {
        let bad = RiskWeighting {
            success_weight: 1.5,
            ..RiskWeighting::default()
        };
        assert!(RiskMetrics::compute_with(&[1.0, 2.0], 1.0, &bad).is_err());
    }

    #[test]
    fn serialized_sentinel_is_null() {
        let r = RiskMetrics::compute(&[5.0; 3], 1.0).unwrap();
        let json = serde_json::to_value(&r).unwrap();
        assert!(json["sharpe_ratio"].is_null());
    }
}
