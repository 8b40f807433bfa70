//! Descriptive statistics over an output distribution.
//!
//! Population moments (not sample-adjusted), matching the risk metrics.
//! Percentiles use the nearest-rank rule on the sorted samples:
//! `sorted[min(floor(p / 100 * n), n - 1)]`. The floor picks the lower index
//! on ties, so results never interpolate and are reproducible bit-for-bit.

use serde::{Deserialize, Serialize};

use ptrs_core::SimError;

/// Relative spread below which a distribution is treated as degenerate.
pub(crate) const DEGENERATE_REL: f64 = 1e-12;

/// True when `spread` is rounding noise relative to the magnitude `level`.
pub(crate) fn negligible(spread: f64, level: f64) -> bool {
    spread.abs() <= DEGENERATE_REL * level.abs().max(1.0)
}

/// Fixed percentile set reported for every distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

impl Percentiles {
    pub fn as_array(&self) -> [f64; 7] {
        [
            self.p5, self.p10, self.p25, self.p50, self.p75, self.p90, self.p95,
        ]
    }

    pub fn is_monotone(&self) -> bool {
        self.as_array().windows(2).all(|w| w[0] <= w[1])
    }
}

/// Summary of one distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Third standardized moment. 0 for a zero-variance distribution.
    pub skewness: f64,
    /// Fourth standardized moment minus 3. 0 for a zero-variance distribution.
    pub kurtosis: f64,
    pub percentiles: Percentiles,
    pub sample_size: usize,
}

impl Statistics {
    pub fn compute(samples: &[f64]) -> Result<Self, SimError> {
        if samples.is_empty() {
            return Err(SimError::EmptyDistribution);
        }
        let sorted = sorted_copy(samples);
        let mean = mean_f64(samples);
        let std = std_dev(samples);

        let percentiles = Percentiles {
            p5: percentile_sorted(&sorted, 5.0),
            p10: percentile_sorted(&sorted, 10.0),
            p25: percentile_sorted(&sorted, 25.0),
            p50: percentile_sorted(&sorted, 50.0),
            p75: percentile_sorted(&sorted, 75.0),
            p90: percentile_sorted(&sorted, 90.0),
            p95: percentile_sorted(&sorted, 95.0),
        };

        Ok(Self {
            mean,
            median: percentiles.p50,
            std_dev: std,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            skewness: skewness(samples, mean, std),
            kurtosis: excess_kurtosis(samples, mean, std),
            percentiles,
            sample_size: samples.len(),
        })
    }

    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }
}

/// Two-sided interval at a confidence level, by nearest rank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    /// Central interval containing `level` percent of the samples.
    pub fn compute(samples: &[f64], level: f64) -> Result<Self, SimError> {
        if samples.is_empty() {
            return Err(SimError::EmptyDistribution);
        }
        if !(level > 0.0 && level < 100.0) {
            return Err(SimError::invalid_input(format!(
                "confidence level {level} must lie strictly between 0 and 100"
            )));
        }
        let sorted = sorted_copy(samples);
        let tail = (100.0 - level) / 2.0;
        Ok(Self {
            level,
            lower: percentile_sorted(&sorted, tail),
            upper: percentile_sorted(&sorted, 100.0 - tail),
        })
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

// ─── Shared helpers ──────────────────────────────────────────────────

pub(crate) fn sorted_copy(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Nearest-rank percentile of an ascending slice; `p` in percent.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let idx = ((p / 100.0) * n as f64).floor() as usize;
    sorted[idx.min(n - 1)]
}

/// Arithmetic mean, clamped to the observed range so identical values
/// average to exactly that value.
pub fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    (values.iter().sum::<f64>() / values.len() as f64).clamp(lo, hi)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

fn skewness(values: &[f64], mean: f64, std: f64) -> f64 {
    if negligible(std, mean) {
        return 0.0;
    }
    values
        .iter()
        .map(|v| ((v - mean) / std).powi(3))
        .sum::<f64>()
        / values.len() as f64
}

fn excess_kurtosis(values: &[f64], mean: f64, std: f64) -> f64 {
    if negligible(std, mean) {
        return 0.0;
    }
    let m4 = values
        .iter()
        .map(|v| ((v - mean) / std).powi(4))
        .sum::<f64>()
        / values.len() as f64;
    m4 - 3.0
}
