use serde::{Deserialize, Serialize};

/// Ordered samples of one named output, produced once per run.
///
/// The sample vector is private so a distribution cannot be mutated after the
/// engine hands it out; consumers read it through [`OutputDistribution::samples`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDistribution {
    name: String,
    samples: Vec<f64>,
}

impl OutputDistribution {
    pub fn new(name: impl Into<String>, samples: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// A distribution over the first `n` samples (all of them if `n >= len`).
    pub fn prefix(&self, n: usize) -> OutputDistribution {
        let n = n.min(self.samples.len());
        Self {
            name: self.name.clone(),
            samples: self.samples[..n].to_vec(),
        }
    }

    /// Apply a pure per-sample transform, producing a new named distribution.
    pub fn map(&self, name: impl Into<String>, f: impl Fn(f64) -> f64) -> OutputDistribution {
        Self {
            name: name.into(),
            samples: self.samples.iter().map(|&x| f(x)).collect(),
        }
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }
}

/// Well-known output names.
pub mod outputs {
    pub const COMPOSITE: &str = "composite_score";
    pub const PTRS: &str = "ptrs_pct";
    pub const PEAK_SALES: &str = "risk_adjusted_peak_sales";
}
