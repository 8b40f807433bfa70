use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Upper end of the score scale. Every score and bound lives in `[0, SCORE_MAX]`.
pub const SCORE_MAX: f64 = 100.0;

/// Maximum distance of the weight sum from 1.0 after normalization.
pub const WEIGHT_TOLERANCE: f64 = 0.01;

/// A factor record as supplied by the external data layer.
///
/// Weights are on a 0–100 scale; the engine normalizes them before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub name: String,
    pub score: f64,
    pub weight: f64,
}

impl FactorScore {
    pub fn new(name: impl Into<String>, score: f64, weight: f64) -> Self {
        Self {
            name: name.into(),
            score,
            weight,
        }
    }
}

/// One weighted component with its plausible range.
///
/// Invariant: `0 <= min_score <= base_score <= max_score <= 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentUncertainty {
    pub name: String,
    pub base_score: f64,
    pub min_score: f64,
    pub max_score: f64,
    pub weight: f64,
}

impl ComponentUncertainty {
    pub fn new(
        name: impl Into<String>,
        base_score: f64,
        min_score: f64,
        max_score: f64,
        weight: f64,
    ) -> Self {
        Self {
            name: name.into(),
            base_score,
            min_score,
            max_score,
            weight,
        }
    }

    /// Check the range invariant and that the weight is a finite non-negative number.
    pub fn validate(&self) -> Result<(), SimError> {
        let all_finite = [self.base_score, self.min_score, self.max_score, self.weight]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(SimError::invalid_input(format!(
                "component '{}' has a non-finite score or weight",
                self.name
            )));
        }
        if !(0.0 <= self.min_score
            && self.min_score <= self.base_score
            && self.base_score <= self.max_score
            && self.max_score <= SCORE_MAX)
        {
            return Err(SimError::invalid_input(format!(
                "component '{}' violates 0 <= min ({}) <= base ({}) <= max ({}) <= 100",
                self.name, self.min_score, self.base_score, self.max_score
            )));
        }
        if self.weight < 0.0 {
            return Err(SimError::invalid_input(format!(
                "component '{}' has negative weight {}",
                self.name, self.weight
            )));
        }
        Ok(())
    }

    /// Width of the plausible range.
    pub fn spread(&self) -> f64 {
        self.max_score - self.min_score
    }
}

/// Validate every component and rescale weights so they sum to 1.0.
///
/// Fails when the set is empty, any component is malformed, or the weights
/// cannot be brought within [`WEIGHT_TOLERANCE`] of 1.0 (e.g. all zero).
pub fn normalize_weights(
    components: &[ComponentUncertainty],
) -> Result<Vec<ComponentUncertainty>, SimError> {
    if components.is_empty() {
        return Err(SimError::invalid_input("component set is empty"));
    }
    for c in components {
        c.validate()?;
    }

    let total: f64 = components.iter().map(|c| c.weight).sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(SimError::invalid_input(format!(
            "weights sum to {total}; cannot normalize"
        )));
    }

    let normalized: Vec<ComponentUncertainty> = components
        .iter()
        .map(|c| ComponentUncertainty {
            weight: c.weight / total,
            ..c.clone()
        })
        .collect();

    let check: f64 = normalized.iter().map(|c| c.weight).sum();
    if (check - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(SimError::invalid_input(format!(
            "weights sum to {check} after normalization"
        )));
    }
    if (total - 1.0).abs() > WEIGHT_TOLERANCE {
        tracing::debug!(raw_sum = total, "component weights rescaled to 1.0");
    }

    Ok(normalized)
}

/// Deterministic weighted mean of the base scores (the composite with no uncertainty).
pub fn weighted_base_score(components: &[ComponentUncertainty]) -> f64 {
    let total: f64 = components.iter().map(|c| c.weight).sum();
    if total <= 0.0 {
        return 0.0;
    }
    components
        .iter()
        .map(|c| c.base_score * c.weight)
        .sum::<f64>()
        / total
}
