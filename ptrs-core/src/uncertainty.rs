//! Uncertainty model: turns a named, weighted base score into a bounded range.
//!
//! `min = clamp(base - spread, 0, 100)` and `max = clamp(base + spread, 0, 100)`,
//! where `spread` is a percentage of the 0–100 scale. The spread is either
//! fixed or drawn uniformly from a bounded band using the injected random
//! source, never from a global generator.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{ComponentUncertainty, FactorScore, SCORE_MAX};
use crate::error::SimError;
use crate::rng::{RandomSource, UNCERTAINTY_STREAM};

/// How the half-width of a component's range is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpreadPolicy {
    /// Same spread for every component.
    Fixed { pct: f64 },
    /// Spread drawn uniformly in `[min_pct, max_pct]` per component.
    Randomized { min_pct: f64, max_pct: f64 },
}

impl Default for SpreadPolicy {
    fn default() -> Self {
        Self::Fixed { pct: 10.0 }
    }
}

impl SpreadPolicy {
    pub fn validate(&self) -> Result<(), SimError> {
        match *self {
            Self::Fixed { pct } if pct.is_finite() && pct >= 0.0 => Ok(()),
            Self::Fixed { pct } => Err(SimError::invalid_input(format!(
                "uncertainty range {pct}% must be a non-negative number"
            ))),
            Self::Randomized { min_pct, max_pct }
                if min_pct.is_finite() && max_pct.is_finite() && 0.0 <= min_pct && min_pct <= max_pct =>
            {
                Ok(())
            }
            Self::Randomized { min_pct, max_pct } => Err(SimError::invalid_input(format!(
                "randomized spread band [{min_pct}, {max_pct}] is not a valid non-negative range"
            ))),
        }
    }
}

/// Expands base scores into [`ComponentUncertainty`] values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct UncertaintyModel {
    pub policy: SpreadPolicy,
}

impl UncertaintyModel {
    pub fn fixed(pct: f64) -> Self {
        Self {
            policy: SpreadPolicy::Fixed { pct },
        }
    }

    /// Randomized spread within `[min_pct, max_pct]`, e.g. `randomized(8.0, 15.0)`.
    pub fn randomized(min_pct: f64, max_pct: f64) -> Self {
        Self {
            policy: SpreadPolicy::Randomized { min_pct, max_pct },
        }
    }

    /// Expand one component. `rng` is only consulted for randomized spreads.
    pub fn expand<R: Rng + ?Sized>(
        &self,
        name: &str,
        base_score: f64,
        weight: f64,
        rng: &mut R,
    ) -> Result<ComponentUncertainty, SimError> {
        check_base(name, base_score)?;
        self.policy.validate()?;

        let spread = match self.policy {
            SpreadPolicy::Fixed { pct } => pct,
            SpreadPolicy::Randomized { min_pct, max_pct } => rng.gen_range(min_pct..=max_pct),
        };
        Ok(with_spread(name, base_score, weight, spread))
    }

    /// Expand a full factor set. Component `i` draws from its own stream
    /// `(UNCERTAINTY_STREAM, i)`, so bounds do not depend on evaluation order.
    pub fn expand_all(
        &self,
        factors: &[FactorScore],
        source: &RandomSource,
    ) -> Result<Vec<ComponentUncertainty>, SimError> {
        factors
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let mut rng = source.rng_for(UNCERTAINTY_STREAM, i as u64);
                self.expand(&f.name, f.score, f.weight, &mut rng)
            })
            .collect()
    }
}

/// Fixed-spread expansion with no randomness involved.
pub fn expand(
    name: &str,
    base_score: f64,
    weight: f64,
    uncertainty_range_pct: f64,
) -> Result<ComponentUncertainty, SimError> {
    check_base(name, base_score)?;
    SpreadPolicy::Fixed {
        pct: uncertainty_range_pct,
    }
    .validate()?;
    Ok(with_spread(name, base_score, weight, uncertainty_range_pct))
}

fn check_base(name: &str, base_score: f64) -> Result<(), SimError> {
    if (0.0..=SCORE_MAX).contains(&base_score) {
        Ok(())
    } else {
        Err(SimError::InvalidRange {
            name: name.to_string(),
            score: base_score,
        })
    }
}

fn with_spread(name: &str, base_score: f64, weight: f64, spread: f64) -> ComponentUncertainty {
    ComponentUncertainty {
        name: name.to_string(),
        base_score,
        min_score: (base_score - spread).clamp(0.0, SCORE_MAX),
        max_score: (base_score + spread).clamp(0.0, SCORE_MAX),
        weight,
    }
}
