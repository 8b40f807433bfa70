//! Engine settings loaded from TOML.
//!
//! Every section is optional and falls back to its defaults, so an empty file
//! is a valid configuration:
//!
//! ```toml
//! [simulation]
//! iterations = 20000
//! seed = 42
//!
//! [uncertainty]
//! type = "randomized"
//! min_pct = 8.0
//! max_pct = 15.0
//!
//! [domain.profile]
//! therapeutic_area = "oncology"
//! phase = "phase2"
//! peak_market = 2500.0
//! max_share_pct = 30.0
//!
//! [stress.thresholds]
//! critical = -50.0
//! high = -30.0
//! medium = -15.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ptrs_core::{
    DevelopmentProfile, DomainConstants, DomainModel, SimError, SimulationConfig,
    SimulationEngine, SpreadPolicy, UncertaintyModel,
};

use crate::convergence::ConvergenceConfig;
use crate::risk::{RiskWeighting, DEFAULT_SUCCESS_THRESHOLD};
use crate::stress::{default_scenarios, RiskRatingThresholds, StressScenario};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings: {0}")]
    Invalid(#[from] SimError),
}

/// Therapeutic-area tables plus the molecule they are applied to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainSettings {
    #[serde(flatten)]
    pub constants: DomainConstants,
    /// Without a profile, runs produce the composite distribution only.
    pub profile: Option<DevelopmentProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSettings {
    pub success_threshold: f64,
    pub weighting: RiskWeighting,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            weighting: RiskWeighting::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressSettings {
    pub thresholds: RiskRatingThresholds,
    /// Defaults to the built-in scenario library.
    pub scenarios: Vec<StressScenario>,
}

impl Default for StressSettings {
    fn default() -> Self {
        Self {
            thresholds: RiskRatingThresholds::default(),
            scenarios: default_scenarios(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioSettings {
    pub bins: usize,
    pub max_entities: Option<usize>,
}

impl Default for PortfolioSettings {
    fn default() -> Self {
        Self {
            bins: 20,
            max_entities: Some(5),
        }
    }
}

/// Everything a caller can tune, in one document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub simulation: SimulationConfig,
    /// Absent means a fixed spread of `simulation.uncertainty_range_pct`.
    pub uncertainty: Option<SpreadPolicy>,
    pub domain: DomainSettings,
    pub risk: RiskSettings,
    pub stress: StressSettings,
    pub convergence: ConvergenceConfig,
    pub portfolio: PortfolioSettings,
}

impl EngineSettings {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded engine settings");
        Ok(settings)
    }

    /// Cross-section checks that serde alone cannot express.
    pub fn validate(&self) -> Result<(), SimError> {
        self.simulation.validate()?;
        self.risk.weighting.validate()?;
        self.stress.thresholds.validate()?;
        for s in &self.stress.scenarios {
            s.validate()?;
        }
        self.convergence.tested_steps()?;
        if self.portfolio.bins == 0 {
            return Err(SimError::invalid_input("portfolio.bins must be >= 1"));
        }
        if let Some(policy) = &self.uncertainty {
            policy.validate()?;
        }
        self.domain_model()?;
        Ok(())
    }

    pub fn uncertainty_model(&self) -> UncertaintyModel {
        match self.uncertainty {
            Some(policy) => UncertaintyModel { policy },
            None => UncertaintyModel::fixed(self.simulation.uncertainty_range_pct),
        }
    }

    pub fn domain_model(&self) -> Result<Option<DomainModel>, SimError> {
        self.domain
            .profile
            .as_ref()
            .map(|p| self.domain.constants.resolve(p))
            .transpose()
    }

    /// Engine with the domain transform attached when a profile is configured.
    pub fn engine(&self) -> Result<SimulationEngine, SimError> {
        let engine = SimulationEngine::new();
        Ok(match self.domain_model()? {
            Some(model) => engine.with_domain(model),
            None => engine,
        })
    }
}
