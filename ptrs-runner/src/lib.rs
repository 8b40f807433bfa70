//! PTRS Runner: analysis on top of the simulation engine.
//!
//! This crate builds on `ptrs-core` to provide:
//! - Descriptive statistics, percentiles and confidence intervals
//! - Risk metrics with `None` sentinels for degenerate inputs
//! - Convergence analysis over an increasing sample schedule
//! - Stress scenarios with configurable risk ratings
//! - Portfolio comparison with normalized histograms
//! - TOML engine settings, versioned reports, JSON/CSV export

pub mod config;
pub mod convergence;
pub mod export;
pub mod portfolio;
pub mod report;
pub mod risk;
pub mod statistics;
pub mod stress;

pub use config::{ConfigError, EngineSettings};
pub use convergence::{
    ConvergenceAnalyzer, ConvergenceConfig, ConvergencePoint, ConvergenceResult,
};
pub use portfolio::{
    compare_many, histogram, ComparisonResult, Entity, HistogramBin, PortfolioComparator,
};
pub use report::{run_pipeline, DistributionSummary, SimulationReport, SCHEMA_VERSION};
pub use risk::{RiskMetrics, RiskWeighting};
pub use statistics::{ConfidenceInterval, Percentiles, Statistics};
pub use stress::{
    default_scenarios, stress_components, RiskRating, RiskRatingThresholds, Severity,
    StressEngine, StressResult, StressScenario,
};
