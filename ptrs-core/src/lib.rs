//! PTRS Core: components, seeded sampling, and the Monte Carlo engine.
//!
//! This crate contains the simulation heart of the scoring engine:
//! - Domain types (component uncertainty, factor records, output distributions)
//! - Error taxonomy shared by every stage
//! - Injectable, hash-derived random source
//! - Uncertainty model (fixed or randomized spread)
//! - Triangular per-component sampling
//! - Parallel, cancellable simulation engine with progress reporting
//! - Per-sample domain transforms (PTRS, risk-adjusted peak sales)

pub mod domain;
pub mod engine;
pub mod error;
pub mod rng;
pub mod sampling;
pub mod transform;
pub mod uncertainty;

pub use domain::{ComponentUncertainty, FactorScore, OutputDistribution};
pub use engine::{simulate, RunControl, SimulationConfig, SimulationEngine, SimulationOutput, SimulationTask};
pub use error::SimError;
pub use rng::RandomSource;
pub use transform::{DevelopmentProfile, DomainConstants, DomainModel};
pub use uncertainty::{SpreadPolicy, UncertaintyModel};
