//! Domain types for the scoring engine

pub mod component;
pub mod distribution;

pub use component::{
    normalize_weights, weighted_base_score, ComponentUncertainty, FactorScore, SCORE_MAX,
    WEIGHT_TOLERANCE,
};
pub use distribution::{outputs, OutputDistribution};
