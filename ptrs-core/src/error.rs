//! Error taxonomy shared by every stage of the pipeline.
//!
//! All variants are recoverable by the caller. Numerical degeneracies (zero
//! variance, zero mean) are not errors; downstream calculators surface them as
//! `None` sentinels instead.

use thiserror::Error;

/// Errors from the simulation core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Bad weights, out-of-range component bounds, non-positive iterations.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A base score outside the 0–100 scale.
    #[error("invalid range for '{name}': base score {score} is outside [0, 100]")]
    InvalidRange { name: String, score: f64 },

    /// Statistics requested on zero samples.
    #[error("empty distribution: no samples to summarize")]
    EmptyDistribution,

    /// Convergence analysis misconfigured.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Cancellation observed during a run. No partial output is returned.
    #[error("run aborted after {completed} of {total} samples")]
    Aborted { completed: usize, total: usize },

    /// A background task panicked instead of returning.
    #[error("background task failed: {0}")]
    TaskFailed(String),
}

impl SimError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True for the cancellation outcome, which callers usually treat
    /// differently from a configuration mistake.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}
