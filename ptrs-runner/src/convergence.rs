//! Convergence analysis: how the confidence interval of the composite mean
//! tightens as the sample count grows.
//!
//! One pool of `max(tested step)` samples is drawn. Each step `n` then reads
//! the first `n` samples of that pool, which are exactly the samples a fresh
//! `n`-iteration run with the same seed would produce.

use serde::{Deserialize, Serialize};

use ptrs_core::{ComponentUncertainty, RunControl, SimError, SimulationConfig, SimulationEngine};

use crate::statistics::{mean_f64, std_dev};

/// z-value of a two-sided 95% normal interval.
pub const Z_95: f64 = 1.96;

pub const DEFAULT_SCHEDULE: [usize; 9] = [100, 250, 500, 1_000, 2_500, 5_000, 10_000, 25_000, 50_000];

/// Configuration for [`ConvergenceAnalyzer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// A step is converged when its CI width is at or below this many score points.
    pub threshold_pct: f64,
    pub max_iterations: usize,
    /// Strictly increasing sample counts to test.
    pub schedule: Vec<usize>,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            threshold_pct: 3.0,
            max_iterations: 50_000,
            schedule: DEFAULT_SCHEDULE.to_vec(),
        }
    }
}

impl ConvergenceConfig {
    /// Validate and return the steps that will actually be tested: the
    /// schedule up to `max_iterations`, then `max_iterations` itself when it
    /// lies past the last of those.
    pub fn tested_steps(&self) -> Result<Vec<usize>, SimError> {
        if self.schedule.is_empty() {
            return Err(SimError::InvalidSchedule("schedule is empty".into()));
        }
        if self.schedule[0] == 0 {
            return Err(SimError::InvalidSchedule(
                "schedule steps must be >= 1".into(),
            ));
        }
        if let Some(w) = self.schedule.windows(2).find(|w| w[0] >= w[1]) {
            return Err(SimError::InvalidSchedule(format!(
                "schedule must be strictly increasing ({} then {})",
                w[0], w[1]
            )));
        }
        if self.max_iterations < self.schedule[0] {
            return Err(SimError::InvalidSchedule(format!(
                "max_iterations {} is below the smallest step {}",
                self.max_iterations, self.schedule[0]
            )));
        }
        if !(self.threshold_pct.is_finite() && self.threshold_pct > 0.0) {
            return Err(SimError::invalid_input(format!(
                "convergence threshold {} must be positive",
                self.threshold_pct
            )));
        }
        let mut steps: Vec<usize> = self
            .schedule
            .iter()
            .copied()
            .take_while(|&n| n <= self.max_iterations)
            .collect();
        // The requested maximum is always measured, even between schedule steps.
        if steps.last().is_some_and(|&last| last < self.max_iterations) {
            steps.push(self.max_iterations);
        }
        Ok(steps)
    }
}

/// Measurement at one sample count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePoint {
    pub iterations: usize,
    pub mean: f64,
    pub std_error: f64,
    pub ci95_lower: f64,
    pub ci95_upper: f64,
    pub ci_width: f64,
    pub is_converged: bool,
}

impl ConvergencePoint {
    fn measure(samples: &[f64], threshold_pct: f64) -> Self {
        let n = samples.len();
        let mean = mean_f64(samples);
        let sd = std_dev(samples);
        let std_error = (sd * sd / n as f64).sqrt();
        let ci_width = 2.0 * Z_95 * std_error;
        Self {
            iterations: n,
            mean,
            std_error,
            ci95_lower: mean - Z_95 * std_error,
            ci95_upper: mean + Z_95 * std_error,
            ci_width,
            is_converged: ci_width <= threshold_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceResult {
    pub points: Vec<ConvergencePoint>,
    /// First converged step, or the largest tested step when none converged.
    pub optimal_iterations: usize,
    pub converged: bool,
    /// Relative CI-width reduction from the first to the last tested step, percent.
    pub convergence_rate_pct: f64,
    /// `max(0, (1 - final_std_error / final_mean) * 100)`.
    pub stability: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ConvergenceAnalyzer {
    engine: SimulationEngine,
}

impl ConvergenceAnalyzer {
    pub fn new(engine: SimulationEngine) -> Self {
        Self { engine }
    }

    pub fn analyze(
        &self,
        components: &[ComponentUncertainty],
        sim: &SimulationConfig,
        config: &ConvergenceConfig,
    ) -> Result<ConvergenceResult, SimError> {
        self.analyze_with_control(components, sim, config, &RunControl::new())
    }

    /// `sim.iterations` is ignored: the pool size comes from the schedule.
    pub fn analyze_with_control(
        &self,
        components: &[ComponentUncertainty],
        sim: &SimulationConfig,
        config: &ConvergenceConfig,
        control: &RunControl,
    ) -> Result<ConvergenceResult, SimError> {
        let steps = config.tested_steps()?;
        // tested_steps guarantees at least the first step survives
        let pool_size = steps.last().copied().unwrap_or(config.schedule[0]);

        let pool_config = SimulationConfig {
            iterations: pool_size,
            ..sim.clone()
        };
        let out = self
            .engine
            .run_with_control(components, &pool_config, control)?;
        let pool = out.composite.samples();

        let points: Vec<ConvergencePoint> = steps
            .iter()
            .map(|&n| {
                let p = ConvergencePoint::measure(&pool[..n], config.threshold_pct);
                tracing::debug!(
                    iterations = n,
                    mean = p.mean,
                    ci_width = p.ci_width,
                    converged = p.is_converged,
                    "convergence step"
                );
                p
            })
            .collect();

        Ok(summarize(points, out.seed))
    }
}

/// Free-function form with an explicit schedule.
pub fn analyze(
    components: &[ComponentUncertainty],
    threshold_pct: f64,
    max_iterations: usize,
    schedule: &[usize],
    sim: &SimulationConfig,
) -> Result<ConvergenceResult, SimError> {
    let config = ConvergenceConfig {
        threshold_pct,
        max_iterations,
        schedule: schedule.to_vec(),
    };
    ConvergenceAnalyzer::default().analyze(components, sim, &config)
}

fn summarize(points: Vec<ConvergencePoint>, seed: u64) -> ConvergenceResult {
    let first_converged = points.iter().find(|p| p.is_converged).map(|p| p.iterations);
    let (first, last) = match (points.first(), points.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => {
            return ConvergenceResult {
                points,
                optimal_iterations: 0,
                converged: false,
                convergence_rate_pct: 0.0,
                stability: 0.0,
                seed,
            }
        }
    };

    let convergence_rate_pct = if first.ci_width > 0.0 {
        (first.ci_width - last.ci_width) / first.ci_width * 100.0
    } else {
        0.0
    };
    let stability = if last.mean != 0.0 {
        ((1.0 - last.std_error / last.mean) * 100.0).max(0.0)
    } else {
        0.0
    };

    let optimal_iterations = first_converged.unwrap_or(last.iterations);
    tracing::info!(
        optimal_iterations,
        converged = first_converged.is_some(),
        "convergence analysis complete"
    );

    ConvergenceResult {
        optimal_iterations,
        converged: first_converged.is_some(),
        convergence_rate_pct,
        stability,
        seed,
        points,
    }
}
