//! Monte Carlo simulation engine.
//!
//! Draws `iterations` independent joint samples of all components and reduces
//! each one to a weighted composite score, optionally followed by per-sample
//! domain transforms (PTRS, risk-adjusted peak sales).
//!
//! Sampling is split into fixed-size blocks processed in parallel by rayon.
//! Block `b` draws from `RandomSource::rng_for(SAMPLING_STREAM, b)`, so the
//! output depends only on `(components, config, seed)`, never on the thread
//! count. A run of `n` samples is also an exact prefix of any longer run with
//! the same seed.

pub mod control;
pub mod task;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{normalize_weights, outputs, ComponentUncertainty, OutputDistribution};
use crate::error::SimError;
use crate::rng::{RandomSource, SAMPLING_STREAM};
use crate::sampling::CompositeSampler;
use crate::transform::DomainModel;

pub use control::RunControl;
pub use task::SimulationTask;

/// Samples per parallel work unit. Part of the reproducibility contract:
/// changing it changes which stream each sample is drawn from.
pub const SAMPLE_BLOCK: usize = 1024;

/// Per-run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of joint samples (>= 1).
    pub iterations: usize,
    /// Half-width of each component's range, percent of the 0–100 scale.
    pub uncertainty_range_pct: f64,
    /// Two-sided confidence level in percent, strictly between 0 and 100.
    pub confidence_level: f64,
    /// Master seed. `None` draws one from the OS and reports it in the output.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            uncertainty_range_pct: 10.0,
            confidence_level: 95.0,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn seeded(iterations: usize, seed: u64) -> Self {
        Self {
            iterations,
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Resolve a missing seed once, so several runs can share one random stream.
    pub fn pinned(&self) -> Self {
        Self {
            seed: Some(RandomSource::from_optional_seed(self.seed).master_seed()),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.iterations < 1 {
            return Err(SimError::invalid_input("iterations must be >= 1"));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 100.0) {
            return Err(SimError::invalid_input(format!(
                "confidence level {} must lie strictly between 0 and 100",
                self.confidence_level
            )));
        }
        if !(self.uncertainty_range_pct.is_finite() && self.uncertainty_range_pct >= 0.0) {
            return Err(SimError::invalid_input(
                "uncertainty range must be a non-negative number",
            ));
        }
        Ok(())
    }
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    /// Master seed actually used (replays the run when fed back as `config.seed`).
    pub seed: u64,
    pub composite: OutputDistribution,
    pub ptrs: Option<OutputDistribution>,
    pub peak_sales: Option<OutputDistribution>,
}

/// Stateless engine; carries only optional domain mapping and threading limits.
#[derive(Debug, Clone, Default)]
pub struct SimulationEngine {
    domain: Option<DomainModel>,
    threads: Option<usize>,
}

impl SimulationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also produce PTRS and peak-sales distributions from each composite sample.
    pub fn with_domain(mut self, domain: DomainModel) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Run on a private rayon pool of `n` threads instead of the global pool.
    pub fn with_threads(mut self, n: usize) -> Self {
        self.threads = Some(n.max(1));
        self
    }

    pub fn domain(&self) -> Option<&DomainModel> {
        self.domain.as_ref()
    }

    pub fn run(
        &self,
        components: &[ComponentUncertainty],
        config: &SimulationConfig,
    ) -> Result<SimulationOutput, SimError> {
        self.run_with_control(components, config, &RunControl::new())
    }

    /// Run, honoring cancellation and reporting progress through `control`.
    pub fn run_with_control(
        &self,
        components: &[ComponentUncertainty],
        config: &SimulationConfig,
        control: &RunControl,
    ) -> Result<SimulationOutput, SimError> {
        config.validate()?;
        let normalized = normalize_weights(components)?;
        let sampler = CompositeSampler::new(&normalized)?;
        let source = RandomSource::from_optional_seed(config.seed);

        tracing::info!(
            iterations = config.iterations,
            components = sampler.component_count(),
            seed = source.master_seed(),
            "starting Monte Carlo run"
        );
        let started = Instant::now();

        let samples = match self.threads {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| SimError::invalid_input(format!("thread pool: {e}")))?;
                pool.install(|| draw_samples(&sampler, &source, config.iterations, control))
            }
            None => draw_samples(&sampler, &source, config.iterations, control),
        };

        let samples = match samples {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(
                    completed = control.completed(),
                    total = config.iterations,
                    "Monte Carlo run cancelled"
                );
                return Err(e);
            }
        };

        let composite = OutputDistribution::new(outputs::COMPOSITE, samples);
        let (ptrs, peak_sales) = match &self.domain {
            Some(d) => (
                Some(d.ptrs_distribution(&composite)),
                Some(d.peak_sales_distribution(&composite)),
            ),
            None => (None, None),
        };

        tracing::info!(
            iterations = config.iterations,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Monte Carlo run complete"
        );

        Ok(SimulationOutput {
            seed: source.master_seed(),
            composite,
            ptrs,
            peak_sales,
        })
    }
}

/// Convenience: composite distribution only, default engine.
pub fn simulate(
    components: &[ComponentUncertainty],
    config: &SimulationConfig,
) -> Result<OutputDistribution, SimError> {
    SimulationEngine::new()
        .run(components, config)
        .map(|out| out.composite)
}

fn draw_samples(
    sampler: &CompositeSampler,
    source: &RandomSource,
    iterations: usize,
    control: &RunControl,
) -> Result<Vec<f64>, SimError> {
    control.claim_work(iterations);
    // Other runs may share `control`; this run's own progress is kept apart.
    let done = AtomicUsize::new(0);
    let blocks = iterations.div_ceil(SAMPLE_BLOCK);

    let chunks: Vec<Option<Vec<f64>>> = (0..blocks)
        .into_par_iter()
        .map(|b| {
            if control.is_cancelled() {
                return None;
            }
            let start = b * SAMPLE_BLOCK;
            let len = SAMPLE_BLOCK.min(iterations - start);
            let mut rng = source.rng_for(SAMPLING_STREAM, b as u64);
            let block: Vec<f64> = (0..len).map(|_| sampler.draw(&mut rng)).collect();
            control.advance(len);
            done.fetch_add(len, Ordering::Relaxed);
            Some(block)
        })
        .collect();

    if control.is_cancelled() || chunks.iter().any(Option::is_none) {
        return Err(SimError::Aborted {
            completed: done.load(Ordering::Relaxed),
            total: iterations,
        });
    }

    let mut samples = Vec::with_capacity(iterations);
    for block in chunks.into_iter().flatten() {
        samples.extend(block);
    }
    Ok(samples)
}
