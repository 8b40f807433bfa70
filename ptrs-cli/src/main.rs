//! PTRS CLI: Monte Carlo scoring from the command line.
//!
//! Commands:
//! - `simulate`: full pipeline for one factor set, report JSON on stdout
//! - `converge`: CI-width stabilization over a sample schedule
//! - `stress`: configured (or built-in) stress scenarios against a baseline
//! - `compare`: side-by-side distributions for several entities
//!
//! Logs go to stderr (`RUST_LOG`, default `ptrs=info`); stdout carries JSON only.

mod input;
mod logging;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use ptrs_core::{RunControl, SimulationTask};
use ptrs_runner::convergence::ConvergenceAnalyzer;
use ptrs_runner::export::{export_distribution_csv, export_histogram_csv, export_json, write_file};
use ptrs_runner::report::{expand_factors, run_pipeline};
use ptrs_runner::{EngineSettings, Entity, PortfolioComparator, StressEngine};

#[derive(Parser)]
#[command(name = "ptrs", about = "PTRS: probabilistic scoring engine for drug-development assets")]
struct Cli {
    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
struct Common {
    /// Factor records (JSON array or TOML `[[factors]]`).
    #[arg(long)]
    input: PathBuf,

    /// Engine settings TOML. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `simulation.iterations`.
    #[arg(long)]
    iterations: Option<usize>,

    /// Override `simulation.seed`.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and print the report.
    Simulate {
        #[command(flatten)]
        common: Common,

        /// Also write the raw samples as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Find the sample count at which the 95% CI is narrow enough.
    Converge {
        #[command(flatten)]
        common: Common,

        /// Converged when the CI width is at or below this many score points.
        #[arg(long)]
        threshold: Option<f64>,

        #[arg(long)]
        max_iterations: Option<usize>,
    },
    /// Apply stress scenarios from settings (or the built-in library).
    Stress {
        #[command(flatten)]
        common: Common,
    },
    /// Compare several entities (`[{"id": ..., "factors": [...]}]`).
    Compare {
        #[command(flatten)]
        common: Common,

        #[arg(long)]
        bins: Option<usize>,

        /// Refuse portfolios larger than this. Defaults to `portfolio.max_entities` (5).
        #[arg(long)]
        max_entities: Option<usize>,

        /// Directory for one histogram CSV per entity.
        #[arg(long)]
        histogram_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Simulate {
            common,
            csv,
            output,
        } => run_simulate(&common, csv.as_deref(), output.as_deref()),
        Commands::Converge {
            common,
            threshold,
            max_iterations,
        } => run_converge(&common, threshold, max_iterations),
        Commands::Stress { common } => run_stress(&common),
        Commands::Compare {
            common,
            bins,
            max_entities,
            histogram_dir,
        } => run_compare(&common, bins, max_entities, histogram_dir.as_deref()),
    }
}

/// Settings file plus command-line overrides, with the seed pinned so every
/// stage of one invocation shares it.
fn load_settings(common: &Common) -> Result<EngineSettings> {
    let mut settings = match &common.config {
        Some(path) => EngineSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => EngineSettings::default(),
    };
    if let Some(n) = common.iterations {
        settings.simulation.iterations = n;
    }
    if common.seed.is_some() {
        settings.simulation.seed = common.seed;
    }
    settings.simulation = settings.simulation.pinned();
    settings.validate().context("invalid settings after overrides")?;
    Ok(settings)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize output")?
    );
    Ok(())
}

fn run_simulate(common: &Common, csv: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let settings = load_settings(common)?;
    let factors = input::read_factors(&common.input)?;

    let task = SimulationTask::spawn(move |control: &RunControl| {
        run_pipeline(&factors, &settings, control)
    });
    while !task.is_finished() {
        std::thread::sleep(Duration::from_millis(200));
        tracing::debug!(progress = task.progress(), "simulating");
    }
    let (report, samples) = task.join().context("simulation failed")?;

    if let Some(path) = csv {
        write_file(path, &export_distribution_csv(&samples)?)?;
        tracing::info!(path = %path.display(), "samples written");
    }
    match output {
        Some(path) => {
            write_file(path, &export_json(&report)?)?;
            tracing::info!(path = %path.display(), "report written");
            Ok(())
        }
        None => print_json(&report),
    }
}

fn run_converge(
    common: &Common,
    threshold: Option<f64>,
    max_iterations: Option<usize>,
) -> Result<()> {
    let mut settings = load_settings(common)?;
    if let Some(t) = threshold {
        settings.convergence.threshold_pct = t;
    }
    if let Some(m) = max_iterations {
        settings.convergence.max_iterations = m;
    }

    let factors = input::read_factors(&common.input)?;
    let components = expand_factors(&factors, &settings)?;
    let result = ConvergenceAnalyzer::new(settings.engine()?)
        .analyze(&components, &settings.simulation, &settings.convergence)
        .context("convergence analysis failed")?;
    print_json(&result)
}

fn run_stress(common: &Common) -> Result<()> {
    let settings = load_settings(common)?;
    if settings.stress.scenarios.is_empty() {
        bail!("no stress scenarios configured");
    }

    let factors = input::read_factors(&common.input)?;
    let components = expand_factors(&factors, &settings)?;
    let results = StressEngine::new(settings.engine()?, settings.stress.thresholds)
        .apply_all(&components, &settings.stress.scenarios, &settings.simulation)
        .context("stress run failed")?;
    print_json(&results)
}

fn run_compare(
    common: &Common,
    bins: Option<usize>,
    max_entities: Option<usize>,
    histogram_dir: Option<&Path>,
) -> Result<()> {
    let settings = load_settings(common)?;
    let records = input::read_portfolio(&common.input)?;

    let entities = records
        .iter()
        .map(|r| {
            Ok(Entity {
                id: r.id.clone(),
                components: expand_factors(&r.factors, &settings)
                    .with_context(|| format!("entity '{}'", r.id))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut comparator = PortfolioComparator::new(settings.engine()?);
    comparator.success_threshold = settings.risk.success_threshold;
    comparator.weighting = settings.risk.weighting;
    comparator.max_entities = max_entities.or(settings.portfolio.max_entities);

    let bins = bins.unwrap_or(settings.portfolio.bins);
    let results = comparator
        .compare_many(&entities, &settings.simulation, bins)
        .context("comparison failed")?;

    if let Some(dir) = histogram_dir {
        for r in &results {
            let path = dir.join(format!("{}_histogram.csv", r.id));
            write_file(&path, &export_histogram_csv(&r.histogram)?)?;
        }
        tracing::info!(dir = %dir.display(), files = results.len(), "histograms written");
    }
    print_json(&results)
}
