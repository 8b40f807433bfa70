//! Integration tests for the simulation engine.
//!
//! Tests:
//! 1. Weighted-mean law of large numbers on expanded factor records
//! 2. Determinism across seeds, thread counts and background execution
//! 3. Cancellation mid-run and progress reporting
//! 4. Domain transforms attached to a run

use ptrs_core::domain::outputs;
use ptrs_core::uncertainty::expand;
use ptrs_core::{
    ComponentUncertainty, DevelopmentProfile, DomainConstants, FactorScore, RandomSource,
    SimError, SimulationConfig, SimulationEngine, SimulationTask, UncertaintyModel,
};

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn three_factor_components() -> Vec<ComponentUncertainty> {
    [("efficacy", 80.0, 0.5), ("safety", 60.0, 0.3), ("market", 40.0, 0.2)]
        .iter()
        .map(|&(name, score, weight)| expand(name, score, weight, 10.0).unwrap())
        .collect()
}

// ── 1. Law of large numbers ──────────────────────────────────────────

#[test]
fn weighted_mean_converges_to_weighted_base() {
    let out = SimulationEngine::new()
        .run(&three_factor_components(), &SimulationConfig::seeded(20_000, 2024))
        .unwrap();
    let m = mean(out.composite.samples());
    // 0.5 * 80 + 0.3 * 60 + 0.2 * 40
    assert!((m - 66.0).abs() < 1.0, "mean {m}");
}

#[test]
fn hundred_scale_weights_behave_like_fractions() {
    let fractions = three_factor_components();
    let hundreds: Vec<ComponentUncertainty> = fractions
        .iter()
        .map(|c| ComponentUncertainty {
            weight: c.weight * 100.0,
            ..c.clone()
        })
        .collect();
    let cfg = SimulationConfig::seeded(3_000, 8);
    let a = SimulationEngine::new().run(&fractions, &cfg).unwrap();
    let b = SimulationEngine::new().run(&hundreds, &cfg).unwrap();
    for (x, y) in a.composite.samples().iter().zip(b.composite.samples()) {
        assert!((x - y).abs() < 1e-9);
    }
}

// ── 2. Determinism ───────────────────────────────────────────────────

#[test]
fn different_seeds_differ() {
    let a = SimulationEngine::new()
        .run(&three_factor_components(), &SimulationConfig::seeded(1_000, 1))
        .unwrap();
    let b = SimulationEngine::new()
        .run(&three_factor_components(), &SimulationConfig::seeded(1_000, 2))
        .unwrap();
    assert_ne!(a.composite, b.composite);
}

#[test]
fn output_independent_of_thread_count() {
    let cfg = SimulationConfig::seeded(9_000, 77);
    let runs: Vec<_> = [1, 2, 3, 8]
        .iter()
        .map(|&n| {
            SimulationEngine::new()
                .with_threads(n)
                .run(&three_factor_components(), &cfg)
                .unwrap()
                .composite
        })
        .collect();
    for r in &runs[1..] {
        assert_eq!(r, &runs[0]);
    }
}

#[test]
fn randomized_expansion_and_sampling_replay_from_one_seed() {
    let factors = vec![
        FactorScore::new("efficacy", 72.0, 40.0),
        FactorScore::new("safety", 55.0, 35.0),
        FactorScore::new("market", 63.0, 25.0),
    ];
    let model = UncertaintyModel::randomized(8.0, 15.0);
    let run = || {
        let components = model.expand_all(&factors, &RandomSource::new(31)).unwrap();
        SimulationEngine::new()
            .run(&components, &SimulationConfig::seeded(2_000, 31))
            .unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn background_task_matches_foreground() {
    let cfg = SimulationConfig::seeded(5_000, 12);
    let fg = SimulationEngine::new().run(&three_factor_components(), &cfg).unwrap();

    let task_cfg = cfg.clone();
    let task = SimulationTask::spawn(move |control| {
        SimulationEngine::new().run_with_control(&three_factor_components(), &task_cfg, control)
    });
    assert_eq!(task.join().unwrap(), fg);
}

// ── 3. Cancellation ──────────────────────────────────────────────────

#[test]
fn cancel_mid_run_never_returns_partial_output() {
    let iterations = 4_000_000;
    let task = SimulationTask::spawn(move |control| {
        SimulationEngine::new().run_with_control(
            &three_factor_components(),
            &SimulationConfig::seeded(iterations, 5),
            control,
        )
    });
    while task.progress() == 0.0 && !task.is_finished() {
        std::thread::yield_now();
    }
    task.cancel();

    match task.join() {
        Ok(out) => assert_eq!(out.composite.len(), iterations),
        Err(SimError::Aborted { completed, total }) => {
            assert_eq!(total, iterations);
            assert!(completed <= total);
        }
        Err(other) => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn invalid_components_fail_before_sampling() {
    let bad = vec![ComponentUncertainty::new("x", 50.0, 60.0, 70.0, 1.0)];
    let err = SimulationEngine::new()
        .run(&bad, &SimulationConfig::seeded(100, 1))
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidInput(_)));

    let zero_weights = vec![ComponentUncertainty::new("x", 50.0, 40.0, 60.0, 0.0)];
    assert!(SimulationEngine::new()
        .run(&zero_weights, &SimulationConfig::seeded(100, 1))
        .is_err());
}

// ── 4. Domain transforms ─────────────────────────────────────────────

#[test]
fn domain_outputs_align_with_composite() {
    let profile = DevelopmentProfile {
        therapeutic_area: "oncology".into(),
        phase: "phase2".into(),
        peak_market: 3_000.0,
        max_share_pct: 20.0,
    };
    let model = DomainConstants::default().resolve(&profile).unwrap();
    let out = SimulationEngine::new()
        .with_domain(model)
        .run(&three_factor_components(), &SimulationConfig::seeded(2_000, 4))
        .unwrap();

    let ptrs = out.ptrs.unwrap();
    let sales = out.peak_sales.unwrap();
    assert_eq!(ptrs.name(), outputs::PTRS);
    assert_eq!(ptrs.len(), out.composite.len());
    assert_eq!(sales.len(), out.composite.len());
    for (c, p) in out.composite.samples().iter().zip(ptrs.samples()) {
        assert!((0.0..=100.0).contains(p));
        assert!((p - model.ptrs(*c) * 100.0).abs() < 1e-12);
    }
}
