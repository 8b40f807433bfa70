//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Expansion clamping: `0 <= min <= base <= max <= 100` for any valid base
//! 2. Weight normalization: any positive weight set sums to 1.0
//! 3. Sample bounds: every composite lies between the weighted mins and maxes
//! 4. Prefix stability: a shorter run is a prefix of a longer one

use proptest::prelude::*;
use ptrs_core::domain::normalize_weights;
use ptrs_core::uncertainty::expand;
use ptrs_core::{simulate, ComponentUncertainty, SimulationConfig};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_component() -> impl Strategy<Value = ComponentUncertainty> {
    (0.0..=100.0_f64, 0.0..40.0_f64, 0.01..10.0_f64)
        .prop_map(|(base, pct, weight)| expand("c", base, weight, pct).unwrap())
}

fn arb_components() -> impl Strategy<Value = Vec<ComponentUncertainty>> {
    prop::collection::vec(arb_component(), 1..6)
}

// ── 1. Expansion clamping ────────────────────────────────────────────

proptest! {
    #[test]
    fn expansion_respects_scale(base in 0.0..=100.0_f64, pct in 0.0..150.0_f64) {
        let c = expand("x", base, 1.0, pct).unwrap();
        prop_assert!(0.0 <= c.min_score);
        prop_assert!(c.min_score <= c.base_score);
        prop_assert!(c.base_score <= c.max_score);
        prop_assert!(c.max_score <= 100.0);
    }

    #[test]
    fn out_of_scale_base_always_rejected(base in 100.0001..1e6_f64) {
        prop_assert!(expand("x", base, 1.0, 10.0).is_err());
        prop_assert!(expand("x", -base, 1.0, 10.0).is_err());
    }
}

// ── 2. Weight normalization ──────────────────────────────────────────

proptest! {
    #[test]
    fn normalized_weights_sum_to_one(components in arb_components()) {
        let n = normalize_weights(&components).unwrap();
        let total: f64 = n.iter().map(|c| c.weight).sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
    }
}

// ── 3. Sample bounds ─────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn composite_within_weighted_bounds(components in arb_components(), seed in any::<u64>()) {
        let n = normalize_weights(&components).unwrap();
        let lo: f64 = n.iter().map(|c| c.min_score * c.weight).sum();
        let hi: f64 = n.iter().map(|c| c.max_score * c.weight).sum();

        let out = simulate(&components, &SimulationConfig::seeded(500, seed)).unwrap();
        for &s in out.samples() {
            prop_assert!(s >= lo - 1e-9 && s <= hi + 1e-9, "{} outside [{}, {}]", s, lo, hi);
        }
    }

    // ── 4. Prefix stability ──────────────────────────────────────────

    #[test]
    fn shorter_run_is_prefix(short in 1usize..3_000, extra in 1usize..3_000, seed in any::<u64>()) {
        let comps = vec![
            ComponentUncertainty::new("a", 50.0, 40.0, 60.0, 0.5),
            ComponentUncertainty::new("b", 70.0, 60.0, 80.0, 0.5),
        ];
        let a = simulate(&comps, &SimulationConfig::seeded(short, seed)).unwrap();
        let b = simulate(&comps, &SimulationConfig::seeded(short + extra, seed)).unwrap();
        prop_assert_eq!(a.samples(), &b.samples()[..short]);
    }
}
