//! Per-component triangular samplers.
//!
//! Each component is sampled from a triangular distribution with
//! `(min, mode = base, max)`. Every draw consumes exactly one uniform from the
//! generator, including the degenerate `min == max` case, so the random
//! stream stays aligned across component sets that differ only in bounds.

use rand::Rng;
use rand_distr::{Distribution, Triangular};

use crate::domain::ComponentUncertainty;
use crate::error::SimError;

/// Prepared sampler for one component.
#[derive(Debug, Clone, Copy)]
pub enum ComponentSampler {
    /// Zero-width range: always yields the base score.
    Fixed(f64),
    Triangular(Triangular<f64>),
}

impl ComponentSampler {
    pub fn for_component(c: &ComponentUncertainty) -> Result<Self, SimError> {
        if c.spread() <= 0.0 {
            return Ok(Self::Fixed(c.base_score));
        }
        Triangular::new(c.min_score, c.max_score, c.base_score)
            .map(Self::Triangular)
            .map_err(|e| {
                SimError::invalid_input(format!("component '{}': triangular({e})", c.name))
            })
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Fixed(v) => {
                let _: f64 = rng.gen();
                *v
            }
            Self::Triangular(t) => t.sample(rng),
        }
    }
}

/// Draws weighted composite samples for a validated, normalized component set.
#[derive(Debug, Clone)]
pub struct CompositeSampler {
    samplers: Vec<ComponentSampler>,
    weights: Vec<f64>,
}

impl CompositeSampler {
    pub fn new(components: &[ComponentUncertainty]) -> Result<Self, SimError> {
        let samplers = components
            .iter()
            .map(ComponentSampler::for_component)
            .collect::<Result<Vec<_>, _>>()?;
        let weights = components.iter().map(|c| c.weight).collect();
        Ok(Self { samplers, weights })
    }

    /// One joint sample: `Σ value_i * weight_i`, components drawn in order.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.samplers
            .iter()
            .zip(&self.weights)
            .map(|(s, w)| s.draw(rng) * w)
            .sum()
    }

    pub fn component_count(&self) -> usize {
        self.samplers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn draws_stay_inside_bounds() {
        let c = ComponentUncertainty::new("x", 50.0, 40.0, 65.0, 1.0);
        let s = ComponentSampler::for_component(&c).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..5_000 {
            let v = s.draw(&mut rng);
            assert!((40.0..=65.0).contains(&v), "draw {v} out of bounds");
        }
    }

    #[test]
    fn triangular_mean_is_average_of_parameters() {
        let c = ComponentUncertainty::new("x", 50.0, 40.0, 80.0, 1.0);
        let s = ComponentSampler::for_component(&c).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let n = 40_000;
        let mean = (0..n).map(|_| s.draw(&mut rng)).sum::<f64>() / n as f64;
        // (40 + 50 + 80) / 3
        assert!((mean - 56.666).abs() < 0.3, "mean {mean}");
    }

    #[test]
    fn degenerate_range_is_fixed_and_consumes_one_draw() {
        let fixed = ComponentUncertainty::new("x", 30.0, 30.0, 30.0, 1.0);
        let s = ComponentSampler::for_component(&fixed).unwrap();

        let mut a = StdRng::seed_from_u64(5);
        let mut b = StdRng::seed_from_u64(5);
        assert_eq!(s.draw(&mut a), 30.0);
        let _: f64 = b.gen();
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn composite_is_weighted_sum() {
        let set = vec![
            ComponentUncertainty::new("a", 20.0, 20.0, 20.0, 0.25),
            ComponentUncertainty::new("b", 60.0, 60.0, 60.0, 0.75),
        ];
        let sampler = CompositeSampler::new(&set).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!((sampler.draw(&mut rng) - 50.0).abs() < 1e-12);
        assert_eq!(sampler.component_count(), 2);
    }
}
