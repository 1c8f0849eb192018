use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of cosmetic randomness (waypoint wiggle, heatmap scatter).
pub trait Jitter {
    /// A value in `[-span / 2, span / 2)`.
    fn offset(&mut self, span: f64) -> f64;

    /// A value in `[0, 1)`.
    fn unit(&mut self) -> f64;
}

/// Always zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn offset(&mut self, _span: f64) -> f64 {
        0.0
    }

    fn unit(&mut self) -> f64 {
        0.0
    }
}

pub struct SeededJitter {
    rng: StdRng,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }
}

impl Jitter for SeededJitter {
    fn offset(&mut self, span: f64) -> f64 {
        (self.unit() - 0.5) * span
    }

    fn unit(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}
