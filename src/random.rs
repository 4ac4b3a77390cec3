//! Uniform-draw port used by the engines
//!
//! Every random decision the engines make goes through [`RandomSource::uniform`],
//! so a session can be replayed exactly by injecting a deterministic source.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform draws in `[lo, hi)`
pub trait RandomSource {
    /// Fraction in `[0, 1)` mapped onto the requested range
    fn next_fraction(&mut self) -> f64;

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_fraction() * (hi - lo)
    }
}

/// Thread-local OS-seeded generator for production wiring
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_fraction(&mut self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Reproducible generator seeded from a `u64`
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_fraction(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Always returns the same position within the requested range
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom {
    fraction: f64,
}

impl FixedRandom {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    /// Midpoint of every requested range
    pub fn midpoint() -> Self {
        Self::new(0.5)
    }
}

impl RandomSource for FixedRandom {
    fn next_fraction(&mut self) -> f64 {
        self.fraction
    }
}

/// Replays a scripted list of fractions, cycling when exhausted
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    fractions: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    pub fn new(fractions: Vec<f64>) -> Self {
        let fractions = if fractions.is_empty() {
            vec![0.5]
        } else {
            fractions.into_iter().map(|f| f.clamp(0.0, 1.0)).collect()
        };
        Self {
            fractions,
            cursor: 0,
        }
    }

    /// Number of draws served so far
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceRandom {
    fn next_fraction(&mut self) -> f64 {
        let value = self.fractions[self.cursor % self.fractions.len()];
        self.cursor += 1;
        value
    }
}
