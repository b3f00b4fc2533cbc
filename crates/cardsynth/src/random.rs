//! Module: random
//! Responsibility: the injected randomness capability used by strategy
//! dispatch, window placement and sample seeding.
//! Does not own: any global or thread-local random state.

use rand_chacha::{
    ChaCha8Rng,
    rand_core::{RngCore, SeedableRng},
};

///
/// RandomSource
///
/// Pseudo-random source seeded per synthesis run. Tests inject a fixed seed
/// (or a scripted source) to make strategy choices reproducible.
///

pub trait RandomSource: Send {
    /// Next raw 64-bit draw.
    fn next_u64(&mut self) -> u64;

    /// Uniform draw in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        // 53 high bits give every representable value in [0, 1) equal weight.
        (self.next_u64() >> 11) as f64 / (1_u64 << 53) as f64
    }

    /// Uniform index in `[0, bound)`; `bound == 0` yields 0.
    fn below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }

        (self.next_u64() % bound as u64) as usize
    }

    /// Bernoulli draw with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

///
/// SeededRandom
///
/// ChaCha8-backed `RandomSource`.
///

#[derive(Clone, Debug)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
    seed: u64,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed drawn from operating-system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        let mut entropy = ChaCha8Rng::from_entropy();

        Self::new(entropy.next_u64())
    }

    /// Seed this source was created with; logged so a run can be replayed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRandom {
    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }
}

///
/// TESTS
///
