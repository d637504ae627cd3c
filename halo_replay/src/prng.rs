// halo_replay/src/prng.rs

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A newtype wrapper around `ChaCha8Rng`.
/// This is the central, deterministic pseudo-random number generator for a replay.
#[derive(Debug, Clone)]
pub struct ReplayRng(pub ChaCha8Rng);

impl ReplayRng {
    /// Seeded runs are reproducible; unseeded runs draw from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(ChaCha8Rng::seed_from_u64(seed)),
            None => Self(ChaCha8Rng::from_entropy()),
        }
    }
}
