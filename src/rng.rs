use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Hands out one seed per trial, derived from a master seed when one is
/// configured and from the clock otherwise.
#[derive(Debug)]
pub struct SeedSource {
    seed: Option<u64>,
    rng: SmallRng,
}

impl SeedSource {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::seed_from_u64(time_seed()),
        };

        Self { seed, rng }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn next_seed(&mut self) -> u64 {
        self.rng.random()
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}
