use super::errors::ArmError;
use super::Arm;

use rand::distr::{Bernoulli, Distribution};
use rand::RngCore;

#[derive(Clone, Debug)]
pub struct BernoulliArm {
    mean: f64,
    distribution: Bernoulli,
}

impl BernoulliArm {
    pub fn new(mean: f64) -> Result<Self, ArmError> {
        let distribution = Bernoulli::new(mean).map_err(|_| ArmError::InvalidProbability(mean))?;
        Ok(Self { mean, distribution })
    }
}

impl Arm for BernoulliArm {
    fn mean(&self) -> f64 {
        self.mean
    }

    fn pull(&self, pulls: u64, rng: &mut dyn RngCore) -> Vec<f64> {
        (0..pulls)
            .map(|_| self.distribution.sample(rng) as u8 as f64)
            .collect()
    }
}
