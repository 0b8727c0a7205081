use super::errors::ArmError;
use super::Arm;

use rand::RngCore;
use rand_distr::{Distribution, Normal};

/// Arm of a linear bandit: reward is `features . theta` plus Gaussian noise.
#[derive(Clone, Debug)]
pub struct LinearArm {
    features: Vec<f64>,
    mean: f64,
    noise: Normal<f64>,
}

impl LinearArm {
    pub fn new(features: Vec<f64>, theta: &[f64], noise_std: f64) -> Result<Self, ArmError> {
        if !noise_std.is_finite() || noise_std < 0.0 {
            return Err(ArmError::InvalidStd(noise_std));
        }
        let mean = dot(&features, theta);
        let noise = Normal::new(0.0, noise_std).map_err(|_| ArmError::InvalidStd(noise_std))?;

        Ok(Self {
            features,
            mean,
            noise,
        })
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }
}

impl Arm for LinearArm {
    fn mean(&self) -> f64 {
        self.mean
    }

    fn pull(&self, pulls: u64, rng: &mut dyn RngCore) -> Vec<f64> {
        (0..pulls)
            .map(|_| self.mean + self.noise.sample(rng))
            .collect()
    }
}

pub(crate) fn dot(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}
