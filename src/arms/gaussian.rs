use super::errors::ArmError;
use super::Arm;

use rand::RngCore;
use rand_distr::{Distribution, Normal};

#[derive(Clone, Debug)]
pub struct GaussianArm {
    mean: f64,
    std: f64,
    distribution: Normal<f64>,
}

impl GaussianArm {
    pub fn new(mean: f64, std: f64) -> Result<Self, ArmError> {
        if !std.is_finite() || std < 0.0 {
            return Err(ArmError::InvalidStd(std));
        }
        let distribution = Normal::new(mean, std).map_err(|_| ArmError::InvalidStd(std))?;

        Ok(Self {
            mean,
            std,
            distribution,
        })
    }

    pub fn std(&self) -> f64 {
        self.std
    }
}

impl Arm for GaussianArm {
    fn mean(&self) -> f64 {
        self.mean
    }

    fn pull(&self, pulls: u64, rng: &mut dyn RngCore) -> Vec<f64> {
        (0..pulls).map(|_| self.distribution.sample(rng)).collect()
    }
}
