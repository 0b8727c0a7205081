pub mod bernoulli;
pub mod categorical;
pub mod errors;
pub mod gaussian;
pub mod linear;
pub mod pseudo_arm;

pub use bernoulli::BernoulliArm;
pub use categorical::CategoricalArm;
pub use errors::ArmError;
pub use gaussian::GaussianArm;
pub use linear::LinearArm;
pub use pseudo_arm::{CategoricalPseudoArm, PseudoArm};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// A stochastic reward source. Parameters are fixed at construction.
pub trait Arm: Debug + Send + Sync {
    fn mean(&self) -> f64;
    fn pull(&self, pulls: u64, rng: &mut dyn RngCore) -> Vec<f64>;
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ArmType {
    Bernoulli { mean: f64 },
    Gaussian { mean: f64, std: f64 },
    Categorical { probabilities: Vec<f64>, values: Option<Vec<f64>> },
}

impl ArmType {
    pub fn into_inner(self) -> Result<Arc<dyn Arm>, ArmError> {
        let arm: Arc<dyn Arm> = match self {
            ArmType::Bernoulli { mean } => Arc::new(BernoulliArm::new(mean)?),
            ArmType::Gaussian { mean, std } => Arc::new(GaussianArm::new(mean, std)?),
            ArmType::Categorical {
                probabilities,
                values,
            } => Arc::new(CategoricalArm::new(probabilities, values)?),
        };
        Ok(arm)
    }
}
