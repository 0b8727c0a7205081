use super::errors::BanditError;
use super::goals::Goal;
use super::messages::{Actions, Context, Feedback};
use super::multi_armed::MultiArmedBandit;
use super::{Bandit, BanditKind};

use crate::arms::{Arm, LinearArm};

use rand::RngCore;
use std::sync::Arc;

/// Finite-armed linear bandit exposing the arm features as context.
#[derive(Clone, Debug)]
pub struct LinearBandit {
    core: MultiArmedBandit,
    features: Vec<Vec<f64>>,
}

impl LinearBandit {
    pub fn new(features: Vec<Vec<f64>>, theta: Vec<f64>, noise_std: f64) -> Result<Self, BanditError> {
        if let Some(bad) = features.iter().find(|x| x.len() != theta.len()) {
            return Err(BanditError::InvalidParameter(format!(
                "feature dimension {} does not match theta dimension {}",
                bad.len(),
                theta.len()
            )));
        }
        let arms = features
            .iter()
            .map(|x| {
                LinearArm::new(x.clone(), &theta, noise_std).map(|arm| Arc::new(arm) as Arc<dyn Arm>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            core: MultiArmedBandit::new(arms)?,
            features,
        })
    }

    pub fn best_arm(&self) -> usize {
        self.core.best_arm()
    }
}

impl Bandit for LinearBandit {
    fn name(&self) -> &'static str {
        "LinearBandit"
    }

    fn kind(&self) -> BanditKind {
        BanditKind::Linear
    }

    fn reset(&mut self) {
        self.core.reset();
    }

    fn context(&self) -> Context {
        Context::Linear {
            features: self.features.clone(),
        }
    }

    fn feed(&mut self, actions: &Actions, rng: &mut dyn RngCore) -> Result<Feedback, BanditError> {
        self.core.pull_arms(actions, rng, self.name())
    }

    fn regret(&self, goal: &Goal) -> Result<f64, BanditError> {
        match goal {
            Goal::MaximizeTotalRewards => Ok(self.core.accumulated_regret()),
            Goal::IdentifyBestArm { best_arm } => self.core.best_arm_regret(best_arm, self.name()),
            other => Err(BanditError::UnsupportedGoal {
                goal: other.name(),
                bandit: self.name(),
            }),
        }
    }
}
