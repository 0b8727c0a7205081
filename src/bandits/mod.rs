pub mod errors;
pub mod goals;
pub mod linear;
pub mod messages;
pub mod mnl;
pub mod multi_armed;
pub mod thresholding;

pub use errors::BanditError;
pub use goals::Goal;
pub use linear::LinearBandit;
pub use messages::{
    ActionState, Actions, ArmFeedback, ArmKey, ArmPull, Context, Feedback,
};
pub use mnl::MnlBandit;
pub use multi_armed::MultiArmedBandit;
pub use thresholding::ThresholdingBandit;

use crate::arms::{Arm, ArmType};
use crate::assortment::RewardKind;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum BanditKind {
    MultiArmed,
    Thresholding,
    Linear,
    Mnl,
}

impl fmt::Display for BanditKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Clone for Box<dyn Bandit> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

pub trait CloneBoxedBandit {
    fn clone_box(&self) -> Box<dyn Bandit>;
}

impl<T> CloneBoxedBandit for T
where
    T: Bandit + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn Bandit> {
        Box::new(self.clone())
    }
}

/// Environment a learner interacts with. `reset` must be called before every trial.
pub trait Bandit: Send + Sync + CloneBoxedBandit {
    fn name(&self) -> &'static str;
    fn kind(&self) -> BanditKind;
    fn reset(&mut self);
    fn context(&self) -> Context;
    fn feed(&mut self, actions: &Actions, rng: &mut dyn RngCore) -> Result<Feedback, BanditError>;
    fn regret(&self, goal: &Goal) -> Result<f64, BanditError>;
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum BanditType {
    MultiArmed {
        arms: Vec<ArmType>,
    },
    Thresholding {
        arms: Vec<ArmType>,
        threshold: f64,
        radius: f64,
    },
    Linear {
        features: Vec<Vec<f64>>,
        theta: Vec<f64>,
        noise_std: f64,
    },
    Mnl {
        preference_params: Vec<f64>,
        revenues: Vec<f64>,
        card_limit: Option<usize>,
        reward: RewardKind,
    },
}

impl BanditType {
    pub fn into_inner(self) -> Result<Box<dyn Bandit>, BanditError> {
        let bandit: Box<dyn Bandit> = match self {
            BanditType::MultiArmed { arms } => Box::new(MultiArmedBandit::new(build_arms(arms)?)?),
            BanditType::Thresholding {
                arms,
                threshold,
                radius,
            } => Box::new(ThresholdingBandit::new(
                build_arms(arms)?,
                threshold,
                radius,
            )?),
            BanditType::Linear {
                features,
                theta,
                noise_std,
            } => Box::new(LinearBandit::new(features, theta, noise_std)?),
            BanditType::Mnl {
                preference_params,
                revenues,
                card_limit,
                reward,
            } => Box::new(MnlBandit::new(
                preference_params,
                revenues,
                card_limit,
                reward,
            )?),
        };
        Ok(bandit)
    }
}

fn build_arms(arms: Vec<ArmType>) -> Result<Vec<Arc<dyn Arm>>, BanditError> {
    arms.into_iter()
        .map(|arm| arm.into_inner().map_err(BanditError::from))
        .collect()
}
