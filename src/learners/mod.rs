pub mod apt;
pub mod epsilon_greedy;
pub mod errors;
pub mod exp_gap;
pub mod lil_ucb;
pub mod lin_ucb;
pub mod majority_voting;
pub mod mnl_ucb;
pub mod opt_kg;
pub mod sequential_halving;
pub mod successive_rejects;
pub mod thompson_sampling;
pub mod ucb;
pub(crate) mod utils;

pub use apt::Apt;
pub use epsilon_greedy::EpsilonGreedy;
pub use errors::LearnerError;
pub use exp_gap::ExpGap;
pub use lil_ucb::LilUcbHeuristic;
pub use lin_ucb::LinUcb;
pub use majority_voting::MajorityVoting;
pub use mnl_ucb::MnlUcb;
pub use opt_kg::OptKg;
pub use sequential_halving::SequentialHalving;
pub use successive_rejects::SuccessiveRejects;
pub use thompson_sampling::{Prior, ThompsonSampling};
pub use ucb::Ucb;

use crate::assortment::RewardKind;
use crate::bandits::{Actions, BanditKind, Context, Feedback, Goal};

use rand::RngCore;
use serde::{Deserialize, Serialize};

const DEFAULT_RANDOM_NEIGHBORS: usize = 10;

impl Clone for Box<dyn Learner> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

pub trait CloneBoxedLearner {
    fn clone_box(&self) -> Box<dyn Learner>;
}

impl<T> CloneBoxedLearner for T
where
    T: Learner + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }
}

/// A sequential decision policy. Every trial starts with `reset`, then
/// alternates `actions` and `update`; an empty action set ends the trial early.
pub trait Learner: Send + Sync + CloneBoxedLearner {
    fn name(&self) -> &str;
    /// Bandit kinds this learner can be played against.
    fn running_environment(&self) -> &'static [BanditKind];
    fn reset(&mut self);
    fn actions(&mut self, context: &Context, rng: &mut dyn RngCore) -> Result<Actions, LearnerError>;
    fn update(&mut self, feedback: &Feedback) -> Result<(), LearnerError>;
    fn goal(&self) -> Result<Goal, LearnerError>;
    /// Total pulls the learner may spend, for fixed-budget learners.
    fn budget(&self) -> Option<u64> {
        None
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum LearnerType {
    Ucb {
        arm_num: usize,
        alpha: f64,
        name: Option<String>,
    },
    EpsilonGreedy {
        arm_num: usize,
        epsilon: f64,
        name: Option<String>,
    },
    ThompsonSampling {
        arm_num: usize,
        #[serde(default)]
        prior: Prior,
        name: Option<String>,
    },
    LinUcb {
        dimension: usize,
        alpha: f64,
        lambda: f64,
        name: Option<String>,
    },
    SuccessiveRejects {
        arm_num: usize,
        budget: u64,
        name: Option<String>,
    },
    SequentialHalving {
        arm_num: usize,
        budget: u64,
        threshold: Option<usize>,
        name: Option<String>,
    },
    LilUcbHeuristic {
        arm_num: usize,
        confidence: f64,
        name: Option<String>,
    },
    ExpGap {
        arm_num: usize,
        confidence: f64,
        threshold: Option<usize>,
        name: Option<String>,
    },
    Apt {
        arm_num: usize,
        threshold: f64,
        eps: f64,
        budget: u64,
        name: Option<String>,
    },
    OptKg {
        arm_num: usize,
        threshold: f64,
        budget: u64,
        name: Option<String>,
    },
    MajorityVoting {
        arm_num: usize,
        budget: u64,
        name: Option<String>,
    },
    MnlUcb {
        revenues: Vec<f64>,
        reward: Option<RewardKind>,
        /// Local search instead of exhaustive assortment search.
        #[serde(default)]
        use_local_search: bool,
        random_neighbors: Option<usize>,
        name: Option<String>,
    },
}

impl LearnerType {
    pub fn into_inner(self) -> Result<Box<dyn Learner>, LearnerError> {
        let learner: Box<dyn Learner> = match self {
            LearnerType::Ucb {
                arm_num,
                alpha,
                name,
            } => Box::new(Ucb::new(arm_num, alpha, name)?),
            LearnerType::EpsilonGreedy {
                arm_num,
                epsilon,
                name,
            } => Box::new(EpsilonGreedy::new(arm_num, epsilon, name)?),
            LearnerType::ThompsonSampling {
                arm_num,
                prior,
                name,
            } => Box::new(ThompsonSampling::new(arm_num, prior, name)?),
            LearnerType::LinUcb {
                dimension,
                alpha,
                lambda,
                name,
            } => Box::new(LinUcb::new(dimension, alpha, lambda, name)?),
            LearnerType::SuccessiveRejects {
                arm_num,
                budget,
                name,
            } => Box::new(SuccessiveRejects::new(arm_num, budget, name)?),
            LearnerType::SequentialHalving {
                arm_num,
                budget,
                threshold,
                name,
            } => Box::new(SequentialHalving::new(
                arm_num,
                budget,
                threshold.unwrap_or(1),
                name,
            )?),
            LearnerType::LilUcbHeuristic {
                arm_num,
                confidence,
                name,
            } => Box::new(LilUcbHeuristic::new(arm_num, confidence, name)?),
            LearnerType::ExpGap {
                arm_num,
                confidence,
                threshold,
                name,
            } => Box::new(ExpGap::new(arm_num, confidence, threshold.unwrap_or(2), name)?),
            LearnerType::Apt {
                arm_num,
                threshold,
                eps,
                budget,
                name,
            } => Box::new(Apt::new(arm_num, threshold, eps, budget, name)?),
            LearnerType::OptKg {
                arm_num,
                threshold,
                budget,
                name,
            } => Box::new(OptKg::new(arm_num, threshold, budget, name)?),
            LearnerType::MajorityVoting {
                arm_num,
                budget,
                name,
            } => Box::new(MajorityVoting::new(arm_num, budget, name)?),
            LearnerType::MnlUcb {
                revenues,
                reward,
                use_local_search,
                random_neighbors,
                name,
            } => {
                let learner = MnlUcb::new(revenues, reward.unwrap_or(RewardKind::Mean), name)?;
                if use_local_search {
                    Box::new(learner.with_local_search(
                        random_neighbors.unwrap_or(DEFAULT_RANDOM_NEIGHBORS),
                    )?)
                } else {
                    Box::new(learner)
                }
            }
        };
        Ok(learner)
    }
}
