use super::errors::BanditError;
use super::goals::Goal;
use super::messages::{Actions, ArmFeedback, ArmKey, Context, Feedback};
use super::{Bandit, BanditKind};

use crate::assortment::{search_best_assortment, Assortment, RewardKind, RewardModel, TieBreak};

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::{rngs::SmallRng, RngCore, SeedableRng};

const BEST_REWARD_TOLERANCE: f64 = 1e-9;

/// Multinomial logit bandit: every pull offers an assortment to one customer,
/// who buys at most one product.
#[derive(Clone, Debug)]
pub struct MnlBandit {
    reward: RewardModel,
    card_limit: usize,
    best_assortment: Assortment,
    best_reward: f64,
    total_pulls: u64,
    regret: f64,
}

impl MnlBandit {
    pub fn new(
        preference_params: Vec<f64>,
        revenues: Vec<f64>,
        card_limit: Option<usize>,
        kind: RewardKind,
    ) -> Result<Self, BanditError> {
        let reward = RewardModel::new(preference_params, revenues, kind)?;
        let card_limit = card_limit.unwrap_or(reward.product_num());
        if card_limit == 0 {
            return Err(BanditError::InvalidParameter(
                "cardinality limit must be at least 1".to_string(),
            ));
        }

        // the first maximiser is taken, the generator is never drawn from
        let mut rng = SmallRng::seed_from_u64(0);
        let (best_reward, best_assortment) =
            search_best_assortment(&reward, card_limit, TieBreak::First, &mut rng)?;

        Ok(Self {
            reward,
            card_limit,
            best_assortment,
            best_reward,
            total_pulls: 0,
            regret: 0.0,
        })
    }

    pub fn best_assortment(&self) -> &Assortment {
        &self.best_assortment
    }

    pub fn best_reward(&self) -> f64 {
        self.best_reward
    }

    pub fn product_num(&self) -> usize {
        self.reward.product_num()
    }

    pub fn card_limit(&self) -> usize {
        self.card_limit
    }

    fn validate(&self, assortment: &Assortment) -> Result<(), BanditError> {
        if assortment.is_empty() {
            return Err(BanditError::EmptyAssortment);
        }
        if assortment.len() > self.card_limit {
            return Err(BanditError::AssortmentTooLarge {
                size: assortment.len(),
                limit: self.card_limit,
            });
        }
        match assortment
            .iter()
            .find(|&&product| product == 0 || product > self.product_num())
        {
            Some(&product) => Err(BanditError::ProductNotFound(product)),
            None => Ok(()),
        }
    }

    fn offer(
        &mut self,
        assortment: &Assortment,
        pulls: u64,
        rng: &mut dyn RngCore,
    ) -> Result<ArmFeedback, BanditError> {
        let (products, weights): (Vec<usize>, Vec<f64>) =
            self.reward.choice_probabilities(assortment)?.into_iter().unzip();
        let choice = WeightedIndex::new(&weights)
            .map_err(|err| BanditError::InvalidParameter(err.to_string()))?;

        let customer_feedbacks = (0..pulls)
            .map(|_| products[choice.sample(rng)])
            .collect::<Vec<_>>();
        let rewards = customer_feedbacks
            .iter()
            .map(|&product| self.reward.revenues()[product])
            .collect();

        self.total_pulls += pulls;
        self.regret += pulls as f64 * (self.best_reward - self.reward.calc(assortment)?);

        Ok(ArmFeedback {
            arm: ArmKey::Assortment(assortment.clone()),
            rewards,
            customer_feedbacks,
        })
    }
}

impl Bandit for MnlBandit {
    fn name(&self) -> &'static str {
        "MnlBandit"
    }

    fn kind(&self) -> BanditKind {
        BanditKind::Mnl
    }

    fn reset(&mut self) {
        self.total_pulls = 0;
        self.regret = 0.0;
    }

    fn context(&self) -> Context {
        Context::Mnl {
            product_num: self.product_num(),
            card_limit: self.card_limit,
        }
    }

    fn feed(&mut self, actions: &Actions, rng: &mut dyn RngCore) -> Result<Feedback, BanditError> {
        let offers = actions
            .arm_pulls
            .iter()
            .map(|pull| match &pull.arm {
                ArmKey::Assortment(assortment) => {
                    self.validate(assortment).map(|_| (assortment, pull.pulls))
                }
                ArmKey::Single(_) => Err(BanditError::UnexpectedArmKey {
                    bandit: self.name(),
                    expected: "assortment",
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let arm_feedbacks = offers
            .into_iter()
            .filter(|&(_, pulls)| pulls > 0)
            .map(|(assortment, pulls)| self.offer(assortment, pulls, rng))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Feedback { arm_feedbacks })
    }

    fn regret(&self, goal: &Goal) -> Result<f64, BanditError> {
        match goal {
            Goal::MaximizeTotalRewards => Ok(self.regret),
            Goal::IdentifyBestArm {
                best_arm: ArmKey::Assortment(assortment),
            } => {
                self.validate(assortment)?;
                let gap = self.best_reward - self.reward.calc(assortment)?;
                Ok(if gap <= BEST_REWARD_TOLERANCE { 0.0 } else { 1.0 })
            }
            Goal::IdentifyBestArm { .. } => Err(BanditError::UnexpectedArmKey {
                bandit: self.name(),
                expected: "assortment",
            }),
            other => Err(BanditError::UnsupportedGoal {
                goal: other.name(),
                bandit: self.name(),
            }),
        }
    }
}
