use super::errors::LearnerError;
use super::Learner;

use crate::assortment::{
    local_search, search_best_assortment, Assortment, RewardKind, RewardModel, TieBreak,
};
use crate::bandits::{Actions, ArmKey, ArmPull, BanditKind, Context, Feedback, Goal};

use rand::{Rng, RngCore};

/// Epoch-based UCB for the multinomial logit bandit. An epoch keeps offering
/// the same assortment until a customer leaves without buying.
#[derive(Clone, Debug)]
pub struct MnlUcb {
    name: String,
    reward: RewardModel,
    /// Epochs each product was offered in.
    epochs: Vec<u64>,
    purchases: Vec<u64>,
    epoch: u64,
    current: Option<Assortment>,
    /// Sampled neighbours per local search step; exhaustive search when unset.
    random_neighbors: Option<usize>,
    last_offered: Option<Assortment>,
}

impl MnlUcb {
    pub fn new(
        revenues: Vec<f64>,
        kind: RewardKind,
        name: Option<String>,
    ) -> Result<Self, LearnerError> {
        let product_num = revenues.len().saturating_sub(1);
        let reward = RewardModel::new(vec![1.0; revenues.len()], revenues, kind)?;

        Ok(Self {
            name: name.unwrap_or_else(|| "mnl_ucb".to_string()),
            reward,
            epochs: vec![0; product_num + 1],
            purchases: vec![0; product_num + 1],
            epoch: 1,
            current: None,
            random_neighbors: None,
            last_offered: None,
        })
    }

    /// Picks assortments by local search from the previous offer instead of
    /// enumerating them, for catalogs too large to search exhaustively.
    pub fn with_local_search(mut self, random_neighbors: usize) -> Result<Self, LearnerError> {
        if random_neighbors == 0 {
            return Err(LearnerError::InvalidParameter(
                "local search needs at least one random neighbor".to_string(),
            ));
        }
        self.random_neighbors = Some(random_neighbors);
        Ok(self)
    }

    fn best_assortment(
        &self,
        optimistic: &RewardModel,
        card_limit: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Assortment, LearnerError> {
        let Some(random_neighbors) = self.random_neighbors else {
            let (_, assortment) =
                search_best_assortment(optimistic, card_limit, TieBreak::Random, rng)?;
            return Ok(assortment);
        };

        let initial = match &self.last_offered {
            Some(last) if last.len() <= card_limit => last.clone(),
            _ => Assortment::from([rng.random_range(1..=optimistic.product_num())]),
        };
        let (_, assortment) = local_search(optimistic, card_limit, random_neighbors, initial, rng)?;
        Ok(assortment)
    }

    /// Optimistic preference parameters, no-purchase option first.
    pub fn upper_confidence_bounds(&self) -> Vec<f64> {
        let product_num = self.reward.product_num() as f64;
        let log_term = (product_num.sqrt() * self.epoch as f64 + 1.0).ln();

        std::iter::once(1.0)
            .chain((1..=self.reward.product_num()).map(|product| {
                let offered = self.epochs[product];
                if offered == 0 {
                    return 1.0;
                }
                let offered = offered as f64;
                let estimate = self.purchases[product] as f64 / offered;
                let ucb = estimate
                    + (48.0 * estimate * log_term / offered).sqrt()
                    + 48.0 * log_term / offered;
                ucb.min(1.0)
            }))
            .collect()
    }

    fn check_context(&self, context: &Context) -> Result<usize, LearnerError> {
        match context {
            Context::Mnl {
                product_num,
                card_limit,
            } if *product_num == self.reward.product_num() => Ok(*card_limit),
            Context::Mnl { product_num, .. } => Err(LearnerError::ArmNumMismatch {
                expected: self.reward.product_num(),
                got: *product_num,
            }),
            _ => Err(LearnerError::UnexpectedContext { expected: "mnl" }),
        }
    }
}

impl Learner for MnlUcb {
    fn name(&self) -> &str {
        &self.name
    }

    fn running_environment(&self) -> &'static [BanditKind] {
        &[BanditKind::Mnl]
    }

    fn reset(&mut self) {
        self.epochs.iter_mut().for_each(|count| *count = 0);
        self.purchases.iter_mut().for_each(|count| *count = 0);
        self.epoch = 1;
        self.current = None;
        self.last_offered = None;
    }

    fn actions(&mut self, context: &Context, rng: &mut dyn RngCore) -> Result<Actions, LearnerError> {
        let card_limit = self.check_context(context)?;

        let assortment = match &self.current {
            Some(assortment) => assortment.clone(),
            None => {
                let mut optimistic = self.reward.clone();
                optimistic.set_preference_params(self.upper_confidence_bounds())?;
                let assortment = self.best_assortment(&optimistic, card_limit, rng)?;
                for &product in &assortment {
                    self.epochs[product] += 1;
                }
                self.current = Some(assortment.clone());
                self.last_offered = Some(assortment.clone());
                assortment
            }
        };
        Ok(Actions::new(vec![ArmPull::assortment(assortment, 1)]))
    }

    fn update(&mut self, feedback: &Feedback) -> Result<(), LearnerError> {
        for arm_feedback in &feedback.arm_feedbacks {
            if !matches!(arm_feedback.arm, ArmKey::Assortment(_)) {
                return Err(LearnerError::UnexpectedFeedback(
                    "single arm feedback for an assortment learner".to_string(),
                ));
            }
            for &product in &arm_feedback.customer_feedbacks {
                if product == 0 {
                    self.current = None;
                    self.epoch += 1;
                } else if product < self.purchases.len() {
                    self.purchases[product] += 1;
                } else {
                    return Err(LearnerError::UnexpectedFeedback(format!(
                        "unknown product {product}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn goal(&self) -> Result<Goal, LearnerError> {
        Ok(Goal::MaximizeTotalRewards)
    }
}
