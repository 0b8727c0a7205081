use super::errors::BanditError;
use super::goals::Goal;
use super::messages::{Actions, ArmFeedback, ArmKey, Context, Feedback};
use super::{Bandit, BanditKind};

use crate::arms::Arm;

use rand::RngCore;
use std::sync::Arc;

/// Ordinary stochastic multi-armed bandit.
#[derive(Clone, Debug)]
pub struct MultiArmedBandit {
    arms: Vec<Arc<dyn Arm>>,
    best_arm: usize,
    total_pulls: u64,
    regret: f64,
}

impl MultiArmedBandit {
    pub fn new(arms: Vec<Arc<dyn Arm>>) -> Result<Self, BanditError> {
        if arms.len() < 2 {
            return Err(BanditError::TooFewArms(arms.len()));
        }

        // first arm with the highest mean
        let best_arm = arms
            .iter()
            .enumerate()
            .fold(0, |best, (i, arm)| {
                if arm.mean() > arms[best].mean() {
                    i
                } else {
                    best
                }
            });

        Ok(Self {
            arms,
            best_arm,
            total_pulls: 0,
            regret: 0.0,
        })
    }

    pub fn arm_num(&self) -> usize {
        self.arms.len()
    }

    pub fn best_arm(&self) -> usize {
        self.best_arm
    }

    pub fn arms(&self) -> &[Arc<dyn Arm>] {
        &self.arms
    }

    pub fn total_pulls(&self) -> u64 {
        self.total_pulls
    }

    /// Validates every entry before pulling anything, then pulls in order.
    pub(crate) fn pull_arms(
        &mut self,
        actions: &Actions,
        rng: &mut dyn RngCore,
        bandit: &'static str,
    ) -> Result<Feedback, BanditError> {
        let pulls = actions
            .arm_pulls
            .iter()
            .map(|pull| match pull.arm {
                ArmKey::Single(arm_id) if arm_id < self.arms.len() => Ok((arm_id, pull.pulls)),
                ArmKey::Single(arm_id) => Err(BanditError::ArmNotFound(arm_id)),
                ArmKey::Assortment(_) => Err(BanditError::UnexpectedArmKey {
                    bandit,
                    expected: "single arm",
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let best_mean = self.arms[self.best_arm].mean();
        let arm_feedbacks = pulls
            .into_iter()
            .filter(|&(_, pulls)| pulls > 0)
            .map(|(arm_id, pulls)| {
                let rewards = self.arms[arm_id].pull(pulls, rng);
                self.total_pulls += pulls;
                self.regret += best_mean * pulls as f64 - rewards.iter().sum::<f64>();

                ArmFeedback {
                    arm: ArmKey::Single(arm_id),
                    rewards,
                    customer_feedbacks: Vec::new(),
                }
            })
            .collect();

        Ok(Feedback { arm_feedbacks })
    }

    pub(crate) fn accumulated_regret(&self) -> f64 {
        self.regret
    }

    pub(crate) fn best_arm_regret(&self, best_arm: &ArmKey, bandit: &'static str) -> Result<f64, BanditError> {
        match best_arm {
            ArmKey::Single(arm_id) if *arm_id < self.arms.len() => {
                Ok(if *arm_id == self.best_arm { 0.0 } else { 1.0 })
            }
            ArmKey::Single(arm_id) => Err(BanditError::ArmNotFound(*arm_id)),
            ArmKey::Assortment(_) => Err(BanditError::UnexpectedArmKey {
                bandit,
                expected: "single arm",
            }),
        }
    }
}

impl Bandit for MultiArmedBandit {
    fn name(&self) -> &'static str {
        "MultiArmedBandit"
    }

    fn kind(&self) -> BanditKind {
        BanditKind::MultiArmed
    }

    fn reset(&mut self) {
        self.total_pulls = 0;
        self.regret = 0.0;
    }

    fn context(&self) -> Context {
        Context::Ordinary {
            arm_num: self.arms.len(),
        }
    }

    fn feed(&mut self, actions: &Actions, rng: &mut dyn RngCore) -> Result<Feedback, BanditError> {
        self.pull_arms(actions, rng, self.name())
    }

    fn regret(&self, goal: &Goal) -> Result<f64, BanditError> {
        match goal {
            Goal::MaximizeTotalRewards => Ok(self.regret),
            Goal::IdentifyBestArm { best_arm } => self.best_arm_regret(best_arm, self.name()),
            other => Err(BanditError::UnsupportedGoal {
                goal: other.name(),
                bandit: self.name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arms::{BernoulliArm, GaussianArm};
    use crate::bandits::ArmPull;
    use rand::{rngs::SmallRng, SeedableRng};

    const SEED: u64 = 1234;

    fn bernoulli_bandit(means: &[f64]) -> MultiArmedBandit {
        let arms = means
            .iter()
            .map(|&mean| Arc::new(BernoulliArm::new(mean).unwrap()) as Arc<dyn Arm>)
            .collect();
        MultiArmedBandit::new(arms).unwrap()
    }

    #[test]
    fn requires_two_arms() {
        let arms = vec![Arc::new(BernoulliArm::new(0.5).unwrap()) as Arc<dyn Arm>];
        assert!(matches!(
            MultiArmedBandit::new(arms),
            Err(BanditError::TooFewArms(1))
        ));
    }

    #[test]
    fn regret_of_pulling_the_worst_arm() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut bandit = bernoulli_bandit(&[0.0, 1.0]);
        bandit.reset();

        let feedback = bandit.feed(&Actions::pull(0, 100), &mut rng).unwrap();
        assert_eq!(feedback.arm_feedbacks.len(), 1);
        assert_eq!(feedback.arm_feedbacks[0].rewards.len(), 100);

        assert_eq!(bandit.regret(&Goal::MaximizeTotalRewards).unwrap(), 100.0);
        assert_eq!(bandit.regret(&Goal::best_arm(1)).unwrap(), 0.0);
        assert_eq!(bandit.regret(&Goal::best_arm(0)).unwrap(), 1.0);
    }

    #[test]
    fn regret_is_additive_over_feeds() {
        let make = || {
            let arms = vec![
                Arc::new(GaussianArm::new(0.0, 0.0).unwrap()) as Arc<dyn Arm>,
                Arc::new(GaussianArm::new(0.75, 0.0).unwrap()) as Arc<dyn Arm>,
            ];
            MultiArmedBandit::new(arms).unwrap()
        };
        let mut rng = SmallRng::seed_from_u64(SEED);

        let mut split = make();
        split.reset();
        split.feed(&Actions::pull(0, 7), &mut rng).unwrap();
        split.feed(&Actions::pull(0, 13), &mut rng).unwrap();

        let mut joined = make();
        joined.reset();
        joined.feed(&Actions::pull(0, 20), &mut rng).unwrap();

        let split_regret = split.regret(&Goal::MaximizeTotalRewards).unwrap();
        let joined_regret = joined.regret(&Goal::MaximizeTotalRewards).unwrap();
        assert!((split_regret - joined_regret).abs() < 1e-9);
        assert!((joined_regret - 15.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_arm_fails_without_pulling() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut bandit = bernoulli_bandit(&[0.2, 0.8]);
        bandit.reset();

        let actions = Actions::new(vec![ArmPull::single(0, 3), ArmPull::single(2, 1)]);
        assert!(matches!(
            bandit.feed(&actions, &mut rng),
            Err(BanditError::ArmNotFound(2))
        ));
        assert_eq!(bandit.total_pulls(), 0);
    }

    #[test]
    fn zero_pulls_are_skipped() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut bandit = bernoulli_bandit(&[0.2, 0.8]);
        bandit.reset();

        let actions = Actions::new(vec![ArmPull::single(0, 0), ArmPull::single(1, 2)]);
        let feedback = bandit.feed(&actions, &mut rng).unwrap();
        assert_eq!(feedback.arm_feedbacks.len(), 1);
        assert_eq!(feedback.arm_feedbacks[0].arm, ArmKey::Single(1));
        assert_eq!(bandit.total_pulls(), 2);
    }

    #[test]
    fn reset_clears_regret() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut bandit = bernoulli_bandit(&[0.0, 1.0]);
        bandit.reset();
        bandit.feed(&Actions::pull(0, 10), &mut rng).unwrap();
        bandit.reset();
        assert_eq!(bandit.regret(&Goal::MaximizeTotalRewards).unwrap(), 0.0);
        assert_eq!(bandit.best_arm(), 1);
    }

    #[test]
    fn rejects_thresholding_goals() {
        let bandit = bernoulli_bandit(&[0.2, 0.8]);
        let goal = Goal::MakeAllAnswersCorrect {
            answers: vec![0, 1],
        };
        assert!(matches!(
            bandit.regret(&goal),
            Err(BanditError::UnsupportedGoal { .. })
        ));
    }
}
