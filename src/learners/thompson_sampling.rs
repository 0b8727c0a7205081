use super::errors::LearnerError;
use super::utils::{argmax_random, check_arm_count, check_arm_num, feedback_arm};
use super::Learner;

use crate::arms::PseudoArm;
use crate::bandits::{Actions, BanditKind, Context, Feedback, Goal};

use rand::RngCore;
use rand_distr::{Beta, Distribution, Normal};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Prior {
    /// Rewards in [0, 1].
    #[default]
    Beta,
    /// `Normal(rewards / (pulls + 1), variance = 1 / (pulls + 1))`, the
    /// posterior of a unit-variance Gaussian arm under a standard normal
    /// prior. The standard deviation is the square root of that variance.
    Gaussian,
}

#[derive(Clone, Debug)]
pub struct ThompsonSampling {
    name: String,
    arm_num: usize,
    prior: Prior,
    arms: Vec<PseudoArm>,
}

impl ThompsonSampling {
    pub fn new(arm_num: usize, prior: Prior, name: Option<String>) -> Result<Self, LearnerError> {
        check_arm_count(arm_num)?;

        Ok(Self {
            name: name.unwrap_or_else(|| "thompson_sampling".to_string()),
            arm_num,
            prior,
            arms: vec![PseudoArm::new(); arm_num],
        })
    }

    fn sample(&self, arm: &PseudoArm, rng: &mut dyn RngCore) -> Result<f64, LearnerError> {
        let pulls = arm.total_pulls() as f64;
        let rewards = arm.total_rewards();

        let sample = match self.prior {
            Prior::Beta => Beta::new(1.0 + rewards, 1.0 + pulls - rewards)
                .map_err(|e| LearnerError::Sampling(e.to_string()))?
                .sample(rng),
            // variance 1 / (pulls + 1)
            Prior::Gaussian => Normal::new(rewards / (pulls + 1.0), (1.0 / (pulls + 1.0)).sqrt())
                .map_err(|e| LearnerError::Sampling(e.to_string()))?
                .sample(rng),
        };
        Ok(sample)
    }
}

impl Learner for ThompsonSampling {
    fn name(&self) -> &str {
        &self.name
    }

    fn running_environment(&self) -> &'static [BanditKind] {
        &[BanditKind::MultiArmed, BanditKind::Linear]
    }

    fn reset(&mut self) {
        self.arms.iter_mut().for_each(PseudoArm::reset);
    }

    fn actions(&mut self, context: &Context, rng: &mut dyn RngCore) -> Result<Actions, LearnerError> {
        check_arm_num(context, self.arm_num)?;

        let samples = self
            .arms
            .iter()
            .map(|arm| self.sample(arm, &mut *rng))
            .collect::<Result<Vec<_>, _>>()?;
        let arm_id = argmax_random(&samples, rng).ok_or(LearnerError::TooFewArms(0))?;
        Ok(Actions::pull(arm_id, 1))
    }

    fn update(&mut self, feedback: &Feedback) -> Result<(), LearnerError> {
        for arm_feedback in &feedback.arm_feedbacks {
            let arm_id = feedback_arm(arm_feedback, self.arm_num)?;
            self.arms[arm_id].update(&arm_feedback.rewards);
        }
        Ok(())
    }

    fn goal(&self) -> Result<Goal, LearnerError> {
        Ok(Goal::MaximizeTotalRewards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bandits::{ArmFeedback, ArmKey};
    use rand::{rngs::SmallRng, SeedableRng};

    const SEED: u64 = 1234;

    fn feedback(arm_id: usize, rewards: Vec<f64>) -> Feedback {
        Feedback {
            arm_feedbacks: vec![ArmFeedback {
                arm: ArmKey::Single(arm_id),
                rewards,
                customer_feedbacks: Vec::new(),
            }],
        }
    }

    #[test]
    fn draw_best_beta() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut policy = ThompsonSampling::new(2, Prior::Beta, None).unwrap();
        let context = Context::Ordinary { arm_num: 2 };

        policy.update(&feedback(0, vec![0.0; 200])).unwrap();
        policy.update(&feedback(1, vec![1.0; 200])).unwrap();

        for _ in 0..20 {
            assert_eq!(policy.actions(&context, &mut rng).unwrap(), Actions::pull(1, 1));
        }
    }

    #[test]
    fn draw_best_gaussian() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut policy = ThompsonSampling::new(2, Prior::Gaussian, None).unwrap();
        let context = Context::Ordinary { arm_num: 2 };

        policy.update(&feedback(0, vec![5.0; 400])).unwrap();
        policy.update(&feedback(1, vec![-5.0; 400])).unwrap();

        for _ in 0..20 {
            assert_eq!(policy.actions(&context, &mut rng).unwrap(), Actions::pull(0, 1));
        }
    }

    #[test]
    fn same_seed_same_draws() {
        let context = Context::Ordinary { arm_num: 4 };
        let draws = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut policy = ThompsonSampling::new(4, Prior::Beta, None).unwrap();
            (0..10)
                .map(|_| policy.actions(&context, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draws(SEED), draws(SEED));
    }

    #[test]
    fn gaussian_posterior_variance() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let policy = ThompsonSampling::new(2, Prior::Gaussian, None).unwrap();
        let mut arm = PseudoArm::new();
        arm.update(&[1.0, 2.0, 3.0]);

        let samples = (0..20_000)
            .map(|_| policy.sample(&arm, &mut rng).unwrap())
            .collect::<Vec<_>>();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / samples.len() as f64;

        // posterior mean 6 / 4 and variance 1 / 4
        assert!((mean - 1.5).abs() < 0.02);
        assert!((var - 0.25).abs() < 0.02);
    }
}
