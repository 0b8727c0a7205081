use super::errors::LearnerError;
use super::utils::{argmax, check_arm_count, check_arm_num, feedback_arm};
use super::Learner;

use crate::arms::PseudoArm;
use crate::bandits::{Actions, BanditKind, Context, Feedback, Goal};

use rand::{Rng, RngCore};

/// Explores a uniformly random arm with probability `epsilon / t`.
#[derive(Clone, Debug)]
pub struct EpsilonGreedy {
    name: String,
    arm_num: usize,
    epsilon: f64,
    arms: Vec<PseudoArm>,
    time: u64,
}

impl EpsilonGreedy {
    pub fn new(arm_num: usize, epsilon: f64, name: Option<String>) -> Result<Self, LearnerError> {
        check_arm_count(arm_num)?;
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(LearnerError::InvalidParameter(format!(
                "epsilon {epsilon} must be non-negative"
            )));
        }

        Ok(Self {
            name: name.unwrap_or_else(|| "epsilon_greedy".to_string()),
            arm_num,
            epsilon,
            arms: vec![PseudoArm::new(); arm_num],
            time: 1,
        })
    }
}

impl Learner for EpsilonGreedy {
    fn name(&self) -> &str {
        &self.name
    }

    fn running_environment(&self) -> &'static [BanditKind] {
        &[BanditKind::MultiArmed, BanditKind::Linear]
    }

    fn reset(&mut self) {
        self.arms.iter_mut().for_each(PseudoArm::reset);
        self.time = 1;
    }

    fn actions(&mut self, context: &Context, rng: &mut dyn RngCore) -> Result<Actions, LearnerError> {
        check_arm_num(context, self.arm_num)?;

        if self.time <= self.arm_num as u64 {
            return Ok(Actions::pull((self.time - 1) as usize, 1));
        }

        let explore_probability = (self.epsilon / self.time as f64).min(1.0);
        let arm_id = if rng.random::<f64>() < explore_probability {
            rng.random_range(0..self.arm_num)
        } else {
            let means = self
                .arms
                .iter()
                .map(PseudoArm::em_mean)
                .collect::<Result<Vec<_>, _>>()?;
            argmax(&means).ok_or(LearnerError::TooFewArms(0))?
        };
        Ok(Actions::pull(arm_id, 1))
    }

    fn update(&mut self, feedback: &Feedback) -> Result<(), LearnerError> {
        for arm_feedback in &feedback.arm_feedbacks {
            let arm_id = feedback_arm(arm_feedback, self.arm_num)?;
            self.arms[arm_id].update(&arm_feedback.rewards);
        }
        self.time += 1;
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
    fn greedy_without_exploration() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut policy = EpsilonGreedy::new(3, 0.0, None).unwrap();
        let context = Context::Ordinary { arm_num: 3 };

        policy.update(&feedback(0, vec![0.2])).unwrap();
        policy.update(&feedback(1, vec![0.9])).unwrap();
        policy.update(&feedback(2, vec![0.5])).unwrap();

        for _ in 0..20 {
            assert_eq!(policy.actions(&context, &mut rng).unwrap(), Actions::pull(1, 1));
        }
    }

    #[test]
    fn rejects_negative_epsilon() {
        assert!(EpsilonGreedy::new(2, -0.1, None).is_err());
    }

    #[test]
    fn update_rejects_unknown_arm() {
        let mut policy = EpsilonGreedy::new(2, 0.1, None).unwrap();
        assert!(policy.update(&feedback(5, vec![1.0])).is_err());
    }
}
