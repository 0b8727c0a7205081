use super::errors::LearnerError;
use super::utils::{argmin, check_arm_count, check_arm_num, feedback_arm};
use super::Learner;

use crate::arms::PseudoArm;
use crate::bandits::{Actions, BanditKind, Context, Feedback, Goal};

use rand::RngCore;

/// Anytime parameter-free thresholding: samples the arm whose side of the
/// threshold is the least certain.
#[derive(Clone, Debug)]
pub struct Apt {
    name: String,
    arm_num: usize,
    threshold: f64,
    eps: f64,
    budget: u64,
    arms: Vec<PseudoArm>,
}

impl Apt {
    pub fn new(
        arm_num: usize,
        threshold: f64,
        eps: f64,
        budget: u64,
        name: Option<String>,
    ) -> Result<Self, LearnerError> {
        check_arm_count(arm_num)?;
        if !threshold.is_finite() {
            return Err(LearnerError::InvalidParameter(format!(
                "threshold {threshold} must be finite"
            )));
        }
        if !eps.is_finite() || eps < 0.0 {
            return Err(LearnerError::InvalidParameter(format!(
                "eps {eps} must be non-negative"
            )));
        }
        if budget < arm_num as u64 {
            return Err(LearnerError::BudgetTooSmall {
                budget,
                required: arm_num as u64,
            });
        }

        Ok(Self {
            name: name.unwrap_or_else(|| "apt".to_string()),
            arm_num,
            threshold,
            eps,
            budget,
            arms: vec![PseudoArm::new(); arm_num],
        })
    }

    fn total_pulls(&self) -> u64 {
        self.arms.iter().map(PseudoArm::total_pulls).sum()
    }

    fn metric(&self, arm: &PseudoArm) -> Result<f64, LearnerError> {
        let gap = (arm.em_mean()? - self.threshold).abs();
        Ok((arm.total_pulls() as f64).sqrt() * (gap + self.eps))
    }
}

impl Learner for Apt {
    fn name(&self) -> &str {
        &self.name
    }

    fn running_environment(&self) -> &'static [BanditKind] {
        &[BanditKind::Thresholding]
    }

    fn reset(&mut self) {
        self.arms.iter_mut().for_each(PseudoArm::reset);
    }

    fn actions(&mut self, context: &Context, _: &mut dyn RngCore) -> Result<Actions, LearnerError> {
        check_arm_num(context, self.arm_num)?;

        if self.total_pulls() >= self.budget {
            return Ok(Actions::empty());
        }
        if let Some(arm_id) = self.arms.iter().position(|arm| arm.total_pulls() == 0) {
            return Ok(Actions::pull(arm_id, 1));
        }

        let metrics = self
            .arms
            .iter()
            .map(|arm| self.metric(arm))
            .collect::<Result<Vec<_>, _>>()?;
        let arm_id = argmin(&metrics).ok_or(LearnerError::TooFewArms(0))?;
        Ok(Actions::pull(arm_id, 1))
    }

    fn update(&mut self, feedback: &Feedback) -> Result<(), LearnerError> {
        for arm_feedback in &feedback.arm_feedbacks {
            let arm_id = feedback_arm(arm_feedback, self.arm_num)?;
            self.arms[arm_id].update(&arm_feedback.rewards);
        }
        Ok(())
    }

    /// Unsampled arms are answered below the threshold.
    fn goal(&self) -> Result<Goal, LearnerError> {
        let answers = self
            .arms
            .iter()
            .map(|arm| u8::from(arm.em_mean().is_ok_and(|mean| mean >= self.threshold)))
            .collect();
        Ok(Goal::MakeAllAnswersCorrect { answers })
    }

    fn budget(&self) -> Option<u64> {
        Some(self.budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learners::utils::constant_feedback;
    use rand::{rngs::SmallRng, SeedableRng};

    const SEED: u64 = 1234;

    #[test]
    fn samples_the_arm_closest_to_the_threshold() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let means = [0.1, 0.45, 0.9];
        let context = Context::Thresholding {
            arm_num: 3,
            threshold: 0.5,
        };
        let mut policy = Apt::new(3, 0.5, 0.05, 100, None).unwrap();

        for _ in 0..3 {
            let actions = policy.actions(&context, &mut rng).unwrap();
            policy.update(&constant_feedback(&actions, &means)).unwrap();
        }
        // metrics 0.45, 0.1, 0.45
        assert_eq!(policy.actions(&context, &mut rng).unwrap(), Actions::pull(1, 1));
    }

    #[test]
    fn stops_at_budget_and_answers() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let means = [0.1, 0.45, 0.9, 0.6];
        let context = Context::Thresholding {
            arm_num: 4,
            threshold: 0.5,
        };
        let mut policy = Apt::new(4, 0.5, 0.0, 20, None).unwrap();

        let mut total = 0;
        loop {
            let actions = policy.actions(&context, &mut rng).unwrap();
            if actions.is_empty() {
                break;
            }
            total += actions.total_pulls();
            policy.update(&constant_feedback(&actions, &means)).unwrap();
        }
        assert_eq!(total, 20);
        assert_eq!(
            policy.goal().unwrap(),
            Goal::MakeAllAnswersCorrect {
                answers: vec![0, 0, 1, 1]
            }
        );
        assert_eq!(policy.budget(), Some(20));
    }
}
