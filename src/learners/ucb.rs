use super::errors::LearnerError;
use super::utils::{argmax, check_arm_count, check_arm_num, feedback_arm};
use super::Learner;

use crate::arms::PseudoArm;
use crate::bandits::{Actions, BanditKind, Context, Feedback, Goal};

use rand::RngCore;

/// UCB1 with exploration parameter `alpha`.
#[derive(Clone, Debug)]
pub struct Ucb {
    name: String,
    arm_num: usize,
    alpha: f64,
    arms: Vec<PseudoArm>,
    time: u64,
}

impl Ucb {
    pub fn new(arm_num: usize, alpha: f64, name: Option<String>) -> Result<Self, LearnerError> {
        check_arm_count(arm_num)?;
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(LearnerError::InvalidParameter(format!(
                "alpha {alpha} must be positive"
            )));
        }

        Ok(Self {
            name: name.unwrap_or_else(|| "ucb".to_string()),
            arm_num,
            alpha,
            arms: vec![PseudoArm::new(); arm_num],
            time: 1,
        })
    }

    fn upper_confidence_bound(&self, arm: &PseudoArm) -> Result<f64, LearnerError> {
        let bonus = (self.alpha * (self.time as f64).ln() / arm.total_pulls() as f64).sqrt();
        Ok(arm.em_mean()? + bonus)
    }
}

impl Learner for Ucb {
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

    fn actions(&mut self, context: &Context, _: &mut dyn RngCore) -> Result<Actions, LearnerError> {
        check_arm_num(context, self.arm_num)?;

        // pull every arm once before trusting the bounds
        if self.time <= self.arm_num as u64 {
            return Ok(Actions::pull((self.time - 1) as usize, 1));
        }

        let bounds = self
            .arms
            .iter()
            .map(|arm| self.upper_confidence_bound(arm))
            .collect::<Result<Vec<_>, _>>()?;
        let arm_id = argmax(&bounds).ok_or(LearnerError::TooFewArms(0))?;
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
