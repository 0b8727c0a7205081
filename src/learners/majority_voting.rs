use super::errors::LearnerError;
use super::utils::{bernoulli_outcome, check_arm_count, check_arm_num, feedback_arm};
use super::Learner;

use crate::arms::CategoricalPseudoArm;
use crate::bandits::{Actions, BanditKind, Context, Feedback, Goal};

use rand::RngCore;

/// Round-robin sampling of Bernoulli arms; each arm is answered with its
/// majority outcome.
#[derive(Clone, Debug)]
pub struct MajorityVoting {
    name: String,
    arm_num: usize,
    budget: u64,
    votes: Vec<CategoricalPseudoArm>,
    time: u64,
}

impl MajorityVoting {
    pub fn new(arm_num: usize, budget: u64, name: Option<String>) -> Result<Self, LearnerError> {
        check_arm_count(arm_num)?;
        if budget == 0 {
            return Err(LearnerError::BudgetTooSmall {
                budget,
                required: 1,
            });
        }

        Ok(Self {
            name: name.unwrap_or_else(|| "majority_voting".to_string()),
            arm_num,
            budget,
            votes: vec![CategoricalPseudoArm::new(2); arm_num],
            time: 0,
        })
    }
}

impl Learner for MajorityVoting {
    fn name(&self) -> &str {
        &self.name
    }

    fn running_environment(&self) -> &'static [BanditKind] {
        &[BanditKind::Thresholding]
    }

    fn reset(&mut self) {
        self.votes.iter_mut().for_each(CategoricalPseudoArm::reset);
        self.time = 0;
    }

    fn actions(&mut self, context: &Context, _: &mut dyn RngCore) -> Result<Actions, LearnerError> {
        check_arm_num(context, self.arm_num)?;

        if self.time >= self.budget {
            return Ok(Actions::empty());
        }
        Ok(Actions::pull((self.time % self.arm_num as u64) as usize, 1))
    }

    fn update(&mut self, feedback: &Feedback) -> Result<(), LearnerError> {
        for arm_feedback in &feedback.arm_feedbacks {
            let arm_id = feedback_arm(arm_feedback, self.arm_num)?;
            let outcomes = arm_feedback
                .rewards
                .iter()
                .map(|&reward| bernoulli_outcome(reward).map(usize::from))
                .collect::<Result<Vec<_>, _>>()?;
            self.votes[arm_id].update(&outcomes)?;
            self.time += outcomes.len() as u64;
        }
        Ok(())
    }

    fn goal(&self) -> Result<Goal, LearnerError> {
        let answers = self
            .votes
            .iter()
            .map(|votes| votes.top_category() as u8)
            .collect();
        Ok(Goal::MaximizeCorrectAnswers { answers })
    }

    fn budget(&self) -> Option<u64> {
        Some(self.budget)
    }
}
