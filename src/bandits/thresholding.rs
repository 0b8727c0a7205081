use super::errors::BanditError;
use super::goals::Goal;
use super::messages::{Actions, Context, Feedback};
use super::multi_armed::MultiArmedBandit;
use super::{Bandit, BanditKind};

use crate::arms::Arm;

use rand::RngCore;
use std::sync::Arc;

/// Bandit where the learner labels every arm as above or below `threshold`.
/// Arms whose mean lies within `radius` of the threshold are never counted as wrong.
#[derive(Clone, Debug)]
pub struct ThresholdingBandit {
    core: MultiArmedBandit,
    threshold: f64,
    radius: f64,
    labels: Vec<u8>,
    counted: Vec<bool>,
}

impl ThresholdingBandit {
    pub fn new(arms: Vec<Arc<dyn Arm>>, threshold: f64, radius: f64) -> Result<Self, BanditError> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(BanditError::InvalidParameter(format!(
                "indifference radius {radius} must be non-negative"
            )));
        }
        let labels = arms
            .iter()
            .map(|arm| u8::from(arm.mean() >= threshold))
            .collect();
        let counted = arms
            .iter()
            .map(|arm| (arm.mean() - threshold).abs() > radius)
            .collect();

        Ok(Self {
            core: MultiArmedBandit::new(arms)?,
            threshold,
            radius,
            labels,
            counted,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    fn wrong_answers(&self, answers: &[u8]) -> Result<usize, BanditError> {
        if answers.len() != self.labels.len() {
            return Err(BanditError::AnswerLengthMismatch {
                expected: self.labels.len(),
                got: answers.len(),
            });
        }

        Ok(answers
            .iter()
            .zip(&self.labels)
            .zip(&self.counted)
            .filter(|((answer, label), counted)| **counted && answer != label)
            .count())
    }
}

impl Bandit for ThresholdingBandit {
    fn name(&self) -> &'static str {
        "ThresholdingBandit"
    }

    fn kind(&self) -> BanditKind {
        BanditKind::Thresholding
    }

    fn reset(&mut self) {
        self.core.reset();
    }

    fn context(&self) -> Context {
        Context::Thresholding {
            arm_num: self.core.arm_num(),
            threshold: self.threshold,
        }
    }

    fn feed(&mut self, actions: &Actions, rng: &mut dyn RngCore) -> Result<Feedback, BanditError> {
        self.core.pull_arms(actions, rng, self.name())
    }

    fn regret(&self, goal: &Goal) -> Result<f64, BanditError> {
        match goal {
            Goal::MakeAllAnswersCorrect { answers } => {
                Ok(if self.wrong_answers(answers)? > 0 { 1.0 } else { 0.0 })
            }
            Goal::MaximizeCorrectAnswers { answers } => Ok(self.wrong_answers(answers)? as f64),
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
    use crate::arms::BernoulliArm;
    use rand::{rngs::SmallRng, SeedableRng};

    fn make_bandit(means: &[f64], threshold: f64, radius: f64) -> ThresholdingBandit {
        let arms = means
            .iter()
            .map(|&mean| Arc::new(BernoulliArm::new(mean).unwrap()) as Arc<dyn Arm>)
            .collect();
        ThresholdingBandit::new(arms, threshold, radius).unwrap()
    }

    #[test]
    fn labels_against_threshold() {
        let bandit = make_bandit(&[0.1, 0.5, 0.9], 0.5, 0.0);
        assert_eq!(bandit.labels(), &[0, 1, 1]);
    }

    #[test]
    fn counts_wrong_answers() {
        let bandit = make_bandit(&[0.1, 0.3, 0.9], 0.5, 0.0);
        let answers = vec![1, 1, 1];

        let all = Goal::MakeAllAnswersCorrect {
            answers: answers.clone(),
        };
        let count = Goal::MaximizeCorrectAnswers { answers };
        assert_eq!(bandit.regret(&all).unwrap(), 1.0);
        assert_eq!(bandit.regret(&count).unwrap(), 2.0);

        let correct = Goal::MakeAllAnswersCorrect {
            answers: vec![0, 0, 1],
        };
        assert_eq!(bandit.regret(&correct).unwrap(), 0.0);
    }

    #[test]
    fn indifference_zone_is_ignored() {
        let bandit = make_bandit(&[0.45, 0.9], 0.5, 0.1);
        let goal = Goal::MaximizeCorrectAnswers {
            answers: vec![1, 1],
        };
        assert_eq!(bandit.regret(&goal).unwrap(), 0.0);
    }

    #[test]
    fn rejects_wrong_answer_length_and_goal() {
        let bandit = make_bandit(&[0.1, 0.9], 0.5, 0.0);
        let goal = Goal::MaximizeCorrectAnswers { answers: vec![1] };
        assert!(matches!(
            bandit.regret(&goal),
            Err(BanditError::AnswerLengthMismatch { .. })
        ));
        assert!(bandit.regret(&Goal::MaximizeTotalRewards).is_err());
    }

    #[test]
    fn feeds_like_an_ordinary_bandit() {
        let mut rng = SmallRng::seed_from_u64(1234);
        let mut bandit = make_bandit(&[0.0, 1.0], 0.5, 0.0);
        bandit.reset();
        let feedback = bandit.feed(&Actions::pull(1, 4), &mut rng).unwrap();
        assert_eq!(feedback.arm_feedbacks[0].rewards, vec![1.0; 4]);
    }
}
