use super::errors::LearnerError;
use super::utils::{argmax, check_arm_count, check_arm_num, feedback_arm};
use super::Learner;

use crate::arms::PseudoArm;
use crate::bandits::{Actions, ArmPull, BanditKind, Context, Feedback, Goal};

use rand::RngCore;

const EPS: f64 = 0.0;
const BETA: f64 = 0.5;

/// Confidence radius of the lil' UCB family after `pulls` samples.
pub fn confidence_radius(pulls: u64, eps: f64, beta: f64, delta: f64) -> f64 {
    let scaled = (1.0 + eps) * pulls as f64;
    if scaled == 1.0 || pulls == 0 {
        return f64::INFINITY;
    }
    let log_term = (scaled.ln() / delta).ln().max(0.0);
    (1.0 + beta) * (1.0 + eps.sqrt()) * (2.0 * (1.0 + eps) * log_term / pulls as f64).sqrt()
}

/// lil' UCB stopping rule: one arm holds a dominating share of the pulls.
pub fn should_stop(arms: &[PseudoArm], a: f64) -> bool {
    let total = arms.iter().map(PseudoArm::total_pulls).sum::<u64>();
    arms.iter().any(|arm| {
        let pulls = arm.total_pulls();
        pulls as f64 >= 1.0 + a * (total - pulls) as f64
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Initialization,
    Sampling,
    Stopped,
}

/// lil' UCB heuristic for best arm identification with fixed confidence.
#[derive(Clone, Debug)]
pub struct LilUcbHeuristic {
    name: String,
    arm_num: usize,
    confidence: f64,
    a: f64,
    delta: f64,
    arms: Vec<PseudoArm>,
    stage: Stage,
}

impl LilUcbHeuristic {
    pub fn new(arm_num: usize, confidence: f64, name: Option<String>) -> Result<Self, LearnerError> {
        check_arm_count(arm_num)?;
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(LearnerError::InvalidParameter(format!(
                "confidence {confidence} must lie in (0, 1)"
            )));
        }

        Ok(Self {
            name: name.unwrap_or_else(|| "lil_ucb_heuristic".to_string()),
            arm_num,
            confidence,
            a: 1.0 + 10.0 / arm_num as f64,
            delta: (1.0 - confidence) / 5.0,
            arms: vec![PseudoArm::new(); arm_num],
            stage: Stage::Initialization,
        })
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    fn upper_confidence_bound(&self, arm: &PseudoArm) -> Result<f64, LearnerError> {
        Ok(arm.em_mean()? + confidence_radius(arm.total_pulls(), EPS, BETA, self.delta))
    }
}

impl Learner for LilUcbHeuristic {
    fn name(&self) -> &str {
        &self.name
    }

    fn running_environment(&self) -> &'static [BanditKind] {
        &[BanditKind::MultiArmed, BanditKind::Linear]
    }

    fn reset(&mut self) {
        self.arms.iter_mut().for_each(PseudoArm::reset);
        self.stage = Stage::Initialization;
    }

    fn actions(&mut self, context: &Context, _: &mut dyn RngCore) -> Result<Actions, LearnerError> {
        check_arm_num(context, self.arm_num)?;

        match self.stage {
            Stage::Initialization => Ok(Actions::new(
                (0..self.arm_num).map(|arm_id| ArmPull::single(arm_id, 1)).collect(),
            )),
            Stage::Stopped => Ok(Actions::empty()),
            Stage::Sampling => {
                if should_stop(&self.arms, self.a) {
                    self.stage = Stage::Stopped;
                    return Ok(Actions::empty());
                }
                let bounds = self
                    .arms
                    .iter()
                    .map(|arm| self.upper_confidence_bound(arm))
                    .collect::<Result<Vec<_>, _>>()?;
                let arm_id = argmax(&bounds).ok_or(LearnerError::TooFewArms(0))?;
                Ok(Actions::pull(arm_id, 1))
            }
        }
    }

    fn update(&mut self, feedback: &Feedback) -> Result<(), LearnerError> {
        for arm_feedback in &feedback.arm_feedbacks {
            let arm_id = feedback_arm(arm_feedback, self.arm_num)?;
            self.arms[arm_id].update(&arm_feedback.rewards);
        }
        if self.stage == Stage::Initialization {
            self.stage = Stage::Sampling;
        }
        Ok(())
    }

    /// The most pulled arm.
    fn goal(&self) -> Result<Goal, LearnerError> {
        let pulls = self
            .arms
            .iter()
            .map(|arm| arm.total_pulls() as f64)
            .collect::<Vec<_>>();
        let best = argmax(&pulls).ok_or(LearnerError::TooFewArms(0))?;
        Ok(Goal::best_arm(best))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learners::utils::constant_feedback;
    use rand::{rngs::SmallRng, SeedableRng};

    const SEED: u64 = 1234;

    #[test]
    fn radius_is_infinite_after_a_single_pull() {
        assert_eq!(confidence_radius(1, EPS, BETA, 0.01), f64::INFINITY);
        assert_eq!(confidence_radius(0, EPS, BETA, 0.01), f64::INFINITY);

        let radius = confidence_radius(2, EPS, BETA, 0.01);
        assert!(radius.is_finite() && radius > 0.0);
        assert!(confidence_radius(100, EPS, BETA, 0.01) < radius);
    }

    #[test]
    fn stopping_rule() {
        let mut arms = vec![PseudoArm::new(); 2];
        arms[0].update(&[1.0; 6]);
        arms[1].update(&[0.0]);
        assert!(!should_stop(&arms, 6.0));
        arms[0].update(&[1.0]);
        assert!(should_stop(&arms, 6.0));
    }

    #[test]
    fn identifies_the_best_arm() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let means = [0.9, 0.1];
        let context = Context::Ordinary { arm_num: 2 };
        let mut policy = LilUcbHeuristic::new(2, 0.95, None).unwrap();

        let first = policy.actions(&context, &mut rng).unwrap();
        assert_eq!(first.total_pulls(), 2);
        policy.update(&constant_feedback(&first, &means)).unwrap();

        let mut stopped = false;
        for _ in 0..10_000 {
            let actions = policy.actions(&context, &mut rng).unwrap();
            if actions.is_empty() {
                stopped = true;
                break;
            }
            policy.update(&constant_feedback(&actions, &means)).unwrap();
        }
        assert!(stopped);
        assert_eq!(policy.goal().unwrap(), Goal::best_arm(0));
    }

    #[test]
    fn rejects_bad_confidence() {
        assert!(LilUcbHeuristic::new(2, 1.0, None).is_err());
        assert!(LilUcbHeuristic::new(2, 0.0, None).is_err());
    }
}
