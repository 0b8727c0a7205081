use super::errors::LearnerError;
use super::utils::{check_arm_count, check_arm_num, empirical_best, feedback_arm};
use super::Learner;

use crate::arms::PseudoArm;
use crate::bandits::{Actions, ArmPull, BanditKind, Context, Feedback, Goal};

use rand::RngCore;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Halving,
    /// Remaining budget spread uniformly over the survivors.
    Uniform,
}

/// Fixed-budget best arm identification halving the active set every round.
#[derive(Clone, Debug)]
pub struct SequentialHalving {
    name: String,
    arm_num: usize,
    budget: u64,
    threshold: usize,
    total_rounds: u64,
    arms: Vec<PseudoArm>,
    active: Vec<usize>,
    stage: Stage,
    spent: u64,
}

impl SequentialHalving {
    pub fn new(
        arm_num: usize,
        budget: u64,
        threshold: usize,
        name: Option<String>,
    ) -> Result<Self, LearnerError> {
        check_arm_count(arm_num)?;
        if threshold == 0 {
            return Err(LearnerError::InvalidParameter(
                "threshold must be at least 1".to_string(),
            ));
        }
        let total_rounds = (arm_num as f64).log2().ceil() as u64;
        let required = arm_num as u64 * total_rounds;
        if budget < required {
            return Err(LearnerError::BudgetTooSmall { budget, required });
        }

        Ok(Self {
            name: name.unwrap_or_else(|| "sequential_halving".to_string()),
            arm_num,
            budget,
            threshold,
            total_rounds,
            arms: vec![PseudoArm::new(); arm_num],
            active: (0..arm_num).collect(),
            stage: Stage::Halving,
            spent: 0,
        })
    }

    pub fn active_arms(&self) -> &[usize] {
        &self.active
    }

    fn halve(&mut self) -> Result<(), LearnerError> {
        let mut ranked = self
            .active
            .iter()
            .map(|&arm_id| Ok((arm_id, self.arms[arm_id].em_mean()?)))
            .collect::<Result<Vec<_>, LearnerError>>()?;
        ranked.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(Ordering::Equal));
        ranked.truncate(self.active.len().div_ceil(2));
        self.active = ranked.into_iter().map(|(arm_id, _)| arm_id).collect();
        Ok(())
    }
}

impl Learner for SequentialHalving {
    fn name(&self) -> &str {
        &self.name
    }

    fn running_environment(&self) -> &'static [BanditKind] {
        &[BanditKind::MultiArmed, BanditKind::Linear]
    }

    fn reset(&mut self) {
        self.arms.iter_mut().for_each(PseudoArm::reset);
        self.active = (0..self.arm_num).collect();
        self.stage = Stage::Halving;
        self.spent = 0;
    }

    fn actions(&mut self, context: &Context, _: &mut dyn RngCore) -> Result<Actions, LearnerError> {
        check_arm_num(context, self.arm_num)?;

        if self.active.len() <= 1 {
            return Ok(Actions::empty());
        }

        if self.active.len() <= self.threshold {
            let remaining = self.budget.saturating_sub(self.spent);
            let active = self.active.len() as u64;
            let (each, extra) = (remaining / active, remaining % active);
            let arm_pulls = self
                .active
                .iter()
                .enumerate()
                .map(|(i, &arm_id)| ArmPull::single(arm_id, each + u64::from((i as u64) < extra)))
                .filter(|pull| pull.pulls > 0)
                .collect::<Vec<_>>();

            if arm_pulls.is_empty() {
                let best = empirical_best(&self.arms, &self.active);
                self.active = best.into_iter().collect();
                return Ok(Actions::empty());
            }
            self.stage = Stage::Uniform;
            return Ok(Actions::new(arm_pulls));
        }

        let pulls = self.budget / (self.active.len() as u64 * self.total_rounds);
        self.stage = Stage::Halving;
        Ok(Actions::new(
            self.active
                .iter()
                .map(|&arm_id| ArmPull::single(arm_id, pulls))
                .collect(),
        ))
    }

    fn update(&mut self, feedback: &Feedback) -> Result<(), LearnerError> {
        for arm_feedback in &feedback.arm_feedbacks {
            let arm_id = feedback_arm(arm_feedback, self.arm_num)?;
            self.arms[arm_id].update(&arm_feedback.rewards);
            self.spent += arm_feedback.rewards.len() as u64;
        }

        match self.stage {
            Stage::Halving => self.halve(),
            Stage::Uniform => {
                let best = empirical_best(&self.arms, &self.active);
                self.active = best.into_iter().collect();
                Ok(())
            }
        }
    }

    fn goal(&self) -> Result<Goal, LearnerError> {
        let best = empirical_best(&self.arms, &self.active).ok_or(LearnerError::TooFewArms(0))?;
        Ok(Goal::best_arm(best))
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

    fn run(policy: &mut SequentialHalving, means: &[f64]) -> (Vec<usize>, u64) {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let context = Context::Ordinary {
            arm_num: means.len(),
        };
        let mut active_counts = Vec::new();
        let mut total = 0;
        loop {
            let actions = policy.actions(&context, &mut rng).unwrap();
            if actions.is_empty() {
                break;
            }
            total += actions.total_pulls();
            policy.update(&constant_feedback(&actions, means)).unwrap();
            active_counts.push(policy.active_arms().len());
        }
        (active_counts, total)
    }

    #[test]
    fn rejects_small_budget() {
        // 5 arms need 3 rounds
        assert!(matches!(
            SequentialHalving::new(5, 14, 1, None),
            Err(LearnerError::BudgetTooSmall {
                budget: 14,
                required: 15
            })
        ));
        assert!(SequentialHalving::new(5, 15, 1, None).is_ok());
        assert!(SequentialHalving::new(5, 15, 0, None).is_err());
    }

    #[test]
    fn halves_down_to_one_arm() {
        let means = [0.1, 0.5, 0.3, 0.9, 0.7, 0.2, 0.4, 0.6];
        let mut policy = SequentialHalving::new(8, 240, 1, None).unwrap();

        let (active_counts, total) = run(&mut policy, &means);
        assert_eq!(active_counts, vec![4, 2, 1]);
        // 10 * 8 + 20 * 4 + 40 * 2
        assert_eq!(total, 240);
        assert_eq!(policy.goal().unwrap(), Goal::best_arm(3));
    }

    #[test]
    fn odd_counts_keep_the_upper_half() {
        let means = [0.1, 0.5, 0.3, 0.9, 0.7];
        let mut policy = SequentialHalving::new(5, 30, 1, None).unwrap();

        let (active_counts, _) = run(&mut policy, &means);
        assert_eq!(active_counts, vec![3, 2, 1]);
        assert_eq!(policy.goal().unwrap(), Goal::best_arm(3));
    }

    #[test]
    fn final_uniform_round_spends_the_rest() {
        let means = [0.1, 0.5, 0.3, 0.9, 0.7, 0.2, 0.4, 0.6];
        let mut policy = SequentialHalving::new(8, 100, 4, None).unwrap();

        // one halving round of 4 pulls each, then 68 left over 4 arms
        let (active_counts, total) = run(&mut policy, &means);
        assert_eq!(active_counts, vec![4, 1]);
        assert_eq!(total, 100);
        assert_eq!(policy.goal().unwrap(), Goal::best_arm(3));
    }
}
