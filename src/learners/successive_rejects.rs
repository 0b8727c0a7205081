use super::errors::LearnerError;
use super::utils::{argmin, check_arm_count, check_arm_num, empirical_best, feedback_arm};
use super::Learner;

use crate::arms::PseudoArm;
use crate::bandits::{Actions, ArmPull, BanditKind, Context, Feedback, Goal};

use rand::RngCore;

/// Fixed-budget best arm identification: `K - 1` rounds, each dropping the
/// arm with the lowest empirical mean.
#[derive(Clone, Debug)]
pub struct SuccessiveRejects {
    name: String,
    arm_num: usize,
    budget: u64,
    /// `0.5 + sum_{i=2}^{K} 1/i`
    bar_log: f64,
    arms: Vec<PseudoArm>,
    active: Vec<usize>,
    round: usize,
    /// Pulls per surviving arm at the end of the previous round.
    previous_pulls: u64,
    spent: u64,
}

impl SuccessiveRejects {
    pub fn new(arm_num: usize, budget: u64, name: Option<String>) -> Result<Self, LearnerError> {
        check_arm_count(arm_num)?;
        if budget < arm_num as u64 {
            return Err(LearnerError::BudgetTooSmall {
                budget,
                required: arm_num as u64,
            });
        }

        let bar_log = 0.5 + (2..=arm_num).map(|i| 1.0 / i as f64).sum::<f64>();
        Ok(Self {
            name: name.unwrap_or_else(|| "successive_rejects".to_string()),
            arm_num,
            budget,
            bar_log,
            arms: vec![PseudoArm::new(); arm_num],
            active: (0..arm_num).collect(),
            round: 1,
            previous_pulls: 0,
            spent: 0,
        })
    }

    pub fn active_arms(&self) -> &[usize] {
        &self.active
    }

    /// `n_k` of round `k`, at least one pull in the first round.
    fn pulls_up_to(&self, round: usize) -> u64 {
        let remaining = (self.budget - self.arm_num as u64) as f64;
        let n_k = (remaining / (self.bar_log * (self.arm_num + 1 - round) as f64)).ceil() as u64;
        if round == 1 {
            n_k.max(1)
        } else {
            n_k
        }
    }

    fn reject(&mut self) -> Result<(), LearnerError> {
        let means = self
            .active
            .iter()
            .map(|&arm_id| self.arms[arm_id].em_mean())
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(worst) = argmin(&means) {
            self.active.remove(worst);
        }
        self.round += 1;
        Ok(())
    }
}

impl Learner for SuccessiveRejects {
    fn name(&self) -> &str {
        &self.name
    }

    fn running_environment(&self) -> &'static [BanditKind] {
        &[BanditKind::MultiArmed, BanditKind::Linear]
    }

    fn reset(&mut self) {
        self.arms.iter_mut().for_each(PseudoArm::reset);
        self.active = (0..self.arm_num).collect();
        self.round = 1;
        self.previous_pulls = 0;
        self.spent = 0;
    }

    fn actions(&mut self, context: &Context, _: &mut dyn RngCore) -> Result<Actions, LearnerError> {
        check_arm_num(context, self.arm_num)?;

        loop {
            match self.active.len() {
                0 | 1 => return Ok(Actions::empty()),
                2 => {
                    let remaining = self.budget.saturating_sub(self.spent);
                    if remaining == 0 {
                        self.reject()?;
                        continue;
                    }
                    let first = remaining / 2;
                    let arm_pulls = [(self.active[0], first), (self.active[1], remaining - first)]
                        .into_iter()
                        .filter(|&(_, pulls)| pulls > 0)
                        .map(|(arm_id, pulls)| ArmPull::single(arm_id, pulls))
                        .collect();
                    return Ok(Actions::new(arm_pulls));
                }
                _ => {
                    let target = self.pulls_up_to(self.round);
                    let pulls = target.saturating_sub(self.previous_pulls);
                    self.previous_pulls = self.previous_pulls.max(target);
                    if pulls == 0 {
                        self.reject()?;
                        continue;
                    }
                    let arm_pulls = self
                        .active
                        .iter()
                        .map(|&arm_id| ArmPull::single(arm_id, pulls))
                        .collect();
                    return Ok(Actions::new(arm_pulls));
                }
            }
        }
    }

    fn update(&mut self, feedback: &Feedback) -> Result<(), LearnerError> {
        for arm_feedback in &feedback.arm_feedbacks {
            let arm_id = feedback_arm(arm_feedback, self.arm_num)?;
            self.arms[arm_id].update(&arm_feedback.rewards);
            self.spent += arm_feedback.rewards.len() as u64;
        }
        self.reject()
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

    #[test]
    fn rejects_small_budget() {
        assert!(matches!(
            SuccessiveRejects::new(4, 3, None),
            Err(LearnerError::BudgetTooSmall {
                budget: 3,
                required: 4
            })
        ));
    }

    #[test]
    fn drops_one_arm_per_round_and_spends_the_budget() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let means = [0.1, 0.4, 0.2, 0.3];
        let context = Context::Ordinary { arm_num: 4 };
        let mut policy = SuccessiveRejects::new(4, 100, None).unwrap();

        let mut total = 0;
        let mut pulls_per_round = Vec::new();
        for round in 1..4 {
            let actions = policy.actions(&context, &mut rng).unwrap();
            pulls_per_round.push(
                actions
                    .arm_pulls
                    .iter()
                    .map(|pull| pull.pulls)
                    .collect::<Vec<_>>(),
            );
            total += actions.total_pulls();
            policy.update(&constant_feedback(&actions, &means)).unwrap();
            assert_eq!(policy.active_arms().len(), 4 - round);
        }

        // n_1 = 16, n_2 = 21, then the remaining 21 split 10 / 11
        assert_eq!(pulls_per_round, vec![vec![16; 4], vec![5; 3], vec![10, 11]]);
        assert_eq!(total, 100);
        assert!(policy.actions(&context, &mut rng).unwrap().is_empty());
        assert_eq!(policy.goal().unwrap(), Goal::best_arm(1));
    }

    #[test]
    fn minimal_budget_still_answers() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let means = [0.5, 0.9, 0.1];
        let context = Context::Ordinary { arm_num: 3 };
        let mut policy = SuccessiveRejects::new(3, 3, None).unwrap();

        let mut total = 0;
        loop {
            let actions = policy.actions(&context, &mut rng).unwrap();
            if actions.is_empty() {
                break;
            }
            total += actions.total_pulls();
            policy.update(&constant_feedback(&actions, &means)).unwrap();
        }
        assert_eq!(total, 3);
        assert_eq!(policy.goal().unwrap(), Goal::best_arm(1));
    }

    #[test]
    fn reset_restores_all_arms() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let context = Context::Ordinary { arm_num: 3 };
        let mut policy = SuccessiveRejects::new(3, 30, None).unwrap();
        let actions = policy.actions(&context, &mut rng).unwrap();
        policy
            .update(&constant_feedback(&actions, &[0.1, 0.2, 0.3]))
            .unwrap();
        assert_eq!(policy.active_arms().len(), 2);

        policy.reset();
        assert_eq!(policy.active_arms(), &[0, 1, 2]);
    }
}
