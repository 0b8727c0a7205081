use super::errors::LearnerError;
use super::utils::{check_arm_count, check_arm_num, empirical_best, feedback_arm};
use super::Learner;

use crate::arms::PseudoArm;
use crate::bandits::{Actions, ArmPull, BanditKind, Context, Feedback, Goal};

use rand::RngCore;
use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq)]
enum Stage {
    MainLoop,
    MedianElimination {
        candidates: Vec<usize>,
        eps: f64,
        delta: f64,
        /// Few enough candidates to sample them uniformly and pick the best.
        uniform: bool,
    },
    Stopped,
}

/// Exponential-gap elimination for fixed-confidence best arm identification.
/// Samples gathered in one stage are never reused by the next one.
#[derive(Clone, Debug)]
pub struct ExpGap {
    name: String,
    arm_num: usize,
    delta: f64,
    threshold: usize,
    main_arms: Vec<PseudoArm>,
    median_arms: Vec<PseudoArm>,
    active: Vec<usize>,
    round: u32,
    stage: Stage,
}

impl ExpGap {
    pub fn new(
        arm_num: usize,
        confidence: f64,
        threshold: usize,
        name: Option<String>,
    ) -> Result<Self, LearnerError> {
        check_arm_count(arm_num)?;
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(LearnerError::InvalidParameter(format!(
                "confidence {confidence} must lie in (0, 1)"
            )));
        }
        if threshold == 0 {
            return Err(LearnerError::InvalidParameter(
                "threshold must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            name: name.unwrap_or_else(|| "exp_gap".to_string()),
            arm_num,
            delta: 1.0 - confidence,
            threshold,
            main_arms: vec![PseudoArm::new(); arm_num],
            median_arms: vec![PseudoArm::new(); arm_num],
            active: (0..arm_num).collect(),
            round: 1,
            stage: Stage::MainLoop,
        })
    }

    pub fn active_arms(&self) -> &[usize] {
        &self.active
    }

    fn eps_r(&self) -> f64 {
        2f64.powi(-(self.round as i32)) / 4.0
    }

    fn delta_r(&self) -> f64 {
        self.delta / (50.0 * (self.round as f64).powi(3))
    }

    /// Keeps the arms whose main loop mean is within `eps_r` of the reference.
    fn finish_round(&mut self, reference: usize) -> Result<(), LearnerError> {
        let eps_r = self.eps_r();
        let reference_mean = self.main_arms[reference].em_mean()?;
        let mut kept = Vec::with_capacity(self.active.len());
        for &arm_id in &self.active {
            if self.main_arms[arm_id].em_mean()? >= reference_mean - eps_r {
                kept.push(arm_id);
            }
        }
        self.active = kept;
        self.round += 1;
        self.stage = Stage::MainLoop;
        Ok(())
    }

    fn keep_upper_median(&self, candidates: &[usize]) -> Result<Vec<usize>, LearnerError> {
        let mut ranked = candidates
            .iter()
            .map(|&arm_id| Ok((arm_id, self.median_arms[arm_id].em_mean()?)))
            .collect::<Result<Vec<_>, LearnerError>>()?;

        let mut means = ranked.iter().map(|(_, mean)| *mean).collect::<Vec<_>>();
        means.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let n = means.len();
        let median = if n % 2 == 1 {
            means[n / 2]
        } else {
            (means[n / 2 - 1] + means[n / 2]) / 2.0
        };

        let kept = ranked
            .iter()
            .filter(|(_, mean)| *mean >= median)
            .map(|(arm_id, _)| *arm_id)
            .collect::<Vec<_>>();
        if kept.len() < n {
            return Ok(kept);
        }

        // all tied at the median
        ranked.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(Ordering::Equal));
        ranked.truncate(n.div_ceil(2));
        Ok(ranked.into_iter().map(|(arm_id, _)| arm_id).collect())
    }

    fn uniform_pulls(candidates: &[usize], pulls: u64) -> Actions {
        Actions::new(
            candidates
                .iter()
                .map(|&arm_id| ArmPull::single(arm_id, pulls))
                .collect(),
        )
    }
}

impl Learner for ExpGap {
    fn name(&self) -> &str {
        &self.name
    }

    fn running_environment(&self) -> &'static [BanditKind] {
        &[BanditKind::MultiArmed, BanditKind::Linear]
    }

    fn reset(&mut self) {
        self.main_arms.iter_mut().for_each(PseudoArm::reset);
        self.median_arms.iter_mut().for_each(PseudoArm::reset);
        self.active = (0..self.arm_num).collect();
        self.round = 1;
        self.stage = Stage::MainLoop;
    }

    fn actions(&mut self, context: &Context, _: &mut dyn RngCore) -> Result<Actions, LearnerError> {
        check_arm_num(context, self.arm_num)?;

        loop {
            match &mut self.stage {
                Stage::Stopped => return Ok(Actions::empty()),
                Stage::MainLoop => {
                    if self.active.len() <= 1 {
                        self.stage = Stage::Stopped;
                        return Ok(Actions::empty());
                    }
                    let (eps_r, delta_r) = (self.eps_r(), self.delta_r());
                    let pulls = (2.0 / eps_r.powi(2) * (3.0 / delta_r).ln()).ceil() as u64;
                    self.main_arms.iter_mut().for_each(PseudoArm::reset);
                    return Ok(Self::uniform_pulls(&self.active, pulls));
                }
                Stage::MedianElimination {
                    candidates,
                    eps,
                    delta,
                    uniform,
                } => {
                    if candidates.len() == 1 {
                        let reference = candidates[0];
                        self.finish_round(reference)?;
                        continue;
                    }
                    *uniform = candidates.len() <= self.threshold;
                    let samples = if *uniform {
                        2.0 / eps.powi(2) * (2.0 * candidates.len() as f64 / *delta).ln()
                    } else {
                        4.0 / eps.powi(2) * (3.0 / *delta).ln()
                    };
                    let pulls = samples.ceil() as u64;
                    let actions = Self::uniform_pulls(candidates, pulls);
                    self.median_arms.iter_mut().for_each(PseudoArm::reset);
                    return Ok(actions);
                }
            }
        }
    }

    fn update(&mut self, feedback: &Feedback) -> Result<(), LearnerError> {
        let stage = std::mem::replace(&mut self.stage, Stage::Stopped);
        let arms = match stage {
            Stage::MainLoop => &mut self.main_arms,
            _ => &mut self.median_arms,
        };
        for arm_feedback in &feedback.arm_feedbacks {
            let arm_id = feedback_arm(arm_feedback, self.arm_num)?;
            arms[arm_id].update(&arm_feedback.rewards);
        }

        match stage {
            Stage::MainLoop => {
                self.stage = Stage::MedianElimination {
                    candidates: self.active.clone(),
                    eps: self.eps_r() / 8.0,
                    delta: self.delta_r() / 2.0,
                    uniform: false,
                };
                Ok(())
            }
            Stage::MedianElimination {
                candidates,
                eps,
                delta,
                uniform: true,
            } => {
                let reference = empirical_best(&self.median_arms, &candidates).ok_or(
                    LearnerError::UnexpectedFeedback(format!(
                        "no candidate left at eps {eps}, delta {delta}"
                    )),
                )?;
                self.finish_round(reference)
            }
            Stage::MedianElimination {
                candidates,
                eps,
                delta,
                uniform: false,
            } => {
                self.stage = Stage::MedianElimination {
                    candidates: self.keep_upper_median(&candidates)?,
                    eps: eps * 3.0 / 4.0,
                    delta: delta / 2.0,
                    uniform: false,
                };
                Ok(())
            }
            Stage::Stopped => Ok(()),
        }
    }

    fn goal(&self) -> Result<Goal, LearnerError> {
        let best =
            empirical_best(&self.main_arms, &self.active).ok_or(LearnerError::TooFewArms(0))?;
        Ok(Goal::best_arm(best))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learners::utils::constant_feedback;
    use rand::{rngs::SmallRng, SeedableRng};

    const SEED: u64 = 1234;

    fn run(policy: &mut ExpGap, means: &[f64]) -> Vec<Actions> {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let context = Context::Ordinary {
            arm_num: means.len(),
        };
        let mut history = Vec::new();
        for _ in 0..1_000 {
            let actions = policy.actions(&context, &mut rng).unwrap();
            if actions.is_empty() {
                return history;
            }
            policy.update(&constant_feedback(&actions, means)).unwrap();
            history.push(actions);
        }
        panic!("exp gap did not stop");
    }

    #[test]
    fn first_round_sample_sizes() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let context = Context::Ordinary { arm_num: 4 };
        let mut policy = ExpGap::new(4, 0.95, 1, None).unwrap();

        // eps_1 = 1/8, delta_1 = 0.05 / 50
        let main = policy.actions(&context, &mut rng).unwrap();
        let expected = (128.0 * (3.0f64 / 0.001).ln()).ceil() as u64;
        assert_eq!(main.arm_pulls.len(), 4);
        assert!(main.arm_pulls.iter().all(|pull| pull.pulls == expected));
        policy
            .update(&constant_feedback(&main, &[0.1, 0.2, 0.3, 0.4]))
            .unwrap();

        // eps_l = 1/64, delta_l = 0.0005
        let median = policy.actions(&context, &mut rng).unwrap();
        let expected = (4.0 * 4096.0 * (3.0f64 / 0.0005).ln()).ceil() as u64;
        assert!(median.arm_pulls.iter().all(|pull| pull.pulls == expected));
    }

    #[test]
    fn median_elimination_halves_candidates() {
        let means = [0.1, 0.2, 0.3, 0.4];
        let mut policy = ExpGap::new(4, 0.95, 1, None).unwrap();
        let history = run(&mut policy, &means);

        // main loop, median rounds over 4 then 2 arms
        let sizes = history
            .iter()
            .take(3)
            .map(|actions| actions.arm_pulls.len())
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(policy.active_arms(), &[3]);
        assert_eq!(policy.goal().unwrap(), Goal::best_arm(3));
    }

    #[test]
    fn uniform_round_below_threshold() {
        let means = [0.1, 0.9, 0.5];
        let mut policy = ExpGap::new(3, 0.9, 3, None).unwrap();
        let history = run(&mut policy, &means);

        assert_eq!(history.len(), 2);
        assert_eq!(history[1].arm_pulls.len(), 3);
        assert_eq!(policy.goal().unwrap(), Goal::best_arm(1));
    }

    #[test]
    fn tied_arms_still_shrink() {
        let means = [0.5, 0.5, 0.5, 0.5];
        let mut policy = ExpGap::new(4, 0.9, 1, None).unwrap();
        let mut rng = SmallRng::seed_from_u64(SEED);
        let context = Context::Ordinary { arm_num: 4 };

        let main = policy.actions(&context, &mut rng).unwrap();
        policy.update(&constant_feedback(&main, &means)).unwrap();
        let median = policy.actions(&context, &mut rng).unwrap();
        policy.update(&constant_feedback(&median, &means)).unwrap();
        let next = policy.actions(&context, &mut rng).unwrap();
        assert_eq!(next.arm_pulls.len(), 2);
    }
}
