use super::errors::LearnerError;
use super::utils::{argmin, bernoulli_outcome, check_arm_count, check_arm_num, feedback_arm};
use super::Learner;

use crate::bandits::{Actions, BanditKind, Context, Feedback, Goal};

use rand::RngCore;

fn h(x: f64) -> f64 {
    x.max(1.0 - x)
}

/// Beta(a, b) posterior of a Bernoulli arm, tracking `P(mu <= threshold)`
/// incrementally instead of re-evaluating the incomplete beta function.
#[derive(Clone, Debug, PartialEq)]
struct BetaPosterior {
    a: f64,
    b: f64,
    /// `ln B(a, b)`
    log_beta: f64,
    /// `I_threshold(a, b)`
    below: f64,
}

impl BetaPosterior {
    fn new(threshold: f64) -> Self {
        Self {
            a: 1.0,
            b: 1.0,
            log_beta: 0.0,
            below: threshold,
        }
    }

    /// `threshold^a (1 - threshold)^b / B(a, b)`
    fn density_term(&self, threshold: f64) -> f64 {
        (self.a * threshold.ln() + self.b * (1.0 - threshold).ln() - self.log_beta).exp()
    }

    fn below_after_success(&self, threshold: f64) -> f64 {
        (self.below - self.density_term(threshold) / self.a).clamp(0.0, 1.0)
    }

    fn below_after_failure(&self, threshold: f64) -> f64 {
        (self.below + self.density_term(threshold) / self.b).clamp(0.0, 1.0)
    }

    fn observe(&mut self, success: bool, threshold: f64) {
        let sum = self.a + self.b;
        if success {
            self.below = self.below_after_success(threshold);
            self.log_beta += self.a.ln() - sum.ln();
            self.a += 1.0;
        } else {
            self.below = self.below_after_failure(threshold);
            self.log_beta += self.b.ln() - sum.ln();
            self.b += 1.0;
        }
    }

    /// Negated optimistic knowledge gradient.
    fn metric(&self, threshold: f64) -> f64 {
        let current = h(self.below);
        let success_gain = h(self.below_after_success(threshold)) - current;
        let failure_gain = h(self.below_after_failure(threshold)) - current;
        -success_gain.max(failure_gain)
    }
}

/// Optimistic knowledge gradient for thresholding with Bernoulli arms.
#[derive(Clone, Debug)]
pub struct OptKg {
    name: String,
    arm_num: usize,
    threshold: f64,
    budget: u64,
    posteriors: Vec<BetaPosterior>,
    pulls: u64,
}

impl OptKg {
    pub fn new(
        arm_num: usize,
        threshold: f64,
        budget: u64,
        name: Option<String>,
    ) -> Result<Self, LearnerError> {
        check_arm_count(arm_num)?;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(LearnerError::InvalidParameter(format!(
                "threshold {threshold} must lie in (0, 1)"
            )));
        }
        if budget == 0 {
            return Err(LearnerError::BudgetTooSmall {
                budget,
                required: 1,
            });
        }

        Ok(Self {
            name: name.unwrap_or_else(|| "opt_kg".to_string()),
            arm_num,
            threshold,
            budget,
            posteriors: vec![BetaPosterior::new(threshold); arm_num],
            pulls: 0,
        })
    }

    /// `P(mu_i <= threshold)` under the current posterior of every arm.
    pub fn below_probabilities(&self) -> Vec<f64> {
        self.posteriors.iter().map(|p| p.below).collect()
    }
}

impl Learner for OptKg {
    fn name(&self) -> &str {
        &self.name
    }

    fn running_environment(&self) -> &'static [BanditKind] {
        &[BanditKind::Thresholding]
    }

    fn reset(&mut self) {
        self.posteriors = vec![BetaPosterior::new(self.threshold); self.arm_num];
        self.pulls = 0;
    }

    fn actions(&mut self, context: &Context, _: &mut dyn RngCore) -> Result<Actions, LearnerError> {
        check_arm_num(context, self.arm_num)?;

        if self.pulls >= self.budget {
            return Ok(Actions::empty());
        }
        let metrics = self
            .posteriors
            .iter()
            .map(|p| p.metric(self.threshold))
            .collect::<Vec<_>>();
        let arm_id = argmin(&metrics).ok_or(LearnerError::TooFewArms(0))?;
        Ok(Actions::pull(arm_id, 1))
    }

    fn update(&mut self, feedback: &Feedback) -> Result<(), LearnerError> {
        for arm_feedback in &feedback.arm_feedbacks {
            let arm_id = feedback_arm(arm_feedback, self.arm_num)?;
            for &reward in &arm_feedback.rewards {
                let success = bernoulli_outcome(reward)?;
                self.posteriors[arm_id].observe(success, self.threshold);
                self.pulls += 1;
            }
        }
        Ok(())
    }

    fn goal(&self) -> Result<Goal, LearnerError> {
        let answers = self
            .posteriors
            .iter()
            .map(|p| u8::from(p.below < 0.5))
            .collect();
        Ok(Goal::MaximizeCorrectAnswers { answers })
    }

    fn budget(&self) -> Option<u64> {
        Some(self.budget)
    }
}
