use super::errors::LearnerError;
use super::utils::{argmax, feedback_arm};
use super::Learner;

use crate::arms::linear::dot;
use crate::bandits::{Actions, BanditKind, Context, Feedback, Goal};

use rand::RngCore;

/// Ridge-regression UCB over the arm features exposed by a linear bandit.
/// `a_inv` is kept up to date with Sherman-Morrison rank-one updates.
#[derive(Clone, Debug)]
pub struct LinUcb {
    name: String,
    dimension: usize,
    alpha: f64,
    lambda: f64,
    a_inv: Vec<Vec<f64>>,
    b: Vec<f64>,
    features: Vec<Vec<f64>>,
}

impl LinUcb {
    pub fn new(
        dimension: usize,
        alpha: f64,
        lambda: f64,
        name: Option<String>,
    ) -> Result<Self, LearnerError> {
        if dimension == 0 {
            return Err(LearnerError::InvalidParameter(
                "dimension must be positive".to_string(),
            ));
        }
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(LearnerError::InvalidParameter(format!(
                "alpha {alpha} must be non-negative"
            )));
        }
        if !lambda.is_finite() || lambda <= 0.0 {
            return Err(LearnerError::InvalidParameter(format!(
                "lambda {lambda} must be positive"
            )));
        }

        Ok(Self {
            name: name.unwrap_or_else(|| "lin_ucb".to_string()),
            dimension,
            alpha,
            lambda,
            a_inv: scaled_identity(dimension, 1.0 / lambda),
            b: vec![0.0; dimension],
            features: Vec::new(),
        })
    }

    pub fn theta_hat(&self) -> Vec<f64> {
        mat_vec(&self.a_inv, &self.b)
    }

    fn observe(&mut self, x: &[f64], reward: f64) {
        let a_inv_x = mat_vec(&self.a_inv, x);
        let denominator = 1.0 + dot(x, &a_inv_x);
        for (i, row) in self.a_inv.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value -= a_inv_x[i] * a_inv_x[j] / denominator;
            }
        }
        self.b
            .iter_mut()
            .zip(x)
            .for_each(|(b, x)| *b += reward * x);
    }
}

fn scaled_identity(dimension: usize, scale: f64) -> Vec<Vec<f64>> {
    (0..dimension)
        .map(|i| {
            (0..dimension)
                .map(|j| if i == j { scale } else { 0.0 })
                .collect()
        })
        .collect()
}

fn mat_vec(matrix: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
    matrix.iter().map(|row| dot(row, x)).collect()
}

impl Learner for LinUcb {
    fn name(&self) -> &str {
        &self.name
    }

    fn running_environment(&self) -> &'static [BanditKind] {
        &[BanditKind::Linear]
    }

    fn reset(&mut self) {
        self.a_inv = scaled_identity(self.dimension, 1.0 / self.lambda);
        self.b = vec![0.0; self.dimension];
        self.features.clear();
    }

    fn actions(&mut self, context: &Context, _: &mut dyn RngCore) -> Result<Actions, LearnerError> {
        let Context::Linear { features } = context else {
            return Err(LearnerError::UnexpectedContext { expected: "linear" });
        };
        if features.is_empty() {
            return Err(LearnerError::TooFewArms(0));
        }
        if let Some(x) = features.iter().find(|x| x.len() != self.dimension) {
            return Err(LearnerError::InvalidParameter(format!(
                "feature of dimension {} for a learner of dimension {}",
                x.len(),
                self.dimension
            )));
        }

        let theta = self.theta_hat();
        let scores = features
            .iter()
            .map(|x| {
                let width = dot(x, &mat_vec(&self.a_inv, x)).max(0.0).sqrt();
                dot(x, &theta) + self.alpha * width
            })
            .collect::<Vec<_>>();
        self.features = features.clone();

        let arm_id = argmax(&scores).ok_or(LearnerError::TooFewArms(0))?;
        Ok(Actions::pull(arm_id, 1))
    }

    fn update(&mut self, feedback: &Feedback) -> Result<(), LearnerError> {
        for arm_feedback in &feedback.arm_feedbacks {
            let arm_id = feedback_arm(arm_feedback, self.features.len())?;
            let x = self.features[arm_id].clone();
            for &reward in &arm_feedback.rewards {
                self.observe(&x, reward);
            }
        }
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

    fn feedback(arm_id: usize, reward: f64) -> Feedback {
        Feedback {
            arm_feedbacks: vec![ArmFeedback {
                arm: ArmKey::Single(arm_id),
                rewards: vec![reward],
                customer_feedbacks: Vec::new(),
            }],
        }
    }

    #[test]
    fn sherman_morrison_matches_ridge_solution() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut policy = LinUcb::new(2, 0.0, 1.0, None).unwrap();
        let context = Context::Linear {
            features: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        };

        policy.actions(&context, &mut rng).unwrap();
        policy.update(&feedback(0, 2.0)).unwrap();
        policy.update(&feedback(1, 4.0)).unwrap();

        // (I + e_i e_i')^-1 b = b / 2 on each axis
        let theta = policy.theta_hat();
        assert!((theta[0] - 1.0).abs() < 1e-12);
        assert!((theta[1] - 2.0).abs() < 1e-12);
        assert_eq!(policy.actions(&context, &mut rng).unwrap(), Actions::pull(1, 1));
    }

    #[test]
    fn explores_unseen_direction() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut policy = LinUcb::new(2, 10.0, 1.0, None).unwrap();
        let context = Context::Linear {
            features: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        };

        policy.actions(&context, &mut rng).unwrap();
        for _ in 0..50 {
            policy.update(&feedback(0, 0.5)).unwrap();
        }
        assert_eq!(policy.actions(&context, &mut rng).unwrap(), Actions::pull(1, 1));
    }

    #[test]
    fn rejects_other_contexts() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut policy = LinUcb::new(2, 1.0, 1.0, None).unwrap();
        assert!(policy
            .actions(&Context::Ordinary { arm_num: 2 }, &mut rng)
            .is_err());
        assert!(policy
            .actions(
                &Context::Linear {
                    features: vec![vec![1.0, 0.0, 0.0]]
                },
                &mut rng
            )
            .is_err());
    }
}
