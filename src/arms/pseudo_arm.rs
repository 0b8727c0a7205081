use super::errors::ArmError;

use serde::{Deserialize, Serialize};

/// Running empirical statistics of the rewards observed on one arm.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PseudoArm {
    total_pulls: u64,
    total_rewards: f64,
    sum_of_squares: f64,
}

impl PseudoArm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.total_pulls = 0;
        self.total_rewards = 0.0;
        self.sum_of_squares = 0.0;
    }

    pub fn update(&mut self, rewards: &[f64]) {
        self.total_pulls += rewards.len() as u64;
        self.total_rewards += rewards.iter().sum::<f64>();
        self.sum_of_squares += rewards.iter().map(|r| r * r).sum::<f64>();
    }

    pub fn total_pulls(&self) -> u64 {
        self.total_pulls
    }

    pub fn total_rewards(&self) -> f64 {
        self.total_rewards
    }

    pub fn em_mean(&self) -> Result<f64, ArmError> {
        if self.total_pulls == 0 {
            return Err(ArmError::NoData);
        }
        Ok(self.total_rewards / self.total_pulls as f64)
    }

    pub fn em_var(&self) -> Result<f64, ArmError> {
        if self.total_pulls == 0 {
            return Err(ArmError::NoData);
        }
        let pulls = self.total_pulls as f64;
        Ok((self.sum_of_squares - self.total_rewards * self.total_rewards / pulls) / pulls)
    }
}

/// Frequency counts over categories, seeded from a prior.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CategoricalPseudoArm {
    prior: Vec<u64>,
    frequency: Vec<u64>,
    total_pulls: u64,
}

impl CategoricalPseudoArm {
    /// Uniform prior of one observation per category.
    pub fn new(categories: usize) -> Self {
        Self::with_prior(vec![1; categories])
    }

    pub fn with_prior(prior: Vec<u64>) -> Self {
        Self {
            frequency: prior.clone(),
            prior,
            total_pulls: 0,
        }
    }

    pub fn reset(&mut self) {
        self.frequency.clone_from(&self.prior);
        self.total_pulls = 0;
    }

    pub fn update(&mut self, categories: &[usize]) -> Result<(), ArmError> {
        let num = self.frequency.len();
        if let Some(&category) = categories.iter().find(|&&c| c >= num) {
            return Err(ArmError::CategoryOutOfRange {
                category,
                categories: num,
            });
        }
        categories.iter().for_each(|&c| self.frequency[c] += 1);
        self.total_pulls += categories.len() as u64;
        Ok(())
    }

    pub fn total_pulls(&self) -> u64 {
        self.total_pulls
    }

    pub fn frequency(&self) -> &[u64] {
        &self.frequency
    }

    /// Index of the most frequent category, smallest index on ties.
    pub fn top_category(&self) -> usize {
        self.frequency
            .iter()
            .enumerate()
            .fold((0, 0), |(best, best_count), (i, &count)| {
                if count > best_count || i == 0 {
                    (i, count)
                } else {
                    (best, best_count)
                }
            })
            .0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn empty_arm_has_no_statistics() {
        let arm = PseudoArm::new();
        assert!(matches!(arm.em_mean(), Err(ArmError::NoData)));
        assert!(matches!(arm.em_var(), Err(ArmError::NoData)));
    }

    #[test]
    fn mean_and_variance_over_updates() {
        let mut arm = PseudoArm::new();
        let batches: [&[f64]; 3] = [&[1.0, 2.0], &[], &[3.0, 4.0, 10.0]];
        batches.iter().for_each(|rewards| arm.update(rewards));

        let all = [1.0, 2.0, 3.0, 4.0, 10.0];
        let mean = all.iter().sum::<f64>() / all.len() as f64;
        let var = all.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / all.len() as f64;

        assert_eq!(arm.total_pulls(), 5);
        assert!((arm.em_mean().unwrap() - mean).abs() < EPS);
        assert!((arm.em_var().unwrap() - var).abs() < EPS);
    }

    #[test]
    fn reset_clears_counters() {
        let mut arm = PseudoArm::new();
        arm.update(&[1.0, 0.0]);
        arm.reset();
        assert_eq!(arm.total_pulls(), 0);
        assert_eq!(arm.total_rewards(), 0.0);
        assert!(arm.em_mean().is_err());
    }

    #[test]
    fn top_category_prefers_smallest_index_on_ties() {
        let mut arm = CategoricalPseudoArm::new(3);
        assert_eq!(arm.top_category(), 0);

        arm.update(&[2, 1]).unwrap();
        assert_eq!(arm.top_category(), 1);

        arm.update(&[2]).unwrap();
        assert_eq!(arm.top_category(), 2);
    }

    #[test]
    fn categorical_reset_restores_prior() {
        let mut arm = CategoricalPseudoArm::with_prior(vec![0, 3]);
        arm.update(&[0, 0, 0, 0]).unwrap();
        assert_eq!(arm.top_category(), 0);

        arm.reset();
        assert_eq!(arm.frequency(), &[0, 3]);
        assert_eq!(arm.top_category(), 1);
    }

    #[test]
    fn categorical_rejects_unknown_category() {
        let mut arm = CategoricalPseudoArm::new(2);
        assert!(arm.update(&[0, 2]).is_err());
        assert_eq!(arm.frequency(), &[1, 1]);
    }
}
