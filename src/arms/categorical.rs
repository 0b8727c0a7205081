use super::errors::ArmError;
use super::Arm;

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::RngCore;

const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Arm drawing one of several categories, each mapped to a reward value.
/// Without explicit values the reward of a category is its index.
#[derive(Clone, Debug)]
pub struct CategoricalArm {
    probabilities: Vec<f64>,
    values: Vec<f64>,
    distribution: WeightedIndex<f64>,
}

impl CategoricalArm {
    pub fn new(probabilities: Vec<f64>, values: Option<Vec<f64>>) -> Result<Self, ArmError> {
        if probabilities.is_empty() {
            return Err(ArmError::InvalidDistribution(
                "at least one category is required".to_string(),
            ));
        }
        if let Some(&p) = probabilities
            .iter()
            .find(|&&p| !p.is_finite() || p < 0.0 || p > 1.0)
        {
            return Err(ArmError::InvalidProbability(p));
        }
        let total = probabilities.iter().sum::<f64>();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(ArmError::InvalidDistribution(format!(
                "probabilities sum to {total}"
            )));
        }

        let values =
            values.unwrap_or_else(|| (0..probabilities.len()).map(|i| i as f64).collect());
        if values.len() != probabilities.len() {
            return Err(ArmError::InvalidDistribution(format!(
                "{} values for {} categories",
                values.len(),
                probabilities.len()
            )));
        }

        let distribution = WeightedIndex::new(&probabilities)
            .map_err(|err| ArmError::InvalidDistribution(err.to_string()))?;

        Ok(Self {
            probabilities,
            values,
            distribution,
        })
    }

    pub fn categories(&self) -> usize {
        self.probabilities.len()
    }

    pub fn sample_categories(&self, pulls: u64, rng: &mut dyn RngCore) -> Vec<usize> {
        (0..pulls).map(|_| self.distribution.sample(rng)).collect()
    }
}

impl Arm for CategoricalArm {
    fn mean(&self) -> f64 {
        self.probabilities
            .iter()
            .zip(&self.values)
            .map(|(p, v)| p * v)
            .sum()
    }

    fn pull(&self, pulls: u64, rng: &mut dyn RngCore) -> Vec<f64> {
        self.sample_categories(pulls, rng)
            .into_iter()
            .map(|category| self.values[category])
            .collect()
    }
}
