use super::errors::AssortmentError;
use super::Assortment;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum RewardKind {
    Mean,
    /// Expected revenue over the worst `alpha` fraction of outcomes.
    Cvar { alpha: f64 },
}

/// Reward of an assortment under the multinomial logit choice model.
///
/// Index 0 of `preference_params` and `revenues` is the no-purchase option,
/// with a fixed preference of 1 and no revenue.
#[derive(Clone, Debug)]
pub struct RewardModel {
    preference_params: Vec<f64>,
    revenues: Vec<f64>,
    kind: RewardKind,
}

impl RewardModel {
    pub fn new(
        preference_params: Vec<f64>,
        revenues: Vec<f64>,
        kind: RewardKind,
    ) -> Result<Self, AssortmentError> {
        if preference_params.len() != revenues.len() {
            return Err(AssortmentError::InvalidModel(format!(
                "{} preference parameters for {} revenues",
                preference_params.len(),
                revenues.len()
            )));
        }
        if revenues.len() < 2 {
            return Err(AssortmentError::InvalidModel(
                "at least one product is required".to_string(),
            ));
        }
        if revenues[0] != 0.0 {
            return Err(AssortmentError::InvalidModel(
                "no-purchase revenue must be 0".to_string(),
            ));
        }
        if let Some(bad) = revenues.iter().find(|r| !r.is_finite()) {
            return Err(AssortmentError::InvalidModel(format!("revenue {bad}")));
        }
        if let RewardKind::Cvar { alpha } = kind {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(AssortmentError::InvalidPercentile(alpha));
            }
        }

        let mut model = Self {
            preference_params: Vec::new(),
            revenues,
            kind,
        };
        model.set_preference_params(preference_params)?;
        Ok(model)
    }

    pub fn set_preference_params(&mut self, params: Vec<f64>) -> Result<(), AssortmentError> {
        if params.len() != self.revenues.len() {
            return Err(AssortmentError::InvalidModel(format!(
                "{} preference parameters for {} products",
                params.len(),
                self.product_num()
            )));
        }
        if params[0] != 1.0 {
            return Err(AssortmentError::InvalidModel(
                "no-purchase preference must be 1".to_string(),
            ));
        }
        if let Some(bad) = params.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(AssortmentError::InvalidModel(format!(
                "preference parameter {bad}"
            )));
        }
        self.preference_params = params;
        Ok(())
    }

    pub fn product_num(&self) -> usize {
        self.revenues.len() - 1
    }

    pub fn kind(&self) -> RewardKind {
        self.kind
    }

    pub fn preference_params(&self) -> &[f64] {
        &self.preference_params
    }

    pub fn revenues(&self) -> &[f64] {
        &self.revenues
    }

    /// Probability of each outcome, no purchase first then products in id order.
    pub fn choice_probabilities(&self, assortment: &Assortment) -> Result<Vec<(usize, f64)>, AssortmentError> {
        self.validate(assortment)?;
        let total = self.total_weight(assortment);
        Ok(std::iter::once(0)
            .chain(assortment.iter().copied())
            .map(|product| (product, self.preference_params[product] / total))
            .collect())
    }

    pub fn calc(&self, assortment: &Assortment) -> Result<f64, AssortmentError> {
        self.validate(assortment)?;
        match self.kind {
            RewardKind::Mean => Ok(self.mean_reward(assortment)),
            RewardKind::Cvar { alpha } => self.cvar_reward(assortment, alpha),
        }
    }

    fn validate(&self, assortment: &Assortment) -> Result<(), AssortmentError> {
        if assortment.is_empty() {
            return Err(AssortmentError::EmptyAssortment);
        }
        match assortment
            .iter()
            .find(|&&product| product == 0 || product > self.product_num())
        {
            Some(&product) => Err(AssortmentError::ProductNotFound(product)),
            None => Ok(()),
        }
    }

    fn total_weight(&self, assortment: &Assortment) -> f64 {
        self.preference_params[0]
            + assortment
                .iter()
                .map(|&product| self.preference_params[product])
                .sum::<f64>()
    }

    fn mean_reward(&self, assortment: &Assortment) -> f64 {
        let weighted_revenue = assortment
            .iter()
            .map(|&product| self.revenues[product] * self.preference_params[product])
            .sum::<f64>();
        weighted_revenue / self.total_weight(assortment)
    }

    fn cvar_reward(&self, assortment: &Assortment, alpha: f64) -> Result<f64, AssortmentError> {
        let total = self.total_weight(assortment);

        // (product, revenue, probability), no purchase first so a stable sort keeps it lowest
        let mut outcomes = std::iter::once(0)
            .chain(assortment.iter().copied())
            .map(|product| {
                (
                    product,
                    self.revenues[product],
                    self.preference_params[product] / total,
                )
            })
            .collect::<Vec<_>>();
        outcomes.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        if outcomes[0].0 != 0 {
            return Err(AssortmentError::ZeroRevenueNotLowest);
        }

        let mut mass = 0.0;
        let mut reward = 0.0;
        for (_, revenue, probability) in outcomes {
            if mass + probability >= alpha {
                reward += revenue * (alpha - mass);
                break;
            }
            reward += revenue * probability;
            mass += probability;
        }

        Ok(reward / alpha)
    }
}
