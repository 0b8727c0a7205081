use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifies what a pull targets: one arm, or an assortment of products.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ArmKey {
    Single(usize),
    Assortment(BTreeSet<usize>),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ArmPull {
    pub arm: ArmKey,
    pub pulls: u64,
}

impl ArmPull {
    pub fn single(arm_id: usize, pulls: u64) -> Self {
        Self {
            arm: ArmKey::Single(arm_id),
            pulls,
        }
    }

    pub fn assortment(products: BTreeSet<usize>, pulls: u64) -> Self {
        Self {
            arm: ArmKey::Assortment(products),
            pulls,
        }
    }
}

/// Only collaborative agents emit `Wait` and `Stop`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum ActionState {
    #[default]
    Unspecified,
    Wait,
    Stop,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Actions {
    pub arm_pulls: Vec<ArmPull>,
    pub state: ActionState,
}

impl Actions {
    pub fn new(arm_pulls: Vec<ArmPull>) -> Self {
        Self {
            arm_pulls,
            state: ActionState::Unspecified,
        }
    }

    pub fn pull(arm_id: usize, pulls: u64) -> Self {
        Self::new(vec![ArmPull::single(arm_id, pulls)])
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_state(state: ActionState) -> Self {
        Self {
            arm_pulls: Vec::new(),
            state,
        }
    }

    pub fn total_pulls(&self) -> u64 {
        self.arm_pulls.iter().map(|pull| pull.pulls).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_pulls() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ArmFeedback {
    pub arm: ArmKey,
    pub rewards: Vec<f64>,
    /// Purchased product per pull for assortments, 0 meaning no purchase.
    pub customer_feedbacks: Vec<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Feedback {
    pub arm_feedbacks: Vec<ArmFeedback>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum Context {
    Ordinary { arm_num: usize },
    Linear { features: Vec<Vec<f64>> },
    Thresholding { arm_num: usize, threshold: f64 },
    Mnl { product_num: usize, card_limit: usize },
}

impl Context {
    /// Number of pullable arms, when the context is arm-based.
    pub fn arm_num(&self) -> Option<usize> {
        match self {
            Context::Ordinary { arm_num } | Context::Thresholding { arm_num, .. } => {
                Some(*arm_num)
            }
            Context::Linear { features } => Some(features.len()),
            Context::Mnl { .. } => None,
        }
    }
}
