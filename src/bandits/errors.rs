use crate::arms::ArmError;
use crate::assortment::AssortmentError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BanditError {
    #[error("At least 2 arms are required, got {0}")]
    TooFewArms(usize),
    #[error("Arm {0} not found")]
    ArmNotFound(usize),
    #[error("Product {0} not found")]
    ProductNotFound(usize),
    #[error("Bandit {bandit} expects {expected} actions")]
    UnexpectedArmKey {
        bandit: &'static str,
        expected: &'static str,
    },
    #[error("Empty assortment fed to the bandit")]
    EmptyAssortment,
    #[error("Assortment of size {size} exceeds cardinality limit {limit}")]
    AssortmentTooLarge { size: usize, limit: usize },
    #[error("Goal {goal} is not supported by bandit {bandit}")]
    UnsupportedGoal {
        goal: &'static str,
        bandit: &'static str,
    },
    #[error("Expected {expected} answers, got {got}")]
    AnswerLengthMismatch { expected: usize, got: usize },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Arm(#[from] ArmError),
    #[error(transparent)]
    Assortment(#[from] AssortmentError),
}
