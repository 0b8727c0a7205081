use crate::arms::ArmError;
use crate::assortment::AssortmentError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LearnerError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("At least 2 arms are required, got {0}")]
    TooFewArms(usize),
    #[error("Budget {budget} is below the minimum of {required}")]
    BudgetTooSmall { budget: u64, required: u64 },
    #[error("Expected {expected} context")]
    UnexpectedContext { expected: &'static str },
    #[error("Learner expects {expected} arms, the bandit has {got}")]
    ArmNumMismatch { expected: usize, got: usize },
    #[error("Unexpected feedback: {0}")]
    UnexpectedFeedback(String),
    #[error("Agent has no assigned arms")]
    AgentUnassigned,
    #[error("Agent is not in the communication stage")]
    NotCommunicating,
    #[error("Sampling error: {0}")]
    Sampling(String),
    #[error(transparent)]
    Arm(#[from] ArmError),
    #[error(transparent)]
    Assortment(#[from] AssortmentError),
}
