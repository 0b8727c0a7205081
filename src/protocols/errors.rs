use crate::bandits::{BanditError, BanditKind};
use crate::learners::LearnerError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("No learner to play")]
    NoLearners,
    #[error("Learner {learner} cannot run on a {bandit} bandit")]
    IncompatibleLearner { learner: String, bandit: BanditKind },
    #[error("Job {0} not found")]
    JobNotFound(usize),
    #[error("Learner {learner} asked for {requested} pulls with {remaining} left in its budget")]
    BudgetExceeded {
        learner: String,
        requested: u64,
        remaining: u64,
    },
    #[error("Agent {0} proposed no pulls without waiting or stopping")]
    IdleAgent(usize),
    #[error("Trial cancelled")]
    Cancelled,
    #[error("Result sink closed")]
    SinkClosed,
    #[error("Corrupted record: {0}")]
    CorruptedRecord(String),
    #[error("Worker not available: {0}")]
    Mailbox(#[from] actix::MailboxError),
    #[error("I/O error on result file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize record to JSON: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Bandit(#[from] BanditError),
    #[error(transparent)]
    Learner(#[from] LearnerError),
}
