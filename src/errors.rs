use crate::bandits::BanditError;
use crate::learners::LearnerError;
use crate::protocols::ProtocolError;

use config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Cannot read config: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid experiment: {0}")]
    InvalidExperiment(String),
    #[error(transparent)]
    Bandit(#[from] BanditError),
    #[error(transparent)]
    Learner(#[from] LearnerError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("I/O error on results file: {0}")]
    Io(#[from] std::io::Error),
}
