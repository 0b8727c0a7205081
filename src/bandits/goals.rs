use super::messages::ArmKey;

use serde::{Deserialize, Serialize};

/// What a learner claims at the end of (or during) a trial.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum Goal {
    IdentifyBestArm { best_arm: ArmKey },
    MaximizeTotalRewards,
    MakeAllAnswersCorrect { answers: Vec<u8> },
    MaximizeCorrectAnswers { answers: Vec<u8> },
}

impl Goal {
    pub fn name(&self) -> &'static str {
        match self {
            Goal::IdentifyBestArm { .. } => "IdentifyBestArm",
            Goal::MaximizeTotalRewards => "MaximizeTotalRewards",
            Goal::MakeAllAnswersCorrect { .. } => "MakeAllAnswersCorrect",
            Goal::MaximizeCorrectAnswers { .. } => "MaximizeCorrectAnswers",
        }
    }

    pub fn best_arm(arm_id: usize) -> Self {
        Goal::IdentifyBestArm {
            best_arm: ArmKey::Single(arm_id),
        }
    }
}
