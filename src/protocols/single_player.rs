use super::errors::ProtocolError;
use super::record::{Snapshot, TrialRecord};
use super::{Checkpoints, Protocol, TrialControl};

use crate::bandits::Bandit;
use crate::learners::Learner;

use rand::{rngs::SmallRng, SeedableRng};
use tracing::debug;

/// One learner against one bandit, each trial on fresh clones of both.
pub struct SinglePlayerProtocol {
    bandit: Box<dyn Bandit>,
    learners: Vec<Box<dyn Learner>>,
    horizon: u64,
    checkpoints: Checkpoints,
}

impl SinglePlayerProtocol {
    pub fn new(
        bandit: Box<dyn Bandit>,
        learners: Vec<Box<dyn Learner>>,
        horizon: u64,
        checkpoints: Checkpoints,
    ) -> Result<Self, ProtocolError> {
        if learners.is_empty() {
            return Err(ProtocolError::NoLearners);
        }
        if let Some(learner) = learners
            .iter()
            .find(|learner| !learner.running_environment().contains(&bandit.kind()))
        {
            return Err(ProtocolError::IncompatibleLearner {
                learner: learner.name().to_string(),
                bandit: bandit.kind(),
            });
        }

        Ok(Self {
            bandit,
            learners,
            horizon,
            checkpoints,
        })
    }

    fn snapshot(
        bandit: &dyn Bandit,
        learner: &dyn Learner,
        rounds: u64,
        total_actions: u64,
    ) -> Result<Snapshot, ProtocolError> {
        Ok(Snapshot {
            rounds,
            total_actions,
            regret: bandit.regret(&learner.goal()?)?,
        })
    }
}

impl Protocol for SinglePlayerProtocol {
    fn name(&self) -> &'static str {
        "SinglePlayerProtocol"
    }

    fn jobs(&self) -> usize {
        self.learners.len()
    }

    fn one_trial(
        &self,
        job: usize,
        seed: u64,
        control: &TrialControl,
    ) -> Result<TrialRecord, ProtocolError> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut bandit = self.bandit.clone();
        let mut learner = self
            .learners
            .get(job)
            .ok_or(ProtocolError::JobNotFound(job))?
            .clone();
        bandit.reset();
        learner.reset();

        let mut rounds = 0;
        let mut total_actions = 0;
        let mut results = Vec::new();

        while total_actions < self.horizon {
            if control.cancel.is_cancelled() {
                return Err(ProtocolError::Cancelled);
            }

            let context = bandit.context();
            let actions = learner.actions(&context, &mut rng)?;
            if actions.is_empty() {
                break;
            }

            let requested = actions.total_pulls();
            if let Some(budget) = learner.budget() {
                let remaining = budget.saturating_sub(total_actions);
                if requested > remaining {
                    return Err(ProtocolError::BudgetExceeded {
                        learner: learner.name().to_string(),
                        requested,
                        remaining,
                    });
                }
            }

            let feedback = bandit.feed(&actions, &mut rng)?;
            learner.update(&feedback)?;

            let previous_actions = total_actions;
            rounds += 1;
            total_actions += requested;
            if control.debug {
                debug!(
                    learner = %learner.name(),
                    rounds,
                    total_actions,
                    "Round played"
                );
            }
            if self.checkpoints.reached(rounds, previous_actions, total_actions) {
                results.push(Self::snapshot(
                    bandit.as_ref(),
                    learner.as_ref(),
                    rounds,
                    total_actions,
                )?);
            }
        }

        if results.last().map_or(true, |last| last.rounds != rounds) {
            results.push(Self::snapshot(
                bandit.as_ref(),
                learner.as_ref(),
                rounds,
                total_actions,
            )?);
        }

        Ok(TrialRecord {
            bandit_name: bandit.name().to_string(),
            learner_name: learner.name().to_string(),
            results,
        })
    }
}
