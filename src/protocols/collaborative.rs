use super::errors::ProtocolError;
use super::record::{Snapshot, TrialRecord};
use super::{Checkpoints, Protocol, TrialControl};

use crate::bandits::{ActionState, Bandit, Goal};
use crate::collaborative::CollaborativeLearner;

use rand::{rngs::SmallRng, RngCore, SeedableRng};
use tracing::debug;

/// Teams of agents identifying the best arm over communication rounds.
/// A round costs the pulls of its busiest agent, as agents run side by side.
pub struct CollaborativeProtocol {
    bandit: Box<dyn Bandit>,
    learners: Vec<CollaborativeLearner>,
    checkpoints: Checkpoints,
}

impl CollaborativeProtocol {
    pub fn new(
        bandit: Box<dyn Bandit>,
        learners: Vec<CollaborativeLearner>,
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
            checkpoints,
        })
    }

    /// Runs every agent until it waits or stops. Returns the pulls of the
    /// busiest agent and whether all of them stopped.
    fn play_round(
        bandit: &mut dyn Bandit,
        learner: &mut CollaborativeLearner,
        rng: &mut dyn RngCore,
    ) -> Result<(u64, bool), ProtocolError> {
        let context = bandit.context();
        let mut busiest = 0;
        let mut all_stopped = true;

        for (index, agent) in learner.agents.iter_mut().enumerate() {
            let mut pulls = 0;
            loop {
                let actions = agent.actions(&context, &mut *rng)?;
                match actions.state {
                    ActionState::Stop => break,
                    ActionState::Wait => {
                        all_stopped = false;
                        break;
                    }
                    ActionState::Unspecified if actions.is_empty() => {
                        return Err(ProtocolError::IdleAgent(index))
                    }
                    ActionState::Unspecified => {
                        let feedback = bandit.feed(&actions, &mut *rng)?;
                        agent.update(&feedback)?;
                        pulls += actions.total_pulls();
                    }
                }
            }
            busiest = busiest.max(pulls);
        }
        Ok((busiest, all_stopped))
    }

    fn snapshot(
        bandit: &dyn Bandit,
        learner: &CollaborativeLearner,
        rounds: u64,
        total_actions: u64,
    ) -> Result<Snapshot, ProtocolError> {
        Ok(Snapshot {
            rounds,
            total_actions,
            regret: bandit.regret(&Goal::best_arm(learner.best_arm()))?,
        })
    }
}

impl Protocol for CollaborativeProtocol {
    fn name(&self) -> &'static str {
        "CollaborativeProtocol"
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
        learner.assign()?;

        let mut rounds = 0;
        let mut total_actions = 0;
        let mut results = Vec::new();

        loop {
            if control.cancel.is_cancelled() {
                return Err(ProtocolError::Cancelled);
            }

            let (busiest, all_stopped) = Self::play_round(bandit.as_mut(), &mut learner, &mut rng)?;
            if all_stopped {
                break;
            }

            learner.communicate()?;
            learner.assign()?;

            let previous_actions = total_actions;
            rounds += 1;
            total_actions += busiest;
            if control.debug {
                debug!(
                    learner = %learner.name(),
                    rounds,
                    total_actions,
                    active_arms = learner.master.active_arms().len(),
                    "Communication round played"
                );
            }
            if self.checkpoints.reached(rounds, previous_actions, total_actions) {
                results.push(Self::snapshot(
                    bandit.as_ref(),
                    &learner,
                    rounds,
                    total_actions,
                )?);
            }
        }

        if results.last().map_or(true, |last| last.rounds != rounds) {
            results.push(Self::snapshot(
                bandit.as_ref(),
                &learner,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arms::{Arm, BernoulliArm};
    use crate::bandits::MultiArmedBandit;
    use crate::protocols::record::encode_record;
    use std::sync::Arc;

    fn bandit(means: &[f64]) -> Box<dyn Bandit> {
        let arms = means
            .iter()
            .map(|&mean| Arc::new(BernoulliArm::new(mean).unwrap()) as Arc<dyn Arm>)
            .collect();
        Box::new(MultiArmedBandit::new(arms).unwrap())
    }

    fn protocol(agents: usize, rounds: u32, horizon: u64) -> CollaborativeProtocol {
        let learner = CollaborativeLearner::new(4, agents, rounds, horizon, 0.99, None).unwrap();
        CollaborativeProtocol::new(
            bandit(&[0.1, 0.2, 0.3, 0.9]),
            vec![learner],
            Checkpoints::new(1..=rounds as u64, []),
        )
        .unwrap()
    }

    #[test]
    fn finds_the_best_arm_within_the_rounds() {
        let protocol = protocol(2, 3, 3_000);
        let record = protocol.one_trial(0, 1234, &TrialControl::default()).unwrap();

        let last = record.results.last().unwrap();
        assert!(last.rounds <= 3);
        assert!(last.total_actions <= 3_000);
        assert_eq!(last.regret, 0.0);
        assert_eq!(record.learner_name, "collaborative_lil_ucb_heuristic");
    }

    #[test]
    fn round_cost_is_the_busiest_agent() {
        // one round, one arm per agent: every agent spends the whole round budget
        let learner = CollaborativeLearner::new(2, 4, 1, 100, 0.99, None).unwrap();
        let protocol = CollaborativeProtocol::new(
            bandit(&[0.2, 0.8]),
            vec![learner],
            Checkpoints::default(),
        )
        .unwrap();

        let record = protocol.one_trial(0, 7, &TrialControl::default()).unwrap();
        assert_eq!(record.results.len(), 1);
        assert_eq!(record.results[0].rounds, 1);
        assert_eq!(record.results[0].total_actions, 100);
    }

    #[test]
    fn deterministic_given_a_seed() {
        let protocol = protocol(3, 2, 2_000);
        let control = TrialControl::default();
        let first = protocol.one_trial(0, 99, &control).unwrap();
        let second = protocol.one_trial(0, 99, &control).unwrap();
        assert_eq!(
            encode_record(&first).unwrap(),
            encode_record(&second).unwrap()
        );
    }

    #[test]
    fn cancelled_trials_fail() {
        let protocol = protocol(2, 2, 1_000);
        let control = TrialControl::default();
        control.cancel.cancel();
        assert!(matches!(
            protocol.one_trial(0, 1, &control),
            Err(ProtocolError::Cancelled)
        ));
    }
}
