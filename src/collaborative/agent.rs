use crate::arms::PseudoArm;
use crate::bandits::{ActionState, Actions, ArmPull, Context, Feedback};
use crate::learners::lil_ucb::{confidence_radius, should_stop};
use crate::learners::utils::{argmax, check_arm_num, feedback_arm};
use crate::learners::LearnerError;

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Assigned instead of real arms once a single arm survives.
pub const TERMINATION_ARM: usize = usize::MAX;

const EPS: f64 = 0.0;
const BETA: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentStage {
    Unassigned,
    Preparation,
    Learning,
    Communication,
    Termination,
}

/// What an agent tells the master at the end of a round.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Broadcast {
    pub arm: usize,
    pub em_mean: f64,
    pub pulls: u64,
}

/// One agent of the collaborative lil' UCB heuristic. Each round it runs
/// lil' UCB over the arms it was assigned, within a per-round budget.
#[derive(Clone, Debug)]
pub struct CollaborativeAgent {
    arm_num: usize,
    rounds: u32,
    round_budget: u64,
    delta: f64,
    arms: Vec<PseudoArm>,
    assigned: Vec<usize>,
    stage: AgentStage,
    completed_rounds: u32,
    spent: u64,
}

impl CollaborativeAgent {
    pub fn new(
        arm_num: usize,
        rounds: u32,
        horizon: u64,
        confidence: f64,
    ) -> Result<Self, LearnerError> {
        if rounds == 0 {
            return Err(LearnerError::InvalidParameter(
                "at least one communication round is required".to_string(),
            ));
        }
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(LearnerError::InvalidParameter(format!(
                "confidence {confidence} must lie in (0, 1)"
            )));
        }
        let round_budget = horizon / rounds as u64;
        if round_budget < arm_num as u64 {
            return Err(LearnerError::BudgetTooSmall {
                budget: horizon,
                required: arm_num as u64 * rounds as u64,
            });
        }

        Ok(Self {
            arm_num,
            rounds,
            round_budget,
            delta: (1.0 - confidence) / 5.0,
            arms: vec![PseudoArm::new(); arm_num],
            assigned: Vec::new(),
            stage: AgentStage::Unassigned,
            completed_rounds: 0,
            spent: 0,
        })
    }

    pub fn stage(&self) -> AgentStage {
        self.stage
    }

    pub fn round_budget(&self) -> u64 {
        self.round_budget
    }

    pub fn assigned_arms(&self) -> &[usize] {
        &self.assigned
    }

    pub fn reset(&mut self) {
        self.arms.iter_mut().for_each(PseudoArm::reset);
        self.assigned.clear();
        self.stage = AgentStage::Unassigned;
        self.completed_rounds = 0;
        self.spent = 0;
    }

    /// Starts a round over `arms`; the termination sentinel ends the agent.
    pub fn assign_arms(&mut self, arms: &[usize]) -> Result<(), LearnerError> {
        match self.stage {
            AgentStage::Termination => return Ok(()),
            AgentStage::Unassigned => {}
            stage => {
                return Err(LearnerError::InvalidParameter(format!(
                    "cannot assign arms in stage {stage:?}"
                )))
            }
        }
        if arms.contains(&TERMINATION_ARM) {
            self.stage = AgentStage::Termination;
            return Ok(());
        }
        if arms.is_empty() {
            return Err(LearnerError::AgentUnassigned);
        }
        if let Some(&arm_id) = arms.iter().find(|&&arm_id| arm_id >= self.arm_num) {
            return Err(LearnerError::InvalidParameter(format!(
                "assigned arm {arm_id} out of range"
            )));
        }

        self.arms.iter_mut().for_each(PseudoArm::reset);
        self.assigned = arms.to_vec();
        self.spent = 0;
        self.stage = AgentStage::Preparation;
        Ok(())
    }

    pub fn actions(&mut self, context: &Context, _: &mut dyn RngCore) -> Result<Actions, LearnerError> {
        check_arm_num(context, self.arm_num)?;

        match self.stage {
            AgentStage::Unassigned => Err(LearnerError::AgentUnassigned),
            AgentStage::Communication => Ok(Actions::with_state(ActionState::Wait)),
            AgentStage::Termination => Ok(Actions::with_state(ActionState::Stop)),
            AgentStage::Preparation => match self.assigned.as_slice() {
                &[arm_id] => Ok(Actions::pull(arm_id, self.round_budget)),
                assigned => Ok(Actions::new(
                    assigned
                        .iter()
                        .map(|&arm_id| ArmPull::single(arm_id, 1))
                        .collect(),
                )),
            },
            AgentStage::Learning => {
                let a = 1.0 + 10.0 / self.assigned.len() as f64;
                let assigned_arms = self
                    .assigned
                    .iter()
                    .map(|&arm_id| self.arms[arm_id].clone())
                    .collect::<Vec<_>>();
                if self.spent >= self.round_budget || should_stop(&assigned_arms, a) {
                    self.stage = AgentStage::Communication;
                    return Ok(Actions::with_state(ActionState::Wait));
                }

                let bounds = assigned_arms
                    .iter()
                    .map(|arm| {
                        Ok(arm.em_mean()?
                            + confidence_radius(arm.total_pulls(), EPS, BETA, self.delta))
                    })
                    .collect::<Result<Vec<_>, LearnerError>>()?;
                let best = argmax(&bounds).ok_or(LearnerError::AgentUnassigned)?;
                Ok(Actions::pull(self.assigned[best], 1))
            }
        }
    }

    pub fn update(&mut self, feedback: &Feedback) -> Result<(), LearnerError> {
        for arm_feedback in &feedback.arm_feedbacks {
            let arm_id = feedback_arm(arm_feedback, self.arm_num)?;
            self.arms[arm_id].update(&arm_feedback.rewards);
            self.spent += arm_feedback.rewards.len() as u64;
        }
        if self.stage == AgentStage::Preparation {
            self.stage = if self.assigned.len() == 1 {
                AgentStage::Communication
            } else {
                AgentStage::Learning
            };
        }
        Ok(())
    }

    /// The most pulled assigned arm of the current round.
    pub fn broadcast(&self) -> Result<Broadcast, LearnerError> {
        if self.stage != AgentStage::Communication {
            return Err(LearnerError::NotCommunicating);
        }
        let pulls = self
            .assigned
            .iter()
            .map(|&arm_id| self.arms[arm_id].total_pulls() as f64)
            .collect::<Vec<_>>();
        let best = argmax(&pulls).ok_or(LearnerError::AgentUnassigned)?;
        let arm = &self.arms[self.assigned[best]];

        Ok(Broadcast {
            arm: self.assigned[best],
            em_mean: arm.em_mean()?,
            pulls: arm.total_pulls(),
        })
    }

    pub fn complete_round(&mut self) -> Result<(), LearnerError> {
        match self.stage {
            AgentStage::Termination => Ok(()),
            AgentStage::Communication => {
                self.completed_rounds += 1;
                self.stage = if self.completed_rounds >= self.rounds {
                    AgentStage::Termination
                } else {
                    AgentStage::Unassigned
                };
                Ok(())
            }
            _ => Err(LearnerError::NotCommunicating),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learners::utils::constant_feedback;
    use rand::{rngs::SmallRng, SeedableRng};

    const SEED: u64 = 1234;

    fn run_round(agent: &mut CollaborativeAgent, means: &[f64], rng: &mut SmallRng) -> u64 {
        let context = Context::Ordinary {
            arm_num: means.len(),
        };
        let mut pulls = 0;
        loop {
            let actions = agent.actions(&context, rng).unwrap();
            if actions.state != ActionState::Unspecified {
                return pulls;
            }
            pulls += actions.total_pulls();
            agent.update(&constant_feedback(&actions, means)).unwrap();
        }
    }

    #[test]
    fn rejects_small_horizon() {
        assert!(matches!(
            CollaborativeAgent::new(4, 2, 7, 0.99),
            Err(LearnerError::BudgetTooSmall { .. })
        ));
        assert!(CollaborativeAgent::new(4, 0, 100, 0.99).is_err());
    }

    #[test]
    fn unassigned_agents_cannot_act() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut agent = CollaborativeAgent::new(3, 2, 100, 0.99).unwrap();
        assert!(matches!(
            agent.actions(&Context::Ordinary { arm_num: 3 }, &mut rng),
            Err(LearnerError::AgentUnassigned)
        ));
        assert!(matches!(agent.broadcast(), Err(LearnerError::NotCommunicating)));
    }

    #[test]
    fn single_arm_gets_the_round_budget() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut agent = CollaborativeAgent::new(3, 2, 100, 0.99).unwrap();
        agent.assign_arms(&[2]).unwrap();

        let pulls = run_round(&mut agent, &[0.1, 0.2, 0.3], &mut rng);
        assert_eq!(pulls, 50);
        assert_eq!(agent.stage(), AgentStage::Communication);
        let broadcast = agent.broadcast().unwrap();
        assert_eq!((broadcast.arm, broadcast.pulls), (2, 50));
        assert!((broadcast.em_mean - 0.3).abs() < 1e-12);
    }

    #[test]
    fn learning_stays_within_budget_and_prefers_the_best_arm() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut agent = CollaborativeAgent::new(4, 1, 400, 0.99).unwrap();
        agent.assign_arms(&[0, 1, 3]).unwrap();

        let pulls = run_round(&mut agent, &[0.9, 0.1, 0.5, 0.2], &mut rng);
        assert!(pulls <= agent.round_budget());
        assert_eq!(agent.broadcast().unwrap().arm, 0);
    }

    #[test]
    fn terminates_after_last_round_or_on_sentinel() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let context = Context::Ordinary { arm_num: 2 };
        let mut agent = CollaborativeAgent::new(2, 2, 20, 0.99).unwrap();

        agent.assign_arms(&[0]).unwrap();
        run_round(&mut agent, &[0.5, 0.5], &mut rng);
        agent.complete_round().unwrap();
        assert_eq!(agent.stage(), AgentStage::Unassigned);

        agent.assign_arms(&[1]).unwrap();
        run_round(&mut agent, &[0.5, 0.5], &mut rng);
        agent.complete_round().unwrap();
        assert_eq!(agent.stage(), AgentStage::Termination);
        assert_eq!(
            agent.actions(&context, &mut rng).unwrap().state,
            ActionState::Stop
        );

        agent.reset();
        agent.assign_arms(&[TERMINATION_ARM]).unwrap();
        assert_eq!(agent.stage(), AgentStage::Termination);
    }
}
