//! Multi-agent best arm identification: agents explore their assigned arms in
//! parallel, a master eliminates arms between communication rounds.

pub mod agent;
pub mod master;

pub use agent::{AgentStage, Broadcast, CollaborativeAgent, TERMINATION_ARM};
pub use master::Master;

use crate::bandits::BanditKind;
use crate::learners::LearnerError;

use serde::{Deserialize, Serialize};

const DEFAULT_CONFIDENCE: f64 = 0.99;

/// A team of agents and their master, played as one learner.
#[derive(Clone, Debug)]
pub struct CollaborativeLearner {
    name: String,
    pub agents: Vec<CollaborativeAgent>,
    pub master: Master,
}

impl CollaborativeLearner {
    pub fn new(
        arm_num: usize,
        agent_num: usize,
        rounds: u32,
        horizon: u64,
        confidence: f64,
        name: Option<String>,
    ) -> Result<Self, LearnerError> {
        let master = Master::new(arm_num, agent_num, rounds, horizon)?;
        let agent = CollaborativeAgent::new(arm_num, rounds, horizon, confidence)?;

        Ok(Self {
            name: name.unwrap_or_else(|| "collaborative_lil_ucb_heuristic".to_string()),
            agents: vec![agent; agent_num],
            master,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn running_environment(&self) -> &'static [BanditKind] {
        &[BanditKind::MultiArmed]
    }

    pub fn reset(&mut self) {
        self.master.reset();
        self.agents.iter_mut().for_each(CollaborativeAgent::reset);
    }

    /// Hands the master's current assignment to every agent still running.
    pub fn assign(&mut self) -> Result<(), LearnerError> {
        let assignments = self.master.assign();
        for (agent, arms) in self.agents.iter_mut().zip(assignments) {
            agent.assign_arms(&arms)?;
        }
        Ok(())
    }

    /// Collects broadcasts, eliminates, and closes the round of every agent.
    pub fn communicate(&mut self) -> Result<(), LearnerError> {
        let broadcasts = self
            .agents
            .iter()
            .filter(|agent| agent.stage() == AgentStage::Communication)
            .map(CollaborativeAgent::broadcast)
            .collect::<Result<Vec<_>, _>>()?;
        self.master.eliminate(&broadcasts)?;
        self.agents
            .iter_mut()
            .try_for_each(CollaborativeAgent::complete_round)
    }

    pub fn best_arm(&self) -> usize {
        self.master.best_arm()
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum CollaborativeLearnerType {
    LilUcbHeuristic {
        arm_num: usize,
        agent_num: usize,
        rounds: u32,
        horizon: u64,
        confidence: Option<f64>,
        name: Option<String>,
    },
}

impl CollaborativeLearnerType {
    pub fn into_inner(self) -> Result<CollaborativeLearner, LearnerError> {
        match self {
            CollaborativeLearnerType::LilUcbHeuristic {
                arm_num,
                agent_num,
                rounds,
                horizon,
                confidence,
                name,
            } => CollaborativeLearner::new(
                arm_num,
                agent_num,
                rounds,
                horizon,
                confidence.unwrap_or(DEFAULT_CONFIDENCE),
                name,
            ),
        }
    }
}
