use super::agent::{Broadcast, TERMINATION_ARM};

use crate::learners::utils::argmax;
use crate::learners::LearnerError;

use std::collections::BTreeMap;

/// Assigns arms to agents and eliminates arms from their broadcasts.
#[derive(Clone, Debug)]
pub struct Master {
    arm_num: usize,
    agent_num: usize,
    rounds: u32,
    horizon: u64,
    active: Vec<usize>,
    best: Option<usize>,
}

impl Master {
    pub fn new(
        arm_num: usize,
        agent_num: usize,
        rounds: u32,
        horizon: u64,
    ) -> Result<Self, LearnerError> {
        if agent_num == 0 {
            return Err(LearnerError::InvalidParameter(
                "at least one agent is required".to_string(),
            ));
        }
        if arm_num < 2 {
            return Err(LearnerError::TooFewArms(arm_num));
        }

        Ok(Self {
            arm_num,
            agent_num,
            rounds,
            horizon,
            active: (0..arm_num).collect(),
            best: None,
        })
    }

    pub fn reset(&mut self) {
        self.active = (0..self.arm_num).collect();
        self.best = None;
    }

    pub fn active_arms(&self) -> &[usize] {
        &self.active
    }

    /// Arms per agent: round-robin over the active arms, one arm each when
    /// agents outnumber arms, the sentinel once a single arm survives.
    pub fn assign(&self) -> Vec<Vec<usize>> {
        if self.active.len() <= 1 {
            return vec![vec![TERMINATION_ARM]; self.agent_num];
        }
        if self.active.len() < self.agent_num {
            return (0..self.agent_num)
                .map(|agent| vec![self.active[agent % self.active.len()]])
                .collect();
        }

        let mut assignments = vec![Vec::new(); self.agent_num];
        for (i, &arm_id) in self.active.iter().enumerate() {
            assignments[i % self.agent_num].push(arm_id);
        }
        assignments
    }

    /// `sqrt(R ln(200 M R) / (T max(1, M / active)))`
    pub fn confidence_radius(&self) -> f64 {
        let rounds = self.rounds as f64;
        let agents = self.agent_num as f64;
        let share = (agents / self.active.len().max(1) as f64).max(1.0);
        (rounds * (200.0 * agents * rounds).ln() / (self.horizon as f64 * share)).sqrt()
    }

    /// Keeps the broadcast arms whose pull-weighted mean is within twice the
    /// confidence radius of the best one.
    pub fn eliminate(&mut self, broadcasts: &[Broadcast]) -> Result<(), LearnerError> {
        if broadcasts.is_empty() {
            return Ok(());
        }

        let mut aggregated = BTreeMap::<usize, (f64, u64)>::new();
        for broadcast in broadcasts {
            if broadcast.arm >= self.arm_num {
                return Err(LearnerError::UnexpectedFeedback(format!(
                    "broadcast for unknown arm {}",
                    broadcast.arm
                )));
            }
            let entry = aggregated.entry(broadcast.arm).or_insert((0.0, 0));
            entry.0 += broadcast.em_mean * broadcast.pulls as f64;
            entry.1 += broadcast.pulls;
        }

        let (arms, means): (Vec<usize>, Vec<f64>) = aggregated
            .into_iter()
            .map(|(arm_id, (weighted, pulls))| (arm_id, weighted / pulls.max(1) as f64))
            .unzip();
        let best = argmax(&means).ok_or(LearnerError::AgentUnassigned)?;
        let cutoff = means[best] - 2.0 * self.confidence_radius();

        self.best = Some(arms[best]);
        self.active = arms
            .into_iter()
            .zip(means)
            .filter(|&(_, mean)| mean >= cutoff)
            .map(|(arm_id, _)| arm_id)
            .collect();
        Ok(())
    }

    /// The single surviving arm, else the best aggregated arm so far.
    pub fn best_arm(&self) -> usize {
        match self.active.as_slice() {
            &[arm_id] => arm_id,
            active => self.best.or(active.first().copied()).unwrap_or(0),
        }
    }
}
