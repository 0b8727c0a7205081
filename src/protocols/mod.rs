pub mod collaborative;
pub mod errors;
pub mod record;
pub mod runner;
pub mod single_player;

pub use collaborative::CollaborativeProtocol;
pub use errors::ProtocolError;
pub use record::{read_records, write_record, Snapshot, TrialRecord};
pub use runner::{play, PlayOptions};
pub use single_player::SinglePlayerProtocol;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag checked between rounds; once set, running trials fail with
/// `ProtocolError::Cancelled`.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug, Default)]
pub struct TrialControl {
    pub cancel: CancellationToken,
    /// Logs every round.
    pub debug: bool,
}

/// When to snapshot the regret during a trial, on top of the final snapshot.
/// Periodic milestones are tested arithmetically, never materialised.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Checkpoints {
    rounds: BTreeSet<u64>,
    actions: BTreeSet<u64>,
    round_step: Option<u64>,
    /// Step and horizon of periodic action milestones.
    action_step: Option<(u64, u64)>,
}

impl Checkpoints {
    pub fn new(
        rounds: impl IntoIterator<Item = u64>,
        actions: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            rounds: rounds.into_iter().collect(),
            actions: actions.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Milestones at every multiple of `step` up to `horizon`.
    pub fn every_actions(step: u64, horizon: u64) -> Self {
        Self::default().with_action_step(step, horizon)
    }

    /// Every `step`-th round.
    pub fn every_rounds(step: u64) -> Self {
        Self::default().with_round_step(step)
    }

    pub fn with_action_step(mut self, step: u64, horizon: u64) -> Self {
        self.action_step = (step > 0).then_some((step, horizon));
        self
    }

    pub fn with_round_step(mut self, step: u64) -> Self {
        self.round_step = (step > 0).then_some(step);
        self
    }

    /// Whether the round that moved total actions from `previous_actions`
    /// to `total_actions` deserves a snapshot.
    pub fn reached(&self, rounds: u64, previous_actions: u64, total_actions: u64) -> bool {
        if self.rounds.contains(&rounds) || self.round_step.is_some_and(|step| rounds % step == 0) {
            return true;
        }
        if previous_actions >= total_actions {
            return false;
        }
        let crosses_step = self.action_step.is_some_and(|(step, horizon)| {
            let upper = total_actions.min(horizon);
            upper > previous_actions && upper / step > previous_actions / step
        });
        crosses_step
            || self
                .actions
                .range(previous_actions + 1..=total_actions)
                .next()
                .is_some()
    }
}

/// A family of independent trials. Jobs index the learners; a trial is fully
/// determined by its job and seed.
pub trait Protocol: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    fn jobs(&self) -> usize;
    fn one_trial(
        &self,
        job: usize,
        seed: u64,
        control: &TrialControl,
    ) -> Result<TrialRecord, ProtocolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoints_on_rounds_and_milestones() {
        let checkpoints = Checkpoints::new([3], [10, 20]);
        assert!(checkpoints.reached(3, 2, 3));
        assert!(!checkpoints.reached(4, 3, 4));
        // a multi-pull round crossing a milestone
        assert!(checkpoints.reached(5, 8, 12));
        assert!(checkpoints.reached(6, 12, 20));
        assert!(!checkpoints.reached(7, 20, 20));
    }

    #[test]
    fn every_actions_milestones() {
        let checkpoints = Checkpoints::every_actions(25, 100);
        let hits = (1..=120)
            .filter(|&total| checkpoints.reached(total, total - 1, total))
            .collect::<Vec<_>>();
        assert_eq!(hits, vec![25, 50, 75, 100]);
        // one round jumping over several milestones
        assert!(checkpoints.reached(1, 10, 60));
        assert!(!checkpoints.reached(1, 76, 99));
        assert_eq!(Checkpoints::every_actions(0, 100), Checkpoints::default());
    }

    #[test]
    fn periodic_milestones_are_not_materialised() {
        let checkpoints = Checkpoints::every_actions(1, u64::MAX);
        assert!(checkpoints.reached(1, u64::MAX - 1, u64::MAX));
        assert!(!checkpoints.reached(1, u64::MAX, u64::MAX));
    }

    #[test]
    fn every_rounds_milestones() {
        let checkpoints = Checkpoints::every_rounds(3).with_action_step(100, 1000);
        assert!(checkpoints.reached(3, 5, 6));
        assert!(!checkpoints.reached(4, 6, 7));
        assert!(checkpoints.reached(5, 99, 100));
        assert_eq!(Checkpoints::every_rounds(0), Checkpoints::default());
    }

    #[test]
    fn cancellation_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
