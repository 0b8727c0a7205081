use super::errors::LearnerError;

use crate::arms::PseudoArm;
use crate::bandits::{ArmFeedback, ArmKey, Context};
#[cfg(test)]
use crate::bandits::{Actions, Feedback};

use rand::seq::IndexedRandom;
use rand::RngCore;

/// First index holding the maximum value.
pub fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &value)| match best {
            Some((_, best_value)) if best_value >= value => best,
            _ => Some((i, value)),
        })
        .map(|(i, _)| i)
}

/// First index holding the minimum value.
pub fn argmin(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &value)| match best {
            Some((_, best_value)) if best_value <= value => best,
            _ => Some((i, value)),
        })
        .map(|(i, _)| i)
}

/// Index of the maximum value, uniformly at random among ties.
pub fn argmax_random(values: &[f64], rng: &mut dyn RngCore) -> Option<usize> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let ties = values
        .iter()
        .enumerate()
        .filter(|(_, &value)| value == max)
        .map(|(i, _)| i)
        .collect::<Vec<_>>();
    ties.choose(rng).copied()
}

/// Candidate with the highest empirical mean (first on ties); candidates
/// without data only win when none has data.
pub fn empirical_best(arms: &[PseudoArm], candidates: &[usize]) -> Option<usize> {
    let means = candidates
        .iter()
        .map(|&arm_id| arms[arm_id].em_mean().unwrap_or(f64::NEG_INFINITY))
        .collect::<Vec<_>>();
    argmax(&means).map(|i| candidates[i])
}

pub fn check_arm_num(context: &Context, expected: usize) -> Result<(), LearnerError> {
    match context.arm_num() {
        Some(got) if got == expected => Ok(()),
        Some(got) => Err(LearnerError::ArmNumMismatch { expected, got }),
        None => Err(LearnerError::UnexpectedContext {
            expected: "arm-based",
        }),
    }
}

pub fn check_arm_count(arm_num: usize) -> Result<(), LearnerError> {
    if arm_num < 2 {
        return Err(LearnerError::TooFewArms(arm_num));
    }
    Ok(())
}

/// Binary outcome of a Bernoulli reward.
pub fn bernoulli_outcome(reward: f64) -> Result<bool, LearnerError> {
    if reward == 1.0 {
        Ok(true)
    } else if reward == 0.0 {
        Ok(false)
    } else {
        Err(LearnerError::UnexpectedFeedback(format!(
            "reward {reward} is not a Bernoulli outcome"
        )))
    }
}

/// Arm id of a single-arm feedback, checked against the arm count.
pub fn feedback_arm(feedback: &ArmFeedback, arm_num: usize) -> Result<usize, LearnerError> {
    match feedback.arm {
        ArmKey::Single(arm_id) if arm_id < arm_num => Ok(arm_id),
        ArmKey::Single(arm_id) => Err(LearnerError::UnexpectedFeedback(format!(
            "arm {arm_id} out of range"
        ))),
        ArmKey::Assortment(_) => Err(LearnerError::UnexpectedFeedback(
            "assortment feedback for a single-arm learner".to_string(),
        )),
    }
}

/// Feedback where every pull of arm `i` rewards exactly `means[i]`.
#[cfg(test)]
pub fn constant_feedback(actions: &Actions, means: &[f64]) -> Feedback {
    Feedback {
        arm_feedbacks: actions
            .arm_pulls
            .iter()
            .map(|pull| {
                let &ArmKey::Single(arm_id) = &pull.arm else {
                    panic!("single arm pulls only");
                };
                ArmFeedback {
                    arm: pull.arm.clone(),
                    rewards: vec![means[arm_id]; pull.pulls as usize],
                    customer_feedbacks: Vec::new(),
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn first_extremes() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(argmin(&[2.0, 1.0, 3.0, 1.0]), Some(1));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f64::INFINITY, 1.0, f64::INFINITY]), Some(0));
    }

    #[test]
    fn empirical_best_skips_arms_without_data() {
        let mut arms = vec![PseudoArm::new(); 3];
        assert_eq!(empirical_best(&arms, &[2, 0]), Some(2));

        arms[0].update(&[0.2]);
        arms[1].update(&[0.9]);
        assert_eq!(empirical_best(&arms, &[2, 0]), Some(0));
        assert_eq!(empirical_best(&arms, &[0, 1, 2]), Some(1));
        assert_eq!(empirical_best(&arms, &[]), None);
    }

    #[test]
    fn random_ties_cover_all_maximisers() {
        let mut rng = SmallRng::seed_from_u64(1234);
        let values = [1.0, 5.0, 2.0, 5.0];
        let picks = (0..100)
            .filter_map(|_| argmax_random(&values, &mut rng))
            .collect::<std::collections::BTreeSet<_>>();
        assert_eq!(picks.into_iter().collect::<Vec<_>>(), vec![1, 3]);
    }
}
