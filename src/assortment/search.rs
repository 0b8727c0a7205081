//! Best assortment search under a cardinality limit.
//!
//! Exhaustive enumeration is exponential in the number of products and is only
//! meant for small catalogs. Local search scales but is only guaranteed to find
//! the optimum for the mean reward.

use super::errors::AssortmentError;
use super::reward::{RewardKind, RewardModel};
use super::Assortment;

use rand::seq::IteratorRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const TIE_TOLERANCE: f64 = 1e-12;

/// How to choose among assortments sharing the maximum reward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum TieBreak {
    /// Uniformly at random among the maximisers.
    #[default]
    Random,
    /// The maximiser enumerated first.
    First,
}

/// All non-empty assortments of at most `card_limit` products, optionally
/// restricted to a candidate set, built by include/exclude recursion over ids.
pub fn enumerate_assortments(
    product_num: usize,
    card_limit: usize,
    restriction: Option<&Assortment>,
) -> Vec<Assortment> {
    let mut assortments = Vec::new();
    let mut current = Assortment::new();
    enumerate(
        &mut assortments,
        product_num,
        1,
        &mut current,
        card_limit,
        restriction,
    );
    assortments
}

fn enumerate(
    assortments: &mut Vec<Assortment>,
    product_num: usize,
    next_product: usize,
    current: &mut Assortment,
    card_limit: usize,
    restriction: Option<&Assortment>,
) {
    if next_product > product_num {
        if !current.is_empty() {
            assortments.push(current.clone());
        }
        return;
    }

    enumerate(
        assortments,
        product_num,
        next_product + 1,
        current,
        card_limit,
        restriction,
    );

    let allowed = restriction.map_or(true, |products| products.contains(&next_product));
    if allowed && current.len() < card_limit {
        current.insert(next_product);
        enumerate(
            assortments,
            product_num,
            next_product + 1,
            current,
            card_limit,
            restriction,
        );
        current.remove(&next_product);
    }
}

pub fn exhaustive_search(
    reward: &RewardModel,
    card_limit: usize,
    restriction: Option<&Assortment>,
    tie_break: TieBreak,
    rng: &mut dyn RngCore,
) -> Result<(f64, Assortment), AssortmentError> {
    if card_limit == 0 {
        return Err(AssortmentError::InvalidCardinality);
    }

    let mut candidates = enumerate_assortments(reward.product_num(), card_limit, restriction)
        .into_iter()
        .map(|assortment| reward.calc(&assortment).map(|value| (value, assortment)))
        .collect::<Result<Vec<_>, _>>()?;
    if candidates.is_empty() {
        return Err(AssortmentError::NoFeasibleAssortment);
    }

    // stable, so ties stay in enumeration order
    candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let top = candidates[candidates.len() - 1].0;
    let mut first_tie = candidates.len() - 1;
    while first_tie > 0 && (top - candidates[first_tie - 1].0).abs() <= TIE_TOLERANCE {
        first_tie -= 1;
    }

    let index = match tie_break {
        TieBreak::First => first_tie,
        TieBreak::Random => rng.random_range(first_tie..candidates.len()),
    };
    Ok(candidates.swap_remove(index))
}

/// Revenue-ordered greedy search for the mean reward. Falls back to an exhaustive
/// search over the greedy candidates when they exceed the cardinality limit.
pub fn greedy_mean_search(
    reward: &RewardModel,
    card_limit: usize,
    tie_break: TieBreak,
    rng: &mut dyn RngCore,
) -> Result<(f64, Assortment), AssortmentError> {
    if reward.kind() != RewardKind::Mean {
        return Err(AssortmentError::MeanRewardRequired);
    }
    if card_limit == 0 {
        return Err(AssortmentError::InvalidCardinality);
    }

    let revenues = reward.revenues();
    let mut products = (1..=reward.product_num()).collect::<Vec<_>>();
    products.sort_by(|&a, &b| {
        revenues[b]
            .partial_cmp(&revenues[a])
            .unwrap_or(Ordering::Equal)
    });

    let mut candidates = Assortment::from([products[0]]);
    let mut best = reward.calc(&candidates)?;
    for &product in &products[1..] {
        candidates.insert(product);
        let value = reward.calc(&candidates)?;
        if value > best {
            best = value;
        } else {
            candidates.remove(&product);
            break;
        }
    }

    if candidates.len() <= card_limit {
        return Ok((best, candidates));
    }
    exhaustive_search(reward, card_limit, Some(&candidates), tie_break, rng)
}

/// Fast path for the mean reward, exhaustive enumeration otherwise.
pub fn search_best_assortment(
    reward: &RewardModel,
    card_limit: usize,
    tie_break: TieBreak,
    rng: &mut dyn RngCore,
) -> Result<(f64, Assortment), AssortmentError> {
    match reward.kind() {
        RewardKind::Mean => greedy_mean_search(reward, card_limit, tie_break, rng),
        RewardKind::Cvar { .. } => exhaustive_search(reward, card_limit, None, tie_break, rng),
    }
}

#[derive(Clone, Copy, Debug)]
enum Move {
    Add,
    Remove,
    Replace,
}

fn random_neighbor(
    current: &Assortment,
    product_num: usize,
    card_limit: usize,
    rng: &mut dyn RngCore,
) -> Option<Assortment> {
    let mut moves = Vec::with_capacity(3);
    if current.len() < card_limit && current.len() < product_num {
        moves.push(Move::Add);
    }
    if current.len() > 1 {
        moves.push(Move::Remove);
    }
    if current.len() < product_num {
        moves.push(Move::Replace);
    }
    if moves.is_empty() {
        return None;
    }

    let mut neighbor = current.clone();
    let outside = |rng: &mut dyn RngCore| {
        (1..=product_num)
            .filter(|product| !current.contains(product))
            .choose(rng)
    };
    match moves[rng.random_range(0..moves.len())] {
        Move::Add => {
            neighbor.insert(outside(&mut *rng)?);
        }
        Move::Remove => {
            let product = *current.iter().choose(rng)?;
            neighbor.remove(&product);
        }
        Move::Replace => {
            let removed = *current.iter().choose(rng)?;
            let added = outside(&mut *rng)?;
            neighbor.remove(&removed);
            neighbor.insert(added);
        }
    }
    Some(neighbor)
}

/// Randomised hill climbing: each step samples `random_neighbors` neighbours
/// (add, remove or replace one product) and moves to the best of them only if it
/// strictly improves the reward.
pub fn local_search(
    reward: &RewardModel,
    card_limit: usize,
    random_neighbors: usize,
    initial: Assortment,
    rng: &mut dyn RngCore,
) -> Result<(f64, Assortment), AssortmentError> {
    if card_limit == 0 || initial.len() > card_limit {
        return Err(AssortmentError::InvalidCardinality);
    }

    let mut current = initial;
    let mut current_reward = reward.calc(&current)?;
    loop {
        let mut best: Option<(f64, Assortment)> = None;
        for _ in 0..random_neighbors {
            let Some(neighbor) = random_neighbor(&current, reward.product_num(), card_limit, rng)
            else {
                break;
            };
            let value = reward.calc(&neighbor)?;
            let improves_best = best
                .as_ref()
                .map_or(true, |(best_value, _)| value > *best_value);
            if value > current_reward && improves_best {
                best = Some((value, neighbor));
            }
        }

        match best {
            Some((value, neighbor)) => {
                current = neighbor;
                current_reward = value;
            }
            None => return Ok((current_reward, current)),
        }
    }
}
