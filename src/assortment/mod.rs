pub mod errors;
pub mod reward;
pub mod search;

pub use errors::AssortmentError;
pub use reward::{RewardKind, RewardModel};
pub use search::{
    enumerate_assortments, exhaustive_search, greedy_mean_search, local_search,
    search_best_assortment, TieBreak,
};

use std::collections::BTreeSet;

pub type Assortment = BTreeSet<usize>;
