pub mod arms;
pub mod assortment;
pub mod bandits;
pub mod collaborative;
pub mod config;
pub mod errors;
pub mod learners;
pub mod protocols;
pub mod rng;
