use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssortmentError {
    #[error("Invalid reward model: {0}")]
    InvalidModel(String),
    #[error("CVaR percentile {0} must be in (0, 1]")]
    InvalidPercentile(f64),
    #[error("Product {0} not found")]
    ProductNotFound(usize),
    #[error("Empty assortment")]
    EmptyAssortment,
    #[error("Cardinality limit must be at least 1")]
    InvalidCardinality,
    #[error("No feasible assortment to search")]
    NoFeasibleAssortment,
    #[error("Zero revenue no-purchase outcome is not the lowest ranked outcome")]
    ZeroRevenueNotLowest,
    #[error("Operation requires the mean reward")]
    MeanRewardRequired,
}
