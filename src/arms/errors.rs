use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArmError {
    #[error("Probability {0} is not in [0, 1]")]
    InvalidProbability(f64),
    #[error("Standard deviation {0} must be finite and non-negative")]
    InvalidStd(f64),
    #[error("Invalid categorical distribution: {0}")]
    InvalidDistribution(String),
    #[error("Category {category} out of range for {categories} categories")]
    CategoryOutOfRange { category: usize, categories: usize },
    #[error("No data to compute empirical statistics")]
    NoData,
}
