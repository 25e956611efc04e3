pub mod correlation;
pub mod mrmr;
pub mod variance;

pub use correlation::CorrelationSelector;
pub use mrmr::MrmrSelector;
pub use variance::VarianceThresholdSelector;
