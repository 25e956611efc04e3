/// Feature Selection
///
/// Name-keyed strategies behind a closed algorithm enum and an explicit
/// registry. Unknown or unregistered names fail at lookup time; there is no
/// fallback algorithm.
///
/// ## Algorithms
/// - `mrmr`: minimum-redundancy maximum-relevance (mutual information)
/// - `variance_threshold`: drop low-variance features
/// - `correlation`: top-k absolute Pearson correlation with the target
pub mod algorithms;
pub mod config;
pub mod definition;
pub mod error;
pub mod factory;
pub mod stats;
pub mod strategy;

pub use config::FeatureSelectionConfig;
pub use definition::{FeatureSelectionDefinition, ParameterDefinition, ParameterType};
pub use error::FeatureSelectionError;
pub use factory::{FeatureSelectionAlgorithm, FeatureSelectionFactory};
pub use strategy::{FeatureSelectionStrategy, Params};
