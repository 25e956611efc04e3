/*
 * jitmine-core - Mining primitives for just-in-time defect prediction
 *
 * Everything the pipelines need below the orchestration layer:
 * - Version-control adapter (git binary, structured command results)
 * - History-derived (Commit Guru) metrics
 * - Issue fetching + SZZ-style bug linkage
 * - Structural-metrics tool runner
 * - Tabular datasets, cleaning rules, feature selection
 * - YAML configuration
 */

pub mod config;
pub mod features;

pub use config::{ConfigError, MinerConfig};
pub use features::dataset::{CleaningRule, DataFrame, DatasetConfig, DatasetError};
pub use features::feature_selection::{
    FeatureSelectionConfig, FeatureSelectionDefinition, FeatureSelectionError,
    FeatureSelectionFactory, FeatureSelectionStrategy,
};
pub use features::vcs::{CommandOutput, CommitHash, GitVcs, RawCommit, VcsError, VersionControl};
