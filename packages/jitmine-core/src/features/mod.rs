pub mod bug_linking;
pub mod dataset;
pub mod feature_selection;
pub mod guru_metrics;
pub mod structural_metrics;
pub mod vcs;
