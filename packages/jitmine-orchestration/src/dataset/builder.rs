//! Mined metrics → one row per commit

use jitmine_core::features::guru_metrics::CommitGuruMetrics;
use jitmine_core::features::structural_metrics::StructuralMetricsTable;
use jitmine_core::{CommitHash, DataFrame, DatasetError};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Label column (1.0 = bug-inducing)
pub const LABEL_COLUMN: &str = "is_buggy";

/// Prefix of per-commit structural metric means
pub const STRUCTURAL_PREFIX: &str = "sm_";

/// Guru features, then `sm_*` columns (sorted), then the label
///
/// A commit without structural metrics gets NaN in every `sm_*` column;
/// cleaning rules decide what happens to those rows.
pub fn build_frame(
    rows: &[CommitGuruMetrics],
    tables: &[StructuralMetricsTable],
) -> Result<DataFrame, DatasetError> {
    let means: HashMap<&CommitHash, BTreeMap<String, f64>> = tables
        .iter()
        .map(|t| (&t.commit_hash, t.column_means()))
        .collect();
    let structural: BTreeSet<&str> = means
        .values()
        .flat_map(|m| m.keys().map(String::as_str))
        .collect();

    let values: Vec<[f64; 14]> = rows.iter().map(|r| r.feature_values()).collect();
    let mut frame = DataFrame::new();
    for (i, name) in CommitGuruMetrics::FEATURES.iter().enumerate() {
        frame.push_column(*name, values.iter().map(|v| v[i]).collect())?;
    }

    for column in structural {
        let values = rows
            .iter()
            .map(|r| {
                means
                    .get(&r.commit_hash)
                    .and_then(|m| m.get(column))
                    .copied()
                    .unwrap_or(f64::NAN)
            })
            .collect();
        frame.push_column(format!("{}{}", STRUCTURAL_PREFIX, column), values)?;
    }

    frame.push_column(
        LABEL_COLUMN,
        rows.iter()
            .map(|r| if r.contains_bug { 1.0 } else { 0.0 })
            .collect(),
    )?;
    Ok(frame)
}
