//! Cleaning rules applied before feature selection

use super::frame::{DataFrame, DatasetError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CleaningRule {
    /// Remove the named columns (missing names are an error)
    DropColumns { columns: Vec<String> },
    /// Remove rows containing any NaN
    DropMissing,
    /// Replace NaN with a constant
    FillMissing { value: f64 },
    /// Remove zero-variance feature columns (never the target)
    RemoveConstantColumns,
    /// Keep the first occurrence of identical rows
    DropDuplicateRows,
}

impl CleaningRule {
    pub fn name(&self) -> &'static str {
        match self {
            CleaningRule::DropColumns { .. } => "drop_columns",
            CleaningRule::DropMissing => "drop_missing",
            CleaningRule::FillMissing { .. } => "fill_missing",
            CleaningRule::RemoveConstantColumns => "remove_constant_columns",
            CleaningRule::DropDuplicateRows => "drop_duplicate_rows",
        }
    }

    pub fn apply(&self, mut df: DataFrame, target: &str) -> Result<DataFrame, DatasetError> {
        match self {
            CleaningRule::DropColumns { columns } => {
                for name in columns {
                    df.drop_column(name)
                        .ok_or_else(|| DatasetError::ColumnNotFound(name.clone()))?;
                }
                Ok(df)
            }
            CleaningRule::DropMissing => {
                let keep: Vec<bool> = (0..df.n_rows())
                    .map(|i| df.columns().iter().all(|c| !c.values[i].is_nan()))
                    .collect();
                Ok(df.filter_rows(&keep))
            }
            CleaningRule::FillMissing { value } => {
                for column in df.columns_mut() {
                    for v in column.values.iter_mut().filter(|v| v.is_nan()) {
                        *v = *value;
                    }
                }
                Ok(df)
            }
            CleaningRule::RemoveConstantColumns => {
                let constant: Vec<String> = df
                    .columns()
                    .iter()
                    .filter(|c| c.name != target)
                    .filter(|c| {
                        let mut finite = c.values.iter().filter(|v| !v.is_nan());
                        match finite.next() {
                            Some(first) => finite.all(|v| v == first),
                            None => true,
                        }
                    })
                    .map(|c| c.name.clone())
                    .collect();
                for name in constant {
                    df.drop_column(&name);
                }
                Ok(df)
            }
            CleaningRule::DropDuplicateRows => {
                let mut seen: HashSet<Vec<u64>> = HashSet::new();
                let keep: Vec<bool> = (0..df.n_rows())
                    .map(|i| seen.insert(df.row(i).iter().map(|v| v.to_bits()).collect()))
                    .collect();
                Ok(df.filter_rows(&keep))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        DataFrame::from_columns(vec![
            ("la", vec![1.0, f64::NAN, 3.0, 1.0]),
            ("const", vec![7.0, 7.0, 7.0, 7.0]),
            ("y", vec![1.0, 1.0, 1.0, 1.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_drop_missing() {
        let df = CleaningRule::DropMissing.apply(frame(), "y").unwrap();
        assert_eq!(df.n_rows(), 3);
    }

    #[test]
    fn test_fill_missing() {
        let df = CleaningRule::FillMissing { value: 0.0 }
            .apply(frame(), "y")
            .unwrap();
        assert_eq!(df.column("la").unwrap()[1], 0.0);
    }

    #[test]
    fn test_remove_constant_keeps_target() {
        let df = CleaningRule::RemoveConstantColumns
            .apply(frame(), "y")
            .unwrap();
        assert_eq!(df.column_names(), vec!["la", "y"]);
    }

    #[test]
    fn test_drop_duplicate_rows() {
        let df = CleaningRule::DropDuplicateRows.apply(frame(), "y").unwrap();
        assert_eq!(df.n_rows(), 3);
    }

    #[test]
    fn test_drop_unknown_column_fails() {
        let rule = CleaningRule::DropColumns {
            columns: vec!["nope".to_string()],
        };
        assert_eq!(
            rule.apply(frame(), "y"),
            Err(DatasetError::ColumnNotFound("nope".to_string()))
        );
    }
}
