//! Column-major numeric table

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Column {column} has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Rows x named f64 columns
///
/// Column order is significant: it is the order artifacts are written in
/// and the order feature selection reconstructs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    columns: Vec<Column>,
}

impl DataFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns<I, S>(columns: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut frame = Self::new();
        for (name, values) in columns {
            frame.push_column(name, values)?;
        }
        Ok(frame)
    }

    /// Append a column; length must match existing columns
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), DatasetError> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(DatasetError::DuplicateColumn(name));
        }
        if let Some(first) = self.columns.first() {
            if first.values.len() != values.len() {
                return Err(DatasetError::LengthMismatch {
                    column: name,
                    expected: first.values.len(),
                    found: values.len(),
                });
            }
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    /// Keep only `names`, in the given order
    pub fn select(&self, names: &[&str]) -> Result<Self, DatasetError> {
        let mut selected = Self::new();
        for name in names {
            let values = self
                .column(name)
                .ok_or_else(|| DatasetError::ColumnNotFound(name.to_string()))?;
            selected.push_column(*name, values.to_vec())?;
        }
        Ok(selected)
    }

    /// Split into (features, target), features keeping their order
    pub fn split_target(&self, target: &str) -> Result<(Self, Vec<f64>), DatasetError> {
        let mut features = self.clone();
        let target = features
            .drop_column(target)
            .ok_or_else(|| DatasetError::ColumnNotFound(target.to_string()))?;
        Ok((features, target.values))
    }

    /// Keep rows where `keep[row]` is true
    pub fn filter_rows(&self, keep: &[bool]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c
                        .values
                        .iter()
                        .zip(keep)
                        .filter(|(_, k)| **k)
                        .map(|(v, _)| *v)
                        .collect(),
                })
                .collect(),
        }
    }

    /// Row `idx` across all columns
    pub fn row(&self, idx: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c.values[idx]).collect()
    }

    pub(crate) fn columns_mut(&mut self) -> &mut Vec<Column> {
        &mut self.columns
    }
}
