/// Structural metrics table + CSV parsing
use super::error::MetricsToolError;
use crate::features::vcs::CommitHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metrics of one code entity (class) at one commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralMetricsRow {
    pub commit_hash: CommitHash,
    pub file: String,
    pub entity: String,
    pub metrics: BTreeMap<String, f64>,
}

/// All entities measured at one commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralMetricsTable {
    pub commit_hash: CommitHash,
    /// Numeric metric columns, in tool output order
    pub columns: Vec<String>,
    pub rows: Vec<StructuralMetricsRow>,
}

impl StructuralMetricsTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Per-column mean over entities, ignoring NaN cells
    pub fn column_means(&self) -> BTreeMap<String, f64> {
        self.columns
            .iter()
            .map(|col| {
                let values: Vec<f64> = self
                    .rows
                    .iter()
                    .filter_map(|r| r.metrics.get(col).copied())
                    .filter(|v| !v.is_nan())
                    .collect();
                let mean = if values.is_empty() {
                    f64::NAN
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                };
                (col.clone(), mean)
            })
            .collect()
    }
}

/// Parse a CK-style CSV (`file`, `class` keys + metric columns)
///
/// Columns whose first-row value is not numeric are descriptive and dropped.
/// A later non-numeric value in a numeric column is an error.
pub fn parse_metrics_csv(
    commit_hash: &CommitHash,
    text: &str,
) -> Result<StructuralMetricsTable, MetricsToolError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| MetricsToolError::parse("empty metrics table"))?;
    let header: Vec<String> = split_csv_line(header)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let position = |name: &str| header.iter().position(|h| h.eq_ignore_ascii_case(name));
    let file_idx = position("file")
        .ok_or_else(|| MetricsToolError::parse("missing `file` column"))?;
    let class_idx = position("class")
        .ok_or_else(|| MetricsToolError::parse("missing `class` column"))?;

    let records: Vec<Vec<String>> = lines.map(split_csv_line).collect();
    for (n, record) in records.iter().enumerate() {
        if record.len() != header.len() {
            return Err(MetricsToolError::parse(format!(
                "row {} has {} fields, header has {}",
                n + 2,
                record.len(),
                header.len()
            )));
        }
    }

    let metric_columns: Vec<usize> = (0..header.len())
        .filter(|&i| i != file_idx && i != class_idx)
        .filter(|&i| {
            records
                .first()
                .map(|r| parse_cell(&r[i]).is_some())
                .unwrap_or(true)
        })
        .collect();

    let mut rows = Vec::with_capacity(records.len());
    for (n, record) in records.iter().enumerate() {
        let mut metrics = BTreeMap::new();
        for &i in &metric_columns {
            let value = parse_cell(&record[i]).ok_or_else(|| {
                MetricsToolError::parse(format!(
                    "row {} column `{}`: non-numeric value {:?}",
                    n + 2,
                    header[i],
                    record[i]
                ))
            })?;
            metrics.insert(header[i].clone(), value);
        }
        rows.push(StructuralMetricsRow {
            commit_hash: commit_hash.clone(),
            file: record[file_idx].clone(),
            entity: record[class_idx].clone(),
            metrics,
        });
    }

    Ok(StructuralMetricsTable {
        commit_hash: commit_hash.clone(),
        columns: metric_columns.iter().map(|&i| header[i].clone()).collect(),
        rows,
    })
}

fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Some(f64::NAN);
    }
    cell.parse::<f64>().ok()
}

/// Split one CSV line, honoring double quotes and `""` escapes
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}
