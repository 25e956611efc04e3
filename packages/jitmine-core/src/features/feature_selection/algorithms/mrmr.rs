//! Minimum-redundancy maximum-relevance (MID criterion)

use crate::features::dataset::DataFrame;
use crate::features::feature_selection::error::FeatureSelectionError;
use crate::features::feature_selection::stats::{discretize, discretize_target, mutual_information};
use crate::features::feature_selection::strategy::{usize_param, FeatureSelectionStrategy, Params};
use rayon::prelude::*;
use tracing::debug;

#[derive(Debug, Default)]
pub struct MrmrSelector;

impl FeatureSelectionStrategy for MrmrSelector {
    fn name(&self) -> &'static str {
        "mrmr"
    }

    fn select_features(
        &self,
        features: &DataFrame,
        target: &[f64],
        params: &Params,
    ) -> Result<Vec<String>, FeatureSelectionError> {
        let k = usize_param(params, "k", 10)?;
        let bins = usize_param(params, "bins", 10)?;
        if bins < 2 {
            return Err(FeatureSelectionError::invalid_parameter("bins", "must be at least 2"));
        }
        if target.len() != features.n_rows() {
            return Err(FeatureSelectionError::Runtime(format!(
                "target has {} rows, features have {}",
                target.len(),
                features.n_rows()
            )));
        }

        let columns = features.columns();
        let k = k.min(columns.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let discrete: Vec<Vec<u32>> = columns
            .par_iter()
            .map(|c| discretize(&c.values, bins))
            .collect();
        let y = discretize_target(target, bins);
        let relevance: Vec<f64> = discrete
            .par_iter()
            .map(|x| mutual_information(x, &y))
            .collect();

        let mut selected: Vec<usize> = Vec::with_capacity(k);
        // Sum of MI with already-selected features, per candidate
        let mut redundancy = vec![0.0f64; columns.len()];

        while selected.len() < k {
            let last = selected.last().copied();
            if let Some(last) = last {
                let with_last: Vec<f64> = discrete
                    .par_iter()
                    .map(|x| mutual_information(x, &discrete[last]))
                    .collect();
                for (r, mi) in redundancy.iter_mut().zip(with_last) {
                    *r += mi;
                }
            }

            let denom = selected.len().max(1) as f64;
            let best = (0..columns.len())
                .filter(|i| !selected.contains(i))
                .map(|i| {
                    let score = if selected.is_empty() {
                        relevance[i]
                    } else {
                        relevance[i] - redundancy[i] / denom
                    };
                    (i, score)
                })
                // Ties go to the earlier column
                .fold(None, |best: Option<(usize, f64)>, (i, score)| match best {
                    Some((_, s)) if s >= score => best,
                    _ => Some((i, score)),
                });

            match best {
                Some((i, score)) => {
                    debug!("mRMR: pick {} (score {:.4})", columns[i].name, score);
                    selected.push(i);
                }
                None => break,
            }
        }

        Ok(selected.into_iter().map(|i| columns[i].name.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(k: usize) -> Params {
        json!({ "k": k }).as_object().cloned().unwrap()
    }

    #[test]
    fn test_picks_informative_then_non_redundant() {
        let y = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let df = DataFrame::from_columns(vec![
            ("noise", vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0]),
            ("signal", vec![0.0, 0.1, 0.0, 0.1, 1.0, 0.9, 1.0, 0.9]),
            ("signal_copy", vec![0.0, 0.1, 0.0, 0.1, 1.0, 0.9, 1.0, 0.9]),
            ("partial", vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]),
        ])
        .unwrap();

        let picked = MrmrSelector.select_features(&df, &y, &params(2)).unwrap();
        assert_eq!(picked[0], "signal");
        assert_eq!(picked.len(), 2);
        assert_ne!(picked[1], "signal_copy");
    }

    #[test]
    fn test_k_zero_selects_nothing() {
        let df = DataFrame::from_columns(vec![("a", vec![1.0, 2.0])]).unwrap();
        let picked = MrmrSelector
            .select_features(&df, &[0.0, 1.0], &params(0))
            .unwrap();
        assert!(picked.is_empty());
    }

    #[test]
    fn test_k_larger_than_features_is_capped() {
        let df = DataFrame::from_columns(vec![("a", vec![1.0, 2.0]), ("b", vec![2.0, 1.0])]).unwrap();
        let picked = MrmrSelector
            .select_features(&df, &[0.0, 1.0], &params(10))
            .unwrap();
        assert_eq!(picked.len(), 2);
    }
}
