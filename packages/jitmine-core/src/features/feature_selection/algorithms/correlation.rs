use crate::features::dataset::DataFrame;
use crate::features::feature_selection::error::FeatureSelectionError;
use crate::features::feature_selection::stats::pearson;
use crate::features::feature_selection::strategy::{usize_param, FeatureSelectionStrategy, Params};
use rayon::prelude::*;

/// Top-k features by |Pearson r| with the target, strongest first
#[derive(Debug, Default)]
pub struct CorrelationSelector;

impl FeatureSelectionStrategy for CorrelationSelector {
    fn name(&self) -> &'static str {
        "correlation"
    }

    fn select_features(
        &self,
        features: &DataFrame,
        target: &[f64],
        params: &Params,
    ) -> Result<Vec<String>, FeatureSelectionError> {
        let k = usize_param(params, "k", 10)?;
        if target.len() != features.n_rows() {
            return Err(FeatureSelectionError::Runtime(format!(
                "target has {} rows, features have {}",
                target.len(),
                features.n_rows()
            )));
        }

        let mut scored: Vec<(usize, f64)> = features
            .columns()
            .par_iter()
            .enumerate()
            .map(|(i, c)| (i, pearson(&c.values, target).abs()))
            .collect();
        // Stable sort keeps input order among ties
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, _)| features.columns()[i].name.clone())
            .collect())
    }
}
