use crate::features::dataset::DataFrame;
use crate::features::feature_selection::error::FeatureSelectionError;
use crate::features::feature_selection::stats::variance;
use crate::features::feature_selection::strategy::{f64_param, FeatureSelectionStrategy, Params};

/// Keeps features whose variance exceeds `threshold`, in input order
#[derive(Debug, Default)]
pub struct VarianceThresholdSelector;

impl FeatureSelectionStrategy for VarianceThresholdSelector {
    fn name(&self) -> &'static str {
        "variance_threshold"
    }

    fn select_features(
        &self,
        features: &DataFrame,
        _target: &[f64],
        params: &Params,
    ) -> Result<Vec<String>, FeatureSelectionError> {
        let threshold = f64_param(params, "threshold", 0.0)?;
        if threshold < 0.0 {
            return Err(FeatureSelectionError::invalid_parameter(
                "threshold",
                "must be non-negative",
            ));
        }

        Ok(features
            .columns()
            .iter()
            .filter(|c| variance(&c.values) > threshold)
            .map(|c| c.name.clone())
            .collect())
    }
}
