use super::error::FeatureSelectionError;
use crate::features::dataset::DataFrame;

pub type Params = serde_json::Map<String, serde_json::Value>;

/// A feature-selection algorithm
///
/// Implementations are CPU-bound and synchronous; callers offload them.
/// The returned names must be a subset of `features`' columns.
pub trait FeatureSelectionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn select_features(
        &self,
        features: &DataFrame,
        target: &[f64],
        params: &Params,
    ) -> Result<Vec<String>, FeatureSelectionError>;
}

/// Non-negative integer parameter with default
pub fn usize_param(params: &Params, name: &str, default: usize) -> Result<usize, FeatureSelectionError> {
    match params.get(name) {
        None | Some(serde_json::Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .map(|v| v as usize)
            .ok_or_else(|| {
                FeatureSelectionError::invalid_parameter(
                    name,
                    format!("expected a non-negative integer, got {}", value),
                )
            }),
    }
}

/// Float parameter with default
pub fn f64_param(params: &Params, name: &str, default: f64) -> Result<f64, FeatureSelectionError> {
    match params.get(name) {
        None | Some(serde_json::Value::Null) => Ok(default),
        Some(value) => value.as_f64().ok_or_else(|| {
            FeatureSelectionError::invalid_parameter(name, format!("expected a number, got {}", value))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_usize_param() {
        assert_eq!(usize_param(&params(json!({})), "k", 10).unwrap(), 10);
        assert_eq!(usize_param(&params(json!({"k": 3})), "k", 10).unwrap(), 3);
        assert!(usize_param(&params(json!({"k": -1})), "k", 10).is_err());
        assert!(usize_param(&params(json!({"k": "five"})), "k", 10).is_err());
    }

    #[test]
    fn test_f64_param_accepts_integers() {
        assert_eq!(f64_param(&params(json!({"t": 1})), "t", 0.0).unwrap(), 1.0);
    }
}
