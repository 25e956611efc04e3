//! Declarative catalog of feature-selection algorithms

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Integer,
    Float,
    String,
    Boolean,
}

/// `{name, type, description, default?, options?, range?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
}

impl ParameterDefinition {
    fn new(name: &str, param_type: ParameterType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            default: None,
            options: None,
            range: None,
        }
    }

    fn default_value(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }
}

/// Capability registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSelectionDefinition {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub parameters: Vec<ParameterDefinition>,
    pub is_implemented: bool,
}

impl FeatureSelectionDefinition {
    fn new(name: &str, display_name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
            is_implemented: false,
        }
    }

    fn param(mut self, param: ParameterDefinition) -> Self {
        self.parameters.push(param);
        self
    }
}

/// Every algorithm the catalog declares, implemented or not
///
/// `is_implemented` is filled in by the factory from its registry.
pub(crate) fn declared_definitions() -> Vec<FeatureSelectionDefinition> {
    use serde_json::json;

    vec![
        FeatureSelectionDefinition::new(
            "mrmr",
            "mRMR",
            "Minimum-redundancy maximum-relevance selection using mutual information",
        )
        .param(
            ParameterDefinition::new("k", ParameterType::Integer, "Number of features to select")
                .default_value(json!(10))
                .range(0.0, 1000.0),
        )
        .param(
            ParameterDefinition::new(
                "bins",
                ParameterType::Integer,
                "Equal-width bins used to discretize continuous features",
            )
            .default_value(json!(10))
            .range(2.0, 100.0),
        ),
        FeatureSelectionDefinition::new(
            "variance_threshold",
            "Variance Threshold",
            "Removes features whose variance does not exceed the threshold",
        )
        .param(
            ParameterDefinition::new("threshold", ParameterType::Float, "Minimum variance to keep")
                .default_value(json!(0.0)),
        ),
        FeatureSelectionDefinition::new(
            "correlation",
            "Correlation Ranking",
            "Keeps the k features most correlated (absolute Pearson) with the target",
        )
        .param(
            ParameterDefinition::new("k", ParameterType::Integer, "Number of features to select")
                .default_value(json!(10))
                .range(0.0, 1000.0),
        ),
        FeatureSelectionDefinition::new(
            "boruta",
            "Boruta",
            "All-relevant selection with shadow features and random forests",
        )
        .param(
            ParameterDefinition::new("max_iter", ParameterType::Integer, "Maximum iterations")
                .default_value(json!(100)),
        ),
    ]
}
