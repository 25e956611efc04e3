//! Dataset configuration record (`dataset.config`)

use super::cleaning::CleaningRule;
use crate::features::feature_selection::FeatureSelectionConfig;
use serde::{Deserialize, Serialize};

/// `{cleaning_rules, feature_selection?, target_column}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub cleaning_rules: Vec<CleaningRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_selection: Option<FeatureSelectionConfig>,
    pub target_column: String,
}

impl DatasetConfig {
    pub fn new(target_column: impl Into<String>) -> Self {
        Self {
            cleaning_rules: Vec::new(),
            feature_selection: None,
            target_column: target_column.into(),
        }
    }

    /// Algorithm name, when feature selection is configured with one
    pub fn feature_selection_name(&self) -> Option<&str> {
        self.feature_selection
            .as_ref()
            .and_then(|fs| fs.name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "cleaning_rules": [{"rule": "drop_missing"}, {"rule": "drop_columns", "columns": ["author"]}],
            "feature_selection": {"name": "mrmr", "params": {"k": 5}},
            "target_column": "is_buggy"
        }"#;
        let config: DatasetConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.cleaning_rules.len(), 2);
        assert_eq!(config.feature_selection_name(), Some("mrmr"));
        assert_eq!(config.feature_selection.unwrap().params["k"], 5);
    }

    #[test]
    fn test_feature_selection_without_name_is_absent() {
        let json = r#"{"feature_selection": {"params": {}}, "target_column": "y"}"#;
        let config: DatasetConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.feature_selection_name(), None);

        let omitted: DatasetConfig = serde_json::from_str(r#"{"target_column": "y"}"#).unwrap();
        assert_eq!(omitted.feature_selection_name(), None);
    }

    #[test]
    fn test_unknown_cleaning_rule_is_rejected() {
        let json = r#"{"cleaning_rules": [{"rule": "smote"}], "target_column": "y"}"#;
        assert!(serde_json::from_str::<DatasetConfig>(json).is_err());
    }
}
