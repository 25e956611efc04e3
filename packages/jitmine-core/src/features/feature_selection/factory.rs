//! Name -> strategy registry

use super::algorithms::{CorrelationSelector, MrmrSelector, VarianceThresholdSelector};
use super::definition::{declared_definitions, FeatureSelectionDefinition};
use super::error::FeatureSelectionError;
use super::strategy::FeatureSelectionStrategy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Closed set of algorithm discriminants known to the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSelectionAlgorithm {
    Mrmr,
    VarianceThreshold,
    Correlation,
    Boruta,
}

impl FeatureSelectionAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureSelectionAlgorithm::Mrmr => "mrmr",
            FeatureSelectionAlgorithm::VarianceThreshold => "variance_threshold",
            FeatureSelectionAlgorithm::Correlation => "correlation",
            FeatureSelectionAlgorithm::Boruta => "boruta",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "mrmr" => Some(FeatureSelectionAlgorithm::Mrmr),
            "variance_threshold" => Some(FeatureSelectionAlgorithm::VarianceThreshold),
            "correlation" => Some(FeatureSelectionAlgorithm::Correlation),
            "boruta" => Some(FeatureSelectionAlgorithm::Boruta),
            _ => None,
        }
    }
}

impl std::fmt::Display for FeatureSelectionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registry of implemented strategies
///
/// Lookup never falls back: unknown names and catalog entries without a
/// registered strategy both yield `FeatureSelectionError::Unimplemented`.
#[derive(Clone, Default)]
pub struct FeatureSelectionFactory {
    strategies: HashMap<FeatureSelectionAlgorithm, Arc<dyn FeatureSelectionStrategy>>,
}

impl FeatureSelectionFactory {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in strategy
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register(FeatureSelectionAlgorithm::Mrmr, Arc::new(MrmrSelector));
        factory.register(
            FeatureSelectionAlgorithm::VarianceThreshold,
            Arc::new(VarianceThresholdSelector),
        );
        factory.register(
            FeatureSelectionAlgorithm::Correlation,
            Arc::new(CorrelationSelector),
        );
        factory
    }

    pub fn register(
        &mut self,
        algorithm: FeatureSelectionAlgorithm,
        strategy: Arc<dyn FeatureSelectionStrategy>,
    ) {
        self.strategies.insert(algorithm, strategy);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn FeatureSelectionStrategy>, FeatureSelectionError> {
        FeatureSelectionAlgorithm::from_name(name)
            .and_then(|algorithm| self.strategies.get(&algorithm).cloned())
            .ok_or_else(|| FeatureSelectionError::Unimplemented(name.to_string()))
    }

    pub fn is_implemented(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Catalog entries with `is_implemented` reflecting this registry
    pub fn definitions(&self) -> Vec<FeatureSelectionDefinition> {
        declared_definitions()
            .into_iter()
            .map(|mut def| {
                def.is_implemented = self.is_implemented(&def.name);
                def
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_registered() {
        let factory = FeatureSelectionFactory::with_defaults();
        assert_eq!(factory.get("mrmr").unwrap().name(), "mrmr");
        assert_eq!(
            factory.get("variance_threshold").unwrap().name(),
            "variance_threshold"
        );
    }

    #[test]
    fn test_unknown_name_is_unimplemented() {
        let factory = FeatureSelectionFactory::with_defaults();
        for name in ["nonexistent_algo", "MRMR", ""] {
            assert_eq!(
                factory.get(name).err(),
                Some(FeatureSelectionError::Unimplemented(name.to_string()))
            );
        }
    }

    #[test]
    fn test_declared_but_unregistered_is_unimplemented() {
        let factory = FeatureSelectionFactory::with_defaults();
        assert!(matches!(
            factory.get("boruta"),
            Err(FeatureSelectionError::Unimplemented(_))
        ));
    }

    #[test]
    fn test_definitions_reflect_registry() {
        let defs = FeatureSelectionFactory::with_defaults().definitions();
        let boruta = defs.iter().find(|d| d.name == "boruta").unwrap();
        assert!(!boruta.is_implemented);
        let mrmr = defs.iter().find(|d| d.name == "mrmr").unwrap();
        assert!(mrmr.is_implemented);

        let names: std::collections::HashSet<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names.len(), defs.len());
    }

    #[test]
    fn test_every_discriminant_round_trips_through_catalog() {
        for def in FeatureSelectionFactory::new().definitions() {
            let algorithm = FeatureSelectionAlgorithm::from_name(&def.name).unwrap();
            assert_eq!(algorithm.as_str(), def.name);
        }
    }
}
