use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeatureSelectionError {
    /// Name is unknown, or declared in the catalog without an implementation
    #[error("Feature selection algorithm '{0}' is not implemented")]
    Unimplemented(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Algorithm-level failure (degenerate input, worker panic, bad output)
    #[error("{0}")]
    Runtime(String),
}

impl FeatureSelectionError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
