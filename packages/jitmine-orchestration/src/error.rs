use jitmine_core::features::bug_linking::IssueError;
use jitmine_core::features::structural_metrics::MetricsToolError;
use jitmine_core::{ConfigError, DatasetError, FeatureSelectionError, VcsError};
use jitmine_storage::{ErrorKind, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Failure of a subprocess or remote service the pipelines depend on
#[derive(Error, Debug)]
pub enum ExternalToolError {
    #[error("Version control: {0}")]
    Vcs(#[from] VcsError),

    #[error("Structural metrics tool: {0}")]
    Metrics(#[from] MetricsToolError),

    #[error("Issue tracker: {0}")]
    IssueTracker(#[from] IssueError),
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("External tool failed: {0}")]
    ExternalTool(#[from] ExternalToolError),

    #[error("Commit {0} is not available locally or on the remote")]
    CommitNotFound(String),

    #[error("Target column '{column}' not found (available: {available:?})")]
    MissingTargetColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("Feature selection algorithm '{0}' is not implemented")]
    UnimplementedAlgorithm(String),

    #[error("Feature selection failed: {0}")]
    FeatureSelectionRuntime(#[source] FeatureSelectionError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Unknown ingestion strategy: {0}")]
    UnknownStrategy(String),

    #[error("Bincode error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<VcsError> for OrchestratorError {
    fn from(e: VcsError) -> Self {
        Self::ExternalTool(e.into())
    }
}

impl From<MetricsToolError> for OrchestratorError {
    fn from(e: MetricsToolError) -> Self {
        Self::ExternalTool(e.into())
    }
}

impl From<IssueError> for OrchestratorError {
    fn from(e: IssueError) -> Self {
        Self::ExternalTool(e.into())
    }
}

impl From<FeatureSelectionError> for OrchestratorError {
    fn from(e: FeatureSelectionError) -> Self {
        match e {
            FeatureSelectionError::Unimplemented(name) => Self::UnimplementedAlgorithm(name),
            other => Self::FeatureSelectionRuntime(other),
        }
    }
}

impl From<ConfigError> for OrchestratorError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl OrchestratorError {
    pub fn parse<E: std::fmt::Display>(e: E) -> Self {
        Self::Parse(e.to_string())
    }

    pub fn config<E: std::fmt::Display>(e: E) -> Self {
        Self::Config(e.to_string())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Classification recorded on failed jobs
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ExternalTool(tool) => match tool {
                ExternalToolError::Vcs(VcsError::CommandFailed { .. }) => ErrorCategory::Transient,
                ExternalToolError::Vcs(VcsError::Io(_)) => ErrorCategory::Infrastructure,
                ExternalToolError::Vcs(_) => ErrorCategory::Permanent,
                ExternalToolError::Metrics(MetricsToolError::Spawn { .. })
                | ExternalToolError::Metrics(MetricsToolError::Io(_)) => {
                    ErrorCategory::Infrastructure
                }
                ExternalToolError::Metrics(_) => ErrorCategory::Permanent,
                ExternalToolError::IssueTracker(IssueError::Http(_)) => ErrorCategory::Transient,
                ExternalToolError::IssueTracker(IssueError::Status { status, .. })
                    if *status >= 500 || *status == 429 =>
                {
                    ErrorCategory::Transient
                }
                ExternalToolError::IssueTracker(_) => ErrorCategory::Permanent,
            },
            Self::Storage(e) => match e.kind {
                ErrorKind::Database | ErrorKind::IO => ErrorCategory::Infrastructure,
                _ => ErrorCategory::Permanent,
            },
            Self::Io(_) => ErrorCategory::Infrastructure,
            Self::Other(_) => ErrorCategory::Transient,
            _ => ErrorCategory::Permanent,
        }
    }
}

/// Error category recorded on failed jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Likely to succeed on a manual re-run (network, remote tool hiccup)
    Transient,
    /// Re-running with the same inputs fails again (bad config, bad data)
    Permanent,
    /// Local environment problem (disk, database, missing binary)
    Infrastructure,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::Infrastructure => "infrastructure",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "transient" => Ok(ErrorCategory::Transient),
            "permanent" => Ok(ErrorCategory::Permanent),
            "infrastructure" => Ok(ErrorCategory::Infrastructure),
            _ => Err(OrchestratorError::parse(format!(
                "Invalid error category: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_roundtrip() {
        for category in &[
            ErrorCategory::Transient,
            ErrorCategory::Permanent,
            ErrorCategory::Infrastructure,
        ] {
            let s = category.as_str();
            let parsed = ErrorCategory::from_str(s).unwrap();
            assert_eq!(*category, parsed);
        }
    }

    #[test]
    fn test_error_category_invalid() {
        assert!(ErrorCategory::from_str("invalid").is_err());
    }

    #[test]
    fn test_feature_selection_errors_map_to_taxonomy() {
        let err: OrchestratorError =
            FeatureSelectionError::Unimplemented("nonexistent_algo".to_string()).into();
        assert!(matches!(err, OrchestratorError::UnimplementedAlgorithm(ref n) if n == "nonexistent_algo"));
        assert_eq!(err.category(), ErrorCategory::Permanent);

        let err: OrchestratorError = FeatureSelectionError::invalid_parameter("k", "negative").into();
        assert!(matches!(err, OrchestratorError::FeatureSelectionRuntime(_)));
        assert_eq!(
            err.to_string(),
            "Feature selection failed: Invalid parameter 'k': negative"
        );
        let source = std::error::Error::source(&err)
            .and_then(|e| e.downcast_ref::<FeatureSelectionError>())
            .expect("algorithm error kept as source");
        assert_eq!(source, &FeatureSelectionError::invalid_parameter("k", "negative"));
    }

    #[test]
    fn test_tool_failures_are_categorized() {
        let failed: OrchestratorError = VcsError::CommandFailed {
            command: "git fetch".to_string(),
            exit_code: Some(128),
            stderr: "timeout".to_string(),
        }
        .into();
        assert_eq!(failed.category(), ErrorCategory::Transient);
        assert!(failed.to_string().starts_with("External tool failed"));

        let missing: OrchestratorError = MetricsToolError::MissingOutput("class.csv".to_string()).into();
        assert_eq!(missing.category(), ErrorCategory::Permanent);

        let storage: OrchestratorError = StorageError::database("locked").into();
        assert_eq!(storage.category(), ErrorCategory::Infrastructure);
    }
}
