use crate::error::Result;
use crate::job::IngestionMode;
use crate::pipeline::{ProgressSink, ProgressUpdate};
use jitmine_core::features::bug_linking::{BugLinkage, IssueLinker, IssueTracker};
use jitmine_core::features::guru_metrics::{CommitGuruMetrics, GuruMetricsCalculator};
use jitmine_core::features::structural_metrics::{StructuralMetricsRunner, StructuralMetricsTable};
use jitmine_core::{CommitHash, VersionControl};
use jitmine_storage::MetricsStore;
use std::sync::Arc;
use uuid::Uuid;

/// Collaborators of one ingestion run
#[derive(Clone)]
pub struct IngestionServices {
    pub vcs: Arc<dyn VersionControl>,
    pub store: Arc<dyn MetricsStore>,
    pub metrics_runner: Arc<dyn StructuralMetricsRunner>,
    pub issue_tracker: Arc<dyn IssueTracker>,
    pub calculator: Arc<GuruMetricsCalculator>,
    pub linker: Arc<IssueLinker>,
    /// Issues carrying one of these labels count as bugs
    pub bug_labels: Vec<String>,
}

/// Builds the services for a repository (working copy path, tracker, ...)
pub trait ServiceFactory: Send + Sync {
    fn services_for(&self, repo_id: &str, repo_url: &str) -> Result<IngestionServices>;
}

impl<F> ServiceFactory for F
where
    F: Fn(&str, &str) -> Result<IngestionServices> + Send + Sync,
{
    fn services_for(&self, repo_id: &str, repo_url: &str) -> Result<IngestionServices> {
        self(repo_id, repo_url)
    }
}

/// State threaded through the ingestion steps
pub struct IngestionContext {
    pub job_id: Uuid,
    pub repo_id: String,
    pub repo_url: String,
    pub mode: IngestionMode,
    /// Default branch, set by the prepare step
    pub head_ref: Option<String>,
    /// Commits the run produces rows for
    pub targets: Vec<CommitHash>,
    pub guru_rows: Vec<CommitGuruMetrics>,
    pub linkages: Vec<BugLinkage>,
    pub structural: Vec<StructuralMetricsTable>,
    pub warnings: Vec<String>,
    pub services: Arc<IngestionServices>,
    pub progress: Arc<dyn ProgressSink>,
}

impl IngestionContext {
    pub fn new(
        job_id: Uuid,
        repo_id: impl Into<String>,
        repo_url: impl Into<String>,
        mode: IngestionMode,
        services: Arc<IngestionServices>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            job_id,
            repo_id: repo_id.into(),
            repo_url: repo_url.into(),
            mode,
            head_ref: None,
            targets: Vec::new(),
            guru_rows: Vec::new(),
            linkages: Vec::new(),
            structural: Vec::new(),
            warnings: Vec::new(),
            services,
            progress,
        }
    }

    pub fn vcs(&self) -> &dyn VersionControl {
        self.services.vcs.as_ref()
    }

    pub fn store(&self) -> &dyn MetricsStore {
        self.services.store.as_ref()
    }

    /// Revision history queries start from
    pub fn head(&self) -> &str {
        self.head_ref.as_deref().unwrap_or("HEAD")
    }

    pub fn is_target(&self, hash: &CommitHash) -> bool {
        self.targets.contains(hash)
    }

    /// Warning kept on the finished job (the run still succeeds)
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("Job {}: {}", self.job_id, message);
        self.warnings.push(message);
    }

    /// In-step progress message
    pub fn note(&self, message: impl Into<String>) {
        self.progress.report(ProgressUpdate {
            job_id: self.job_id,
            message: message.into(),
            percent: None,
        });
    }
}
