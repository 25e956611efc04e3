use crate::error::{ErrorCategory, OrchestratorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Step identifier, shared by both pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    // Ingestion
    PrepareRepository,
    ResolveHashes,
    EnsureCommits,
    CalculateGuruMetrics,
    PersistGuruMetrics,
    LinkIssues,
    LinkBugs,
    CalculateStructuralMetrics,
    PersistStructuralMetrics,
    // Dataset generation
    LoadDataset,
    ApplyCleaningRule,
    SelectFeatures,
    PersistDataset,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::PrepareRepository => "prepare_repository",
            StepKind::ResolveHashes => "resolve_hashes",
            StepKind::EnsureCommits => "ensure_commits",
            StepKind::CalculateGuruMetrics => "calculate_guru_metrics",
            StepKind::PersistGuruMetrics => "persist_guru_metrics",
            StepKind::LinkIssues => "link_issues",
            StepKind::LinkBugs => "link_bugs",
            StepKind::CalculateStructuralMetrics => "calculate_structural_metrics",
            StepKind::PersistStructuralMetrics => "persist_structural_metrics",
            StepKind::LoadDataset => "load_dataset",
            StepKind::ApplyCleaningRule => "apply_cleaning_rule",
            StepKind::SelectFeatures => "select_features",
            StepKind::PersistDataset => "persist_dataset",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "prepare_repository" => Ok(StepKind::PrepareRepository),
            "resolve_hashes" => Ok(StepKind::ResolveHashes),
            "ensure_commits" => Ok(StepKind::EnsureCommits),
            "calculate_guru_metrics" => Ok(StepKind::CalculateGuruMetrics),
            "persist_guru_metrics" => Ok(StepKind::PersistGuruMetrics),
            "link_issues" => Ok(StepKind::LinkIssues),
            "link_bugs" => Ok(StepKind::LinkBugs),
            "calculate_structural_metrics" => Ok(StepKind::CalculateStructuralMetrics),
            "persist_structural_metrics" => Ok(StepKind::PersistStructuralMetrics),
            "load_dataset" => Ok(StepKind::LoadDataset),
            "apply_cleaning_rule" => Ok(StepKind::ApplyCleaningRule),
            "select_features" => Ok(StepKind::SelectFeatures),
            "persist_dataset" => Ok(StepKind::PersistDataset),
            _ => Err(OrchestratorError::parse(format!("Invalid step kind: {}", s))),
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How target commits are named on the command line / in requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommitTarget {
    /// Full hash, abbreviated hash, branch or tag
    Rev { rev: String },
    /// Most recent commit strictly before a Unix timestamp (default branch)
    Before { timestamp: i64 },
}

impl CommitTarget {
    pub fn rev(rev: impl Into<String>) -> Self {
        Self::Rev { rev: rev.into() }
    }

    pub fn before(timestamp: i64) -> Self {
        Self::Before { timestamp }
    }
}

/// Ingestion strategy selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum IngestionMode {
    FullHistory,
    SingleCommit { targets: Vec<CommitTarget> },
}

impl IngestionMode {
    pub fn name(&self) -> &'static str {
        match self {
            IngestionMode::FullHistory => "full_history",
            IngestionMode::SingleCommit { .. } => "single_commit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobKind {
    Ingestion {
        repo_id: String,
        repo_url: String,
        mode: IngestionMode,
    },
    DatasetGeneration {
        dataset_id: String,
    },
}

/// Job state enum
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobState {
    Queued {
        queued_at: DateTime<Utc>,
        attempt: u32,
    },
    Running {
        started_at: DateTime<Utc>,
        worker_id: String,
        current_step: StepKind,
        attempt: u32,
    },
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        duration_ms: u64,
        steps_run: usize,
        steps_skipped: usize,
        warnings: Vec<String>,
    },
    Failed {
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
        error: String,
        error_category: ErrorCategory,
        failed_step: StepKind,
        attempt: u32,
    },
    Cancelled {
        cancelled_at: DateTime<Utc>,
        reason: String,
    },
}

impl JobState {
    pub fn state_name(&self) -> &'static str {
        match self {
            JobState::Queued { .. } => "queued",
            JobState::Running { .. } => "running",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
            JobState::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed { .. } | JobState::Failed { .. } | JobState::Cancelled { .. }
        )
    }
}

/// Job model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new_queued(kind: JobKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            state: JobState::Queued {
                queued_at: now,
                attempt: 1,
            },
            created_at: now,
            updated_at: now,
        }
    }

    /// Full-history ingestion of `repo_url`
    pub fn full_history(repo_id: impl Into<String>, repo_url: impl Into<String>) -> Self {
        Self::new_queued(JobKind::Ingestion {
            repo_id: repo_id.into(),
            repo_url: repo_url.into(),
            mode: IngestionMode::FullHistory,
        })
    }

    /// Ingestion restricted to `targets`
    pub fn single_commit(
        repo_id: impl Into<String>,
        repo_url: impl Into<String>,
        targets: Vec<CommitTarget>,
    ) -> Self {
        Self::new_queued(JobKind::Ingestion {
            repo_id: repo_id.into(),
            repo_url: repo_url.into(),
            mode: IngestionMode::SingleCommit { targets },
        })
    }

    pub fn dataset_generation(dataset_id: impl Into<String>) -> Self {
        Self::new_queued(JobKind::DatasetGeneration {
            dataset_id: dataset_id.into(),
        })
    }
}

/// Job state machine for transitions
pub struct JobStateMachine {
    job: Job,
}

impl JobStateMachine {
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn into_job(self) -> Job {
        self.job
    }

    fn invalid(&self, to: &str) -> OrchestratorError {
        OrchestratorError::InvalidStateTransition {
            from: self.job.state.state_name().to_string(),
            to: to.to_string(),
        }
    }

    /// Transition: QUEUED → RUNNING
    pub fn start(&mut self, worker_id: String, current_step: StepKind) -> Result<()> {
        match &self.job.state {
            JobState::Queued { attempt, .. } => {
                let now = Utc::now();
                self.job.state = JobState::Running {
                    started_at: now,
                    worker_id,
                    current_step,
                    attempt: *attempt,
                };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("running")),
        }
    }

    /// Transition: RUNNING → COMPLETED
    pub fn complete(
        &mut self,
        steps_run: usize,
        steps_skipped: usize,
        warnings: Vec<String>,
    ) -> Result<()> {
        match &self.job.state {
            JobState::Running { started_at, .. } => {
                let now = Utc::now();
                let duration_ms = (now - *started_at).num_milliseconds().max(0) as u64;

                self.job.state = JobState::Completed {
                    started_at: *started_at,
                    completed_at: now,
                    duration_ms,
                    steps_run,
                    steps_skipped,
                    warnings,
                };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("completed")),
        }
    }

    /// Transition: RUNNING → FAILED
    ///
    /// Failures are never retried automatically; the category tells an
    /// operator whether a manual re-run is worthwhile.
    pub fn fail(
        &mut self,
        error: String,
        error_category: ErrorCategory,
        failed_step: StepKind,
    ) -> Result<()> {
        match &self.job.state {
            JobState::Running {
                started_at,
                attempt,
                ..
            } => {
                let now = Utc::now();
                self.job.state = JobState::Failed {
                    started_at: *started_at,
                    failed_at: now,
                    error,
                    error_category,
                    failed_step,
                    attempt: *attempt,
                };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("failed")),
        }
    }

    /// Transition: FAILED → QUEUED (manual re-run, resumes from checkpoints)
    pub fn requeue(&mut self) -> Result<()> {
        match &self.job.state {
            JobState::Failed { attempt, .. } => {
                let now = Utc::now();
                self.job.state = JobState::Queued {
                    queued_at: now,
                    attempt: attempt + 1,
                };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("queued (re-run)")),
        }
    }

    /// Transition: * → CANCELLED
    pub fn cancel(&mut self, reason: String) -> Result<()> {
        if self.job.state.is_terminal() {
            return Err(self.invalid("cancelled"));
        }

        let now = Utc::now();
        self.job.state = JobState::Cancelled {
            cancelled_at: now,
            reason,
        };
        self.job.updated_at = now;
        Ok(())
    }

    /// Update current step (for running jobs)
    pub fn update_step(&mut self, step: StepKind) -> Result<()> {
        match &mut self.job.state {
            JobState::Running { current_step, .. } => {
                *current_step = step;
                self.job.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(self.invalid("update_step")),
        }
    }
}
