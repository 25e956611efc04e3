use crate::checkpoint::CheckpointManager;
use crate::dataset::{self, DatasetServices};
use crate::error::{OrchestratorError, Result};
use crate::ingestion::{IngestionContext, IngestionStrategy, ServiceFactory};
use crate::job::{IngestionMode, Job, JobKind, JobState, JobStateMachine, StepKind};
use crate::locks::RepositoryLocks;
use crate::pipeline::{ProgressSink, RunControl, RunSummary, StepFailure, TracingProgressSink};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What a successful pipeline run hands back to the job
struct RunOutcome {
    summary: RunSummary,
    warnings: Vec<String>,
}

/// Runs ingestion and dataset-generation jobs to a terminal state
///
/// Jobs for the same repository are serialized; everything else runs
/// concurrently. Failed jobs passed back in are re-queued and resume from
/// their checkpoints.
pub struct Orchestrator {
    ingestion: Arc<dyn ServiceFactory>,
    datasets: Arc<DatasetServices>,
    checkpoints: CheckpointManager,
    locks: RepositoryLocks,
    progress: Arc<dyn ProgressSink>,
    worker_id: String,
}

impl Orchestrator {
    pub fn new(ingestion: Arc<dyn ServiceFactory>, datasets: Arc<DatasetServices>) -> Self {
        Self {
            ingestion,
            datasets,
            checkpoints: CheckpointManager::new_in_memory(),
            locks: RepositoryLocks::new(),
            progress: Arc::new(TracingProgressSink),
            worker_id: format!("worker-{}", Uuid::new_v4()),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Share checkpoints with another orchestrator (or a previous run)
    pub fn with_checkpoints(mut self, checkpoints: CheckpointManager) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Execute a job (main entry point)
    ///
    /// Pipeline errors end up in the returned job's state; `Err` means the
    /// job itself could not be driven (e.g. it is already terminal).
    pub async fn run_job(&self, job: Job, cancel: CancellationToken) -> Result<Job> {
        let job_id = job.id;
        let start_time = Instant::now();

        let mut sm = JobStateMachine::new(job);
        if let JobState::Failed { attempt, .. } = &sm.job().state {
            info!("Job {}: re-running after failed attempt {}", job_id, attempt);
            sm.requeue()?;
        }

        let kind = sm.job().kind.clone();
        let first_step = match &kind {
            JobKind::Ingestion { .. } => StepKind::PrepareRepository,
            JobKind::DatasetGeneration { .. } => StepKind::LoadDataset,
        };
        sm.start(self.worker_id.clone(), first_step)?;

        let control = RunControl {
            job_id,
            progress: self.progress.clone(),
            cancel,
            checkpoints: self.checkpoints.clone(),
        };

        let result = match kind {
            JobKind::Ingestion {
                repo_id,
                repo_url,
                mode,
            } => {
                info!(
                    "Starting job {} for repo {} ({}, {})",
                    job_id,
                    repo_id,
                    repo_url,
                    mode.name()
                );
                self.run_ingestion(&repo_id, &repo_url, mode, &control, &mut sm)
                    .await
            }
            JobKind::DatasetGeneration { dataset_id } => {
                info!("Starting job {} for dataset {}", job_id, dataset_id);
                self.run_dataset(&dataset_id, &control, &mut sm).await
            }
        };

        match result {
            Ok(outcome) => {
                info!(
                    "Job {} completed successfully - {} steps run, {} skipped, {} warnings in {}ms",
                    job_id,
                    outcome.summary.steps_run,
                    outcome.summary.steps_skipped,
                    outcome.warnings.len(),
                    start_time.elapsed().as_millis()
                );
                sm.complete(
                    outcome.summary.steps_run,
                    outcome.summary.steps_skipped,
                    outcome.warnings,
                )?;

                // Cleanup checkpoints on success
                self.checkpoints.delete_job_checkpoints(job_id).await?;
                control.report("Completed", Some(100));
            }
            Err(StepFailure { error, .. }) if error.is_cancelled() => {
                warn!("Job {} cancelled: {}", job_id, error);
                sm.cancel(error.to_string())?;
                control.report(format!("Cancelled: {}", error), None);
            }
            Err(StepFailure { step, error }) => {
                let category = error.category();
                error!(
                    "Job {} failed at {} ({}): {}",
                    job_id, step, category, error
                );
                sm.fail(error.to_string(), category, step)?;
                control.report(format!("Failed at {}: {}", step, error), None);
            }
        }

        Ok(sm.into_job())
    }

    /// Run several jobs concurrently; results keep the input order
    pub async fn run_jobs(&self, jobs: Vec<(Job, CancellationToken)>) -> Vec<Result<Job>> {
        join_all(
            jobs.into_iter()
                .map(|(job, cancel)| self.run_job(job, cancel)),
        )
        .await
    }

    async fn run_ingestion(
        &self,
        repo_id: &str,
        repo_url: &str,
        mode: IngestionMode,
        control: &RunControl,
        sm: &mut JobStateMachine,
    ) -> std::result::Result<RunOutcome, StepFailure> {
        let strategy = IngestionStrategy::for_mode(&mode);
        let pipeline = strategy
            .pipeline()
            .map_err(|e| StepFailure::new(StepKind::PrepareRepository, e))?;
        let services = self
            .ingestion
            .services_for(repo_id, repo_url)
            .map_err(|e| StepFailure::new(StepKind::PrepareRepository, e))?;

        // Held for the whole run: steps share the working copy and its checkout
        let _guard = match self.locks.try_acquire(repo_id) {
            Some(guard) => guard,
            None => {
                control.report(format!("Waiting for repository {}", repo_id), None);
                tokio::select! {
                    biased;
                    _ = control.cancel.cancelled() => {
                        return Err(StepFailure::new(
                            StepKind::PrepareRepository,
                            OrchestratorError::Cancelled(format!(
                                "cancelled while waiting for repository {}",
                                repo_id
                            )),
                        ));
                    }
                    guard = self.locks.acquire(repo_id) => guard,
                }
            }
        };

        let ctx = IngestionContext::new(
            control.job_id,
            repo_id,
            repo_url,
            mode,
            Arc::new(services),
            control.progress.clone(),
        );
        let (ctx, summary) = pipeline.run(ctx, control, sm).await?;

        Ok(RunOutcome {
            summary,
            warnings: ctx.warnings,
        })
    }

    async fn run_dataset(
        &self,
        dataset_id: &str,
        control: &RunControl,
        sm: &mut JobStateMachine,
    ) -> std::result::Result<RunOutcome, StepFailure> {
        control.report(format!("Loading dataset {}", dataset_id), Some(0));
        let ctx = dataset::load_context(
            control.job_id,
            dataset_id,
            self.datasets.clone(),
            control.progress.clone(),
        )
        .await
        .map_err(|e| StepFailure::new(StepKind::LoadDataset, e))?;

        dataset::preflight(&ctx).map_err(|e| StepFailure::new(StepKind::SelectFeatures, e))?;

        let pipeline = dataset::dataset_pipeline(&ctx.config);
        let (ctx, mut summary) = pipeline.run(ctx, control, sm).await?;

        if control.cancel.is_cancelled() {
            return Err(StepFailure::new(
                StepKind::PersistDataset,
                OrchestratorError::Cancelled("cancelled before persist_dataset".to_string()),
            ));
        }
        sm.update_step(StepKind::PersistDataset)
            .map_err(|e| StepFailure::new(StepKind::PersistDataset, e))?;
        control.report(format!("Storing dataset {}", dataset_id), Some(99));
        dataset::persist_dataset(&ctx)
            .await
            .map_err(|e| StepFailure::new(StepKind::PersistDataset, e))?;

        // load + persist bracket the pipeline steps
        summary.steps_run += 2;
        Ok(RunOutcome {
            summary,
            warnings: ctx.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::IngestionServices;
    use jitmine_storage::{InMemoryArtifactStore, InMemoryMetricsStore};

    fn orchestrator(factory: impl ServiceFactory + 'static) -> Orchestrator {
        let store = Arc::new(InMemoryMetricsStore::new());
        let datasets = DatasetServices::new(
            store.clone(),
            store,
            Arc::new(InMemoryArtifactStore::new()),
            1,
        )
        .unwrap();
        Orchestrator::new(Arc::new(factory), Arc::new(datasets))
    }

    fn unreachable_repo(_: &str, _: &str) -> Result<IngestionServices> {
        Err(OrchestratorError::Config("no such repository".to_string()))
    }

    #[tokio::test]
    async fn test_service_failure_fails_job_at_first_step() {
        let orch = orchestrator(unreachable_repo);
        let job = orch
            .run_job(
                Job::full_history("r", "https://example.com/r.git"),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        match job.state {
            JobState::Failed {
                failed_step,
                attempt,
                ..
            } => {
                assert_eq!(failed_step, StepKind::PrepareRepository);
                assert_eq!(attempt, 1);
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_job_is_requeued_with_next_attempt() {
        let orch = orchestrator(unreachable_repo);
        let job = orch
            .run_job(Job::full_history("r", "u"), CancellationToken::new())
            .await
            .unwrap();
        let job = orch.run_job(job, CancellationToken::new()).await.unwrap();
        assert!(matches!(job.state, JobState::Failed { attempt: 2, .. }));
    }

    #[tokio::test]
    async fn test_terminal_job_is_rejected() {
        let orch = orchestrator(unreachable_repo);
        let mut sm = JobStateMachine::new(Job::dataset_generation("ds"));
        sm.cancel("operator".to_string()).unwrap();

        let err = orch
            .run_job(sm.into_job(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn test_unknown_dataset_fails_at_load() {
        let orch = orchestrator(unreachable_repo);
        let job = orch
            .run_job(Job::dataset_generation("nope"), CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(
            job.state,
            JobState::Failed {
                failed_step: StepKind::LoadDataset,
                ..
            }
        ));
    }
}
