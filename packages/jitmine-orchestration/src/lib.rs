/*
 * jitmine-orchestration - Mining job orchestration
 *
 * Drives repositories through ingestion and datasets through generation.
 *
 * Architecture:
 * - Job State Machine (queued / running / completed / failed / cancelled)
 * - Ordered step pipelines with checkpoint/resume
 * - Ingestion strategies (full history, single commit)
 * - Dataset generation (cleaning rules + feature selection)
 * - Per-repository locking, bounded feature-selection worker pool
 */

// Public modules
pub mod checkpoint;
pub mod dataset;
pub mod error;
pub mod ingestion;
pub mod job;
pub mod locks;
pub mod orchestrator;
pub mod pipeline;
pub mod worker_pool;

// Re-exports
pub use checkpoint::{Checkpoint, CheckpointManager, StepOutcome};
pub use dataset::{DatasetContext, DatasetServices};
pub use error::{ErrorCategory, ExternalToolError, OrchestratorError, Result};
pub use ingestion::{
    ConfiguredServiceFactory, IngestionContext, IngestionServices, IngestionStrategy,
    ServiceFactory,
};
pub use job::{CommitTarget, IngestionMode, Job, JobKind, JobState, JobStateMachine, StepKind};
pub use locks::RepositoryLocks;
pub use orchestrator::Orchestrator;
pub use pipeline::{
    ChannelProgressSink, PipelineStep, ProgressSink, ProgressUpdate, RecordingProgressSink,
    RunControl, RunSummary, StepFailure, StepPipeline, TracingProgressSink,
};
pub use worker_pool::FeatureSelectionPool;
