//! Step pipelines
//!
//! A pipeline is an ordered list of steps over an owned context. Each step
//! takes the context by value and hands back the (possibly enriched) one,
//! so step i+1 always sees what step i produced.
//!
//! Durable steps (the ones that write to a store) are checkpointed after
//! they succeed. When a job is re-run, a step whose checkpoint is present is
//! not executed again; it only rehydrates the context from the store.

use crate::checkpoint::{Checkpoint, CheckpointManager, StepOutcome};
use crate::error::{OrchestratorError, Result};
use crate::job::{JobStateMachine, StepKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════════
// Progress
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub job_id: Uuid,
    pub message: String,
    /// Overall job progress; `None` for messages emitted inside a step
    pub percent: Option<u8>,
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Progress as `info!` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn report(&self, update: ProgressUpdate) {
        match update.percent {
            Some(percent) => info!("Job {}: [{:>3}%] {}", update.job_id, percent, update.message),
            None => info!("Job {}: {}", update.job_id, update.message),
        }
    }
}

/// Progress forwarded to an unbounded channel (UI / API consumers)
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelProgressSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn report(&self, update: ProgressUpdate) {
        if self.tx.send(update).is_err() {
            debug!("Progress receiver dropped");
        }
    }
}

/// Keeps every update in memory
#[derive(Debug, Default)]
pub struct RecordingProgressSink {
    updates: Mutex<Vec<ProgressUpdate>>,
}

impl RecordingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.updates.lock().iter().map(|u| u.message.clone()).collect()
    }
}

impl ProgressSink for RecordingProgressSink {
    fn report(&self, update: ProgressUpdate) {
        self.updates.lock().push(update);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Steps
// ═══════════════════════════════════════════════════════════════════════════

/// One unit of work over a pipeline context
#[async_trait]
pub trait PipelineStep<C: Send + 'static>: Send + Sync {
    fn kind(&self) -> StepKind;

    /// Display name (progress messages, logs)
    fn name(&self) -> String {
        self.kind().as_str().to_string()
    }

    /// Writes to a store; checkpointed after success
    fn is_durable(&self) -> bool {
        false
    }

    /// Checkpoint that makes executing this step unnecessary
    fn completed_by(&self) -> Option<StepKind> {
        if self.is_durable() {
            Some(self.kind())
        } else {
            None
        }
    }

    /// Execution may be abandoned mid-step on cancellation
    ///
    /// Only for steps whose side effects are limited to subprocesses
    /// (which die with the dropped future) and idempotent writes.
    fn interruptible(&self) -> bool {
        false
    }

    /// Record count stored in the checkpoint of a durable step
    fn records_written(&self, _ctx: &C) -> usize {
        0
    }

    async fn execute(&self, ctx: C) -> Result<C>;

    /// Restore what `execute` would have put in the context, from the store
    async fn rehydrate(&self, ctx: C) -> Result<C> {
        Ok(ctx)
    }
}

/// Per-run services shared by all steps of one pipeline run
#[derive(Clone)]
pub struct RunControl {
    pub job_id: Uuid,
    pub progress: Arc<dyn ProgressSink>,
    pub cancel: CancellationToken,
    pub checkpoints: CheckpointManager,
}

impl RunControl {
    pub fn report(&self, message: impl Into<String>, percent: Option<u8>) {
        self.progress.report(ProgressUpdate {
            job_id: self.job_id,
            message: message.into(),
            percent,
        });
    }
}

/// Error plus the step it happened in
#[derive(Debug)]
pub struct StepFailure {
    pub step: StepKind,
    pub error: OrchestratorError,
}

impl StepFailure {
    pub fn new(step: StepKind, error: impl Into<OrchestratorError>) -> Self {
        Self {
            step,
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps_run: usize,
    pub steps_skipped: usize,
}

/// Ordered step list over context `C`
pub struct StepPipeline<C: Send + 'static> {
    name: String,
    steps: Vec<Box<dyn PipelineStep<C>>>,
}

impl<C: Send + 'static> StepPipeline<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: impl PipelineStep<C> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn push(&mut self, step: Box<dyn PipelineStep<C>>) {
        self.steps.push(step);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(|s| s.kind()).collect()
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order, threading the context through
    pub async fn run(
        &self,
        mut ctx: C,
        control: &RunControl,
        sm: &mut JobStateMachine,
    ) -> std::result::Result<(C, RunSummary), StepFailure> {
        let job_id = control.job_id;
        let Some(first) = self.steps.first().map(|s| s.kind()) else {
            return Ok((ctx, RunSummary::default()));
        };

        let completed = control
            .checkpoints
            .completed_steps(job_id)
            .await
            .map_err(|e| StepFailure::new(first, e))?;
        if !completed.is_empty() {
            info!(
                "Job {}: Resuming from checkpoint - {} steps already completed: {:?}",
                job_id,
                completed.len(),
                completed
            );
        }

        let total = self.steps.len();
        let mut summary = RunSummary::default();

        for (i, step) in self.steps.iter().enumerate() {
            let kind = step.kind();
            let name = step.name();

            if control.cancel.is_cancelled() {
                return Err(StepFailure::new(
                    kind,
                    OrchestratorError::Cancelled(format!("cancelled before {}", name)),
                ));
            }
            sm.update_step(kind).map_err(|e| StepFailure::new(kind, e))?;
            let percent = (i * 100 / total) as u8;

            if step.completed_by().is_some_and(|k| completed.contains(&k)) {
                control.report(format!("Skipping {} (already persisted)", name), Some(percent));
                ctx = step
                    .rehydrate(ctx)
                    .await
                    .map_err(|e| StepFailure::new(kind, e))?;
                summary.steps_skipped += 1;
                continue;
            }

            control.report(format!("Running {}", name), Some(percent));
            let start = Instant::now();

            let result = if step.interruptible() {
                tokio::select! {
                    biased;
                    _ = control.cancel.cancelled() => Err(OrchestratorError::Cancelled(
                        format!("cancelled during {}", name),
                    )),
                    result = step.execute(ctx) => result,
                }
            } else {
                step.execute(ctx).await
            };

            ctx = match result {
                Ok(ctx) => ctx,
                Err(e) => {
                    error!("Job {}: Step {} failed: {}", job_id, name, e);
                    return Err(StepFailure::new(kind, e));
                }
            };

            if step.is_durable() {
                let outcome = StepOutcome::new(kind, step.records_written(&ctx));
                let checkpoint =
                    Checkpoint::from_outcome(job_id, &outcome).map_err(|e| StepFailure::new(kind, e))?;
                control
                    .checkpoints
                    .save_checkpoint(checkpoint)
                    .await
                    .map_err(|e| StepFailure::new(kind, e))?;
            }

            info!(
                "Job {}: Step {} completed in {}ms",
                job_id,
                name,
                start.elapsed().as_millis()
            );
            summary.steps_run += 1;
        }

        Ok((ctx, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;

    /// Context that records which steps touched it
    #[derive(Debug, Default)]
    struct Trace {
        seen: Vec<String>,
        rehydrated: Vec<String>,
    }

    struct Append {
        kind: StepKind,
        durable: bool,
        fail: bool,
    }

    impl Append {
        fn new(kind: StepKind) -> Self {
            Self {
                kind,
                durable: false,
                fail: false,
            }
        }

        fn durable(mut self) -> Self {
            self.durable = true;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    #[async_trait]
    impl PipelineStep<Trace> for Append {
        fn kind(&self) -> StepKind {
            self.kind
        }

        fn is_durable(&self) -> bool {
            self.durable
        }

        fn records_written(&self, ctx: &Trace) -> usize {
            ctx.seen.len()
        }

        async fn execute(&self, mut ctx: Trace) -> Result<Trace> {
            if self.fail {
                return Err(OrchestratorError::Config("boom".to_string()));
            }
            ctx.seen.push(self.kind.to_string());
            Ok(ctx)
        }

        async fn rehydrate(&self, mut ctx: Trace) -> Result<Trace> {
            ctx.rehydrated.push(self.kind.to_string());
            Ok(ctx)
        }
    }

    fn running_job() -> JobStateMachine {
        let mut sm = JobStateMachine::new(Job::dataset_generation("ds"));
        sm.start("worker-test".to_string(), StepKind::LoadDataset)
            .unwrap();
        sm
    }

    fn control(job_id: Uuid, sink: Arc<RecordingProgressSink>) -> RunControl {
        RunControl {
            job_id,
            progress: sink,
            cancel: CancellationToken::new(),
            checkpoints: CheckpointManager::new_in_memory(),
        }
    }

    #[tokio::test]
    async fn test_context_flows_through_steps_in_order() {
        let mut sm = running_job();
        let sink = Arc::new(RecordingProgressSink::new());
        let control = control(sm.job().id, sink.clone());

        let pipeline = StepPipeline::new("trace")
            .with_step(Append::new(StepKind::ResolveHashes))
            .with_step(Append::new(StepKind::EnsureCommits))
            .with_step(Append::new(StepKind::LinkBugs));

        let (ctx, summary) = pipeline.run(Trace::default(), &control, &mut sm).await.unwrap();
        assert_eq!(ctx.seen, vec!["resolve_hashes", "ensure_commits", "link_bugs"]);
        assert_eq!(summary.steps_run, 3);

        let percents: Vec<_> = sink.updates().iter().map(|u| u.percent).collect();
        assert_eq!(percents, vec![Some(0), Some(33), Some(66)]);
    }

    #[tokio::test]
    async fn test_failure_stops_pipeline_and_names_step() {
        let mut sm = running_job();
        let sink = Arc::new(RecordingProgressSink::new());
        let control = control(sm.job().id, sink.clone());

        let pipeline = StepPipeline::new("trace")
            .with_step(Append::new(StepKind::ResolveHashes))
            .with_step(Append::new(StepKind::EnsureCommits).failing())
            .with_step(Append::new(StepKind::LinkBugs));

        let failure = pipeline
            .run(Trace::default(), &control, &mut sm)
            .await
            .unwrap_err();
        assert_eq!(failure.step, StepKind::EnsureCommits);
        assert_eq!(sink.updates().len(), 2);
    }

    #[tokio::test]
    async fn test_checkpointed_steps_rehydrate_instead_of_running() {
        let mut sm = running_job();
        let job_id = sm.job().id;
        let sink = Arc::new(RecordingProgressSink::new());
        let control = control(job_id, sink);

        let pipeline = StepPipeline::new("trace")
            .with_step(Append::new(StepKind::PersistGuruMetrics).durable())
            .with_step(Append::new(StepKind::LinkIssues).durable().failing());

        // First run: persist step checkpointed, link step fails
        assert!(pipeline.run(Trace::default(), &control, &mut sm).await.is_err());
        let completed = control.checkpoints.completed_steps(job_id).await.unwrap();
        assert!(completed.contains(&StepKind::PersistGuruMetrics));
        assert!(!completed.contains(&StepKind::LinkIssues));

        let pipeline = StepPipeline::new("trace")
            .with_step(Append::new(StepKind::PersistGuruMetrics).durable())
            .with_step(Append::new(StepKind::LinkIssues).durable());
        let (ctx, summary) = pipeline.run(Trace::default(), &control, &mut sm).await.unwrap();
        assert_eq!(ctx.rehydrated, vec!["persist_guru_metrics"]);
        assert_eq!(ctx.seen, vec!["link_issues"]);
        assert_eq!(summary, RunSummary { steps_run: 1, steps_skipped: 1 });
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_next_step() {
        let mut sm = running_job();
        let sink = Arc::new(RecordingProgressSink::new());
        let control = control(sm.job().id, sink.clone());
        control.cancel.cancel();

        let pipeline = StepPipeline::new("trace").with_step(Append::new(StepKind::ResolveHashes));
        let failure = pipeline
            .run(Trace::default(), &control, &mut sm)
            .await
            .unwrap_err();
        assert!(failure.error.is_cancelled());
        assert!(sink.updates().is_empty());
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_updates() {
        let (sink, mut rx) = ChannelProgressSink::new();
        let job_id = Uuid::new_v4();
        sink.report(ProgressUpdate {
            job_id,
            message: "Running link_bugs".to_string(),
            percent: Some(50),
        });
        let update = rx.recv().await.unwrap();
        assert_eq!(update.job_id, job_id);
        assert_eq!(update.percent, Some(50));
    }
}
