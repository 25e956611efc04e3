use crate::error::Result;
use crate::ingestion::IngestionContext;
use crate::job::{IngestionMode, StepKind};
use crate::pipeline::PipelineStep;
use async_trait::async_trait;
use jitmine_core::features::guru_metrics::CommitGuruMetrics;
use jitmine_core::CommitHash;
use std::collections::HashMap;
use tracing::{debug, info};

/// Compute history-derived metrics
///
/// Full history: every commit reachable from the default branch, and those
/// commits become the run's targets. Single commit: each target is computed
/// over its own ancestry so the experience/age metrics see prior history.
pub struct CalculateGuruMetrics;

#[async_trait]
impl PipelineStep<IngestionContext> for CalculateGuruMetrics {
    fn kind(&self) -> StepKind {
        StepKind::CalculateGuruMetrics
    }

    fn completed_by(&self) -> Option<StepKind> {
        Some(StepKind::PersistGuruMetrics)
    }

    fn interruptible(&self) -> bool {
        true
    }

    async fn execute(&self, mut ctx: IngestionContext) -> Result<IngestionContext> {
        let calculator = ctx.services.calculator.clone();
        let rows = match &ctx.mode {
            IngestionMode::FullHistory => {
                let history = ctx.vcs().log_with_numstat(ctx.head()).await?;
                let rows = calculator.calculate(&history);
                ctx.targets = rows.iter().map(|r| r.commit_hash.clone()).collect();
                rows
            }
            IngestionMode::SingleCommit { .. } => {
                let mut rows: Vec<CommitGuruMetrics> = Vec::with_capacity(ctx.targets.len());
                for target in &ctx.targets {
                    let history = ctx.vcs().log_with_numstat(target.as_str()).await?;
                    if let Some(row) = calculator
                        .calculate(&history)
                        .into_iter()
                        .find(|r| &r.commit_hash == target)
                    {
                        rows.push(row);
                    }
                }
                rows
            }
        };

        info!(
            "Job {}: computed guru metrics for {} commit(s)",
            ctx.job_id,
            rows.len()
        );
        ctx.guru_rows = rows;
        Ok(ctx)
    }

    async fn rehydrate(&self, mut ctx: IngestionContext) -> Result<IngestionContext> {
        let stored = ctx.store().load_guru_metrics(&ctx.repo_id).await?;
        ctx.guru_rows = match &ctx.mode {
            IngestionMode::FullHistory => {
                ctx.targets = stored.iter().map(|r| r.commit_hash.clone()).collect();
                stored
            }
            IngestionMode::SingleCommit { .. } => stored
                .into_iter()
                .filter(|r| ctx.targets.contains(&r.commit_hash))
                .collect(),
        };
        Ok(ctx)
    }
}

/// Upsert the computed rows
///
/// Bug labels already stored for a commit are carried onto its recomputed
/// row; a single-commit run must not erase what earlier fixes established.
pub struct PersistGuruMetrics;

#[async_trait]
impl PipelineStep<IngestionContext> for PersistGuruMetrics {
    fn kind(&self) -> StepKind {
        StepKind::PersistGuruMetrics
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn records_written(&self, ctx: &IngestionContext) -> usize {
        ctx.guru_rows.len()
    }

    async fn execute(&self, mut ctx: IngestionContext) -> Result<IngestionContext> {
        let stored: HashMap<CommitHash, CommitGuruMetrics> = ctx
            .store()
            .load_guru_metrics(&ctx.repo_id)
            .await?
            .into_iter()
            .map(|r| (r.commit_hash.clone(), r))
            .collect();
        let mut carried = 0;
        for row in ctx.guru_rows.iter_mut() {
            if let Some(previous) = stored.get(&row.commit_hash) {
                row.carry_labels_from(previous);
                carried += usize::from(row.contains_bug);
            }
        }
        if carried > 0 {
            debug!(
                "Job {}: kept bug labels of {} previously mined commit(s)",
                ctx.job_id, carried
            );
        }

        ctx.store()
            .save_guru_metrics(&ctx.repo_id, &ctx.guru_rows)
            .await?;
        Ok(ctx)
    }
}
