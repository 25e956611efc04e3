use crate::error::Result;
use crate::ingestion::IngestionContext;
use crate::job::StepKind;
use crate::pipeline::PipelineStep;
use async_trait::async_trait;
use tracing::{debug, info};

/// Run the structural-metrics tool on each target commit
///
/// Each target is force-checked-out first; the caller holds the repository
/// lock for the whole run, so the working copy cannot move underneath the
/// tool. Any tool failure fails the step.
pub struct CalculateStructuralMetrics;

#[async_trait]
impl PipelineStep<IngestionContext> for CalculateStructuralMetrics {
    fn kind(&self) -> StepKind {
        StepKind::CalculateStructuralMetrics
    }

    fn completed_by(&self) -> Option<StepKind> {
        Some(StepKind::PersistStructuralMetrics)
    }

    fn interruptible(&self) -> bool {
        true
    }

    async fn execute(&self, mut ctx: IngestionContext) -> Result<IngestionContext> {
        let repo_dir = ctx.vcs().repo_path().to_path_buf();
        let total = ctx.targets.len();
        let mut tables = Vec::with_capacity(total);

        for (i, commit) in ctx.targets.iter().enumerate() {
            ctx.vcs().checkout(commit, true).await?;
            let table = ctx.services.metrics_runner.run(&repo_dir, commit).await?;
            debug!(
                "Job {}: [{}/{}] {} -> {} entities",
                ctx.job_id,
                i + 1,
                total,
                commit.short(),
                table.rows.len()
            );
            tables.push(table);
        }

        info!(
            "Job {}: structural metrics computed for {} commit(s)",
            ctx.job_id,
            tables.len()
        );
        ctx.structural = tables;
        Ok(ctx)
    }

    async fn rehydrate(&self, mut ctx: IngestionContext) -> Result<IngestionContext> {
        let stored = ctx.store().load_structural_metrics(&ctx.repo_id).await?;
        ctx.structural = stored
            .into_iter()
            .filter(|t| ctx.targets.contains(&t.commit_hash))
            .collect();
        Ok(ctx)
    }
}

pub struct PersistStructuralMetrics;

#[async_trait]
impl PipelineStep<IngestionContext> for PersistStructuralMetrics {
    fn kind(&self) -> StepKind {
        StepKind::PersistStructuralMetrics
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn records_written(&self, ctx: &IngestionContext) -> usize {
        ctx.structural.len()
    }

    async fn execute(&self, ctx: IngestionContext) -> Result<IngestionContext> {
        for table in &ctx.structural {
            ctx.store()
                .save_structural_metrics(&ctx.repo_id, table)
                .await?;
        }
        Ok(ctx)
    }
}
