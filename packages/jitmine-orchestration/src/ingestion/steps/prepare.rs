use crate::error::Result;
use crate::ingestion::IngestionContext;
use crate::job::StepKind;
use crate::pipeline::PipelineStep;
use async_trait::async_trait;
use tracing::info;

/// Clone the repository, or fetch into the existing working copy
pub struct PrepareRepository;

#[async_trait]
impl PipelineStep<IngestionContext> for PrepareRepository {
    fn kind(&self) -> StepKind {
        StepKind::PrepareRepository
    }

    fn interruptible(&self) -> bool {
        true
    }

    async fn execute(&self, mut ctx: IngestionContext) -> Result<IngestionContext> {
        ctx.vcs().clone_or_fetch(&ctx.repo_url).await?;
        let branch = ctx.vcs().default_branch().await?;
        info!(
            "Job {}: {} ready at {} (default branch {})",
            ctx.job_id,
            ctx.repo_id,
            ctx.vcs().repo_path().display(),
            branch
        );
        ctx.head_ref = Some(branch);
        Ok(ctx)
    }
}
