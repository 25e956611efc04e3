use super::DatasetContext;
use crate::error::Result;
use crate::job::StepKind;
use crate::pipeline::PipelineStep;
use async_trait::async_trait;
use jitmine_core::CleaningRule;
use tracing::debug;

/// One configured cleaning rule
pub struct CleaningStep {
    position: usize,
    rule: CleaningRule,
}

impl CleaningStep {
    pub fn new(position: usize, rule: CleaningRule) -> Self {
        Self { position, rule }
    }
}

#[async_trait]
impl PipelineStep<DatasetContext> for CleaningStep {
    fn kind(&self) -> StepKind {
        StepKind::ApplyCleaningRule
    }

    fn name(&self) -> String {
        format!("cleaning[{}]:{}", self.position, self.rule.name())
    }

    async fn execute(&self, mut ctx: DatasetContext) -> Result<DatasetContext> {
        let (rows, cols) = (ctx.frame.n_rows(), ctx.frame.n_cols());
        let frame = std::mem::take(&mut ctx.frame);
        ctx.frame = self.rule.apply(frame, &ctx.config.target_column)?;
        debug!(
            "Job {}: {} {}x{} -> {}x{}",
            ctx.job_id,
            self.rule.name(),
            rows,
            cols,
            ctx.frame.n_rows(),
            ctx.frame.n_cols()
        );
        Ok(ctx)
    }
}
