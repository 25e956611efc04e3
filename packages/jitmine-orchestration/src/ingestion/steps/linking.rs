use crate::error::Result;
use crate::ingestion::IngestionContext;
use crate::job::StepKind;
use crate::pipeline::PipelineStep;
use async_trait::async_trait;
use jitmine_core::features::bug_linking::SzzLabeler;
use jitmine_core::features::guru_metrics::CommitGuruMetrics;
use std::collections::HashMap;
use tracing::info;

/// Fetch bug issues and link fix commits to them
///
/// Writes the fix → issue linkages and the `fixes` field of the guru rows.
pub struct LinkIssues;

#[async_trait]
impl PipelineStep<IngestionContext> for LinkIssues {
    fn kind(&self) -> StepKind {
        StepKind::LinkIssues
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn records_written(&self, ctx: &IngestionContext) -> usize {
        ctx.linkages.len()
    }

    async fn execute(&self, mut ctx: IngestionContext) -> Result<IngestionContext> {
        let issues: Vec<_> = ctx
            .services
            .issue_tracker
            .fetch_issues()
            .await?
            .into_iter()
            .filter(|issue| issue.has_any_label(&ctx.services.bug_labels))
            .collect();
        ctx.note(format!("Fetched {} bug issue(s)", issues.len()));

        let linker = ctx.services.linker.clone();
        let linkages = linker.link(&mut ctx.guru_rows, &issues);
        info!(
            "Job {}: {} fix commit(s) linked ({} issue(s))",
            ctx.job_id,
            linkages.len(),
            issues.len()
        );

        ctx.store()
            .save_bug_linkages(&ctx.repo_id, &linkages)
            .await?;
        ctx.store()
            .save_guru_metrics(&ctx.repo_id, &ctx.guru_rows)
            .await?;
        ctx.linkages = linkages;
        Ok(ctx)
    }

    async fn rehydrate(&self, mut ctx: IngestionContext) -> Result<IngestionContext> {
        let stored = ctx.store().load_bug_linkages(&ctx.repo_id).await?;
        ctx.linkages = stored
            .into_iter()
            .filter(|l| ctx.guru_rows.iter().any(|r| r.commit_hash == l.fix_hash))
            .collect();
        Ok(ctx)
    }
}

/// SZZ labelling of bug-inducing commits
///
/// Labels land on every stored row of the repository, not only the rows of
/// this run: a fix found by a single-commit run can blame older commits
/// mined earlier.
pub struct LinkBugs;

#[async_trait]
impl PipelineStep<IngestionContext> for LinkBugs {
    fn kind(&self) -> StepKind {
        StepKind::LinkBugs
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn interruptible(&self) -> bool {
        true
    }

    fn records_written(&self, ctx: &IngestionContext) -> usize {
        ctx.guru_rows.iter().filter(|r| r.contains_bug).count()
    }

    async fn execute(&self, mut ctx: IngestionContext) -> Result<IngestionContext> {
        let mut rows = ctx.store().load_guru_metrics(&ctx.repo_id).await?;
        let before: HashMap<_, _> = rows
            .iter()
            .map(|r| (r.commit_hash.clone(), r.fixing_commits.clone()))
            .collect();

        let labelled = SzzLabeler::label(ctx.vcs(), &mut rows, &ctx.linkages).await?;

        let changed: Vec<CommitGuruMetrics> = rows
            .iter()
            .filter(|r| before.get(&r.commit_hash) != Some(&r.fixing_commits))
            .cloned()
            .collect();
        if !changed.is_empty() {
            ctx.store()
                .save_guru_metrics(&ctx.repo_id, &changed)
                .await?;
        }
        info!(
            "Job {}: {} commit(s) newly labelled bug-inducing",
            ctx.job_id, labelled
        );

        refresh_rows(&mut ctx, rows);
        Ok(ctx)
    }

    async fn rehydrate(&self, mut ctx: IngestionContext) -> Result<IngestionContext> {
        let rows = ctx.store().load_guru_metrics(&ctx.repo_id).await?;
        refresh_rows(&mut ctx, rows);
        Ok(ctx)
    }
}

/// Replace the context rows with their stored (labelled) versions
fn refresh_rows(ctx: &mut IngestionContext, stored: Vec<CommitGuruMetrics>) {
    let mut by_hash: HashMap<_, _> = stored
        .into_iter()
        .map(|r| (r.commit_hash.clone(), r))
        .collect();
    for row in ctx.guru_rows.iter_mut() {
        if let Some(fresh) = by_hash.remove(&row.commit_hash) {
            *row = fresh;
        }
    }
}
