use crate::error::{OrchestratorError, Result};
use crate::ingestion::IngestionContext;
use crate::job::{CommitTarget, IngestionMode, StepKind};
use crate::pipeline::PipelineStep;
use async_trait::async_trait;
use jitmine_core::CommitHash;
use tracing::{debug, info};

/// Turn the requested targets into full commit hashes
///
/// Full hashes are taken as-is (they may not be local yet); anything else
/// goes through the working copy. A timestamp with no earlier commit is a
/// warning, not a failure.
pub struct ResolveHashes;

#[async_trait]
impl PipelineStep<IngestionContext> for ResolveHashes {
    fn kind(&self) -> StepKind {
        StepKind::ResolveHashes
    }

    async fn execute(&self, mut ctx: IngestionContext) -> Result<IngestionContext> {
        let IngestionMode::SingleCommit { targets } = ctx.mode.clone() else {
            return Ok(ctx);
        };

        let mut resolved: Vec<CommitHash> = Vec::with_capacity(targets.len());
        for target in &targets {
            let hash = match target {
                CommitTarget::Rev { rev } => match CommitHash::parse(rev) {
                    Ok(hash) => Some(hash),
                    Err(_) => Some(ctx.vcs().resolve_ref(rev).await?),
                },
                CommitTarget::Before { timestamp } => {
                    let found = ctx
                        .vcs()
                        .find_commit_before_timestamp(*timestamp, ctx.head())
                        .await?;
                    if found.is_none() {
                        ctx.warn(format!("no commit before timestamp {}", timestamp));
                    }
                    found
                }
            };
            if let Some(hash) = hash {
                debug!("Job {}: {:?} -> {}", ctx.job_id, target, hash);
                if !resolved.contains(&hash) {
                    resolved.push(hash);
                }
            }
        }

        if resolved.is_empty() {
            ctx.warn("no target commits resolved; nothing to ingest");
        }
        info!("Job {}: {} target commit(s)", ctx.job_id, resolved.len());
        ctx.targets = resolved;
        Ok(ctx)
    }
}

/// Make sure every target is present locally, fetching it if needed
pub struct EnsureCommits;

#[async_trait]
impl PipelineStep<IngestionContext> for EnsureCommits {
    fn kind(&self) -> StepKind {
        StepKind::EnsureCommits
    }

    fn interruptible(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: IngestionContext) -> Result<IngestionContext> {
        for hash in &ctx.targets {
            if ctx.vcs().commit_exists(hash).await? {
                continue;
            }
            ctx.note(format!("Fetching {}", hash.short()));
            ctx.vcs().fetch_commit(hash).await?;
            if !ctx.vcs().commit_exists(hash).await? {
                return Err(OrchestratorError::CommitNotFound(hash.to_string()));
            }
        }
        Ok(ctx)
    }
}
