//! Ingestion steps
//!
//! Calculate steps only fill the context; the persist/link steps after them
//! write to the store and are checkpointed.

mod guru;
mod linking;
mod prepare;
mod resolve;
mod structural;

pub use guru::{CalculateGuruMetrics, PersistGuruMetrics};
pub use linking::{LinkBugs, LinkIssues};
pub use prepare::PrepareRepository;
pub use resolve::{EnsureCommits, ResolveHashes};
pub use structural::{CalculateStructuralMetrics, PersistStructuralMetrics};

use super::IngestionContext;
use crate::error::{OrchestratorError, Result};
use crate::job::StepKind;
use crate::pipeline::PipelineStep;

/// Step registry: the only place step kinds map to implementations
pub fn step_for(kind: StepKind) -> Result<Box<dyn PipelineStep<IngestionContext>>> {
    let step: Box<dyn PipelineStep<IngestionContext>> = match kind {
        StepKind::PrepareRepository => Box::new(PrepareRepository),
        StepKind::ResolveHashes => Box::new(ResolveHashes),
        StepKind::EnsureCommits => Box::new(EnsureCommits),
        StepKind::CalculateGuruMetrics => Box::new(CalculateGuruMetrics),
        StepKind::PersistGuruMetrics => Box::new(PersistGuruMetrics),
        StepKind::LinkIssues => Box::new(LinkIssues),
        StepKind::LinkBugs => Box::new(LinkBugs),
        StepKind::CalculateStructuralMetrics => Box::new(CalculateStructuralMetrics),
        StepKind::PersistStructuralMetrics => Box::new(PersistStructuralMetrics),
        other => {
            return Err(OrchestratorError::Config(format!(
                "{} is not an ingestion step",
                other
            )))
        }
    };
    Ok(step)
}
