use super::steps::step_for;
use super::IngestionContext;
use crate::error::{OrchestratorError, Result};
use crate::job::{IngestionMode, StepKind};
use crate::pipeline::StepPipeline;
use serde::{Deserialize, Serialize};

/// Ingestion strategy: a fixed step order per variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStrategy {
    FullHistory,
    SingleCommit,
}

impl IngestionStrategy {
    pub const FULL_HISTORY_STEPS: &'static [StepKind] = &[
        StepKind::PrepareRepository,
        StepKind::CalculateGuruMetrics,
        StepKind::PersistGuruMetrics,
        StepKind::LinkIssues,
        StepKind::LinkBugs,
        StepKind::CalculateStructuralMetrics,
        StepKind::PersistStructuralMetrics,
    ];

    pub const SINGLE_COMMIT_STEPS: &'static [StepKind] = &[
        StepKind::PrepareRepository,
        StepKind::ResolveHashes,
        StepKind::EnsureCommits,
        StepKind::CalculateGuruMetrics,
        StepKind::PersistGuruMetrics,
        StepKind::LinkIssues,
        StepKind::LinkBugs,
        StepKind::CalculateStructuralMetrics,
        StepKind::PersistStructuralMetrics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionStrategy::FullHistory => "full_history",
            IngestionStrategy::SingleCommit => "single_commit",
        }
    }

    /// Unknown names are rejected, never defaulted
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "full_history" => Ok(IngestionStrategy::FullHistory),
            "single_commit" => Ok(IngestionStrategy::SingleCommit),
            other => Err(OrchestratorError::UnknownStrategy(other.to_string())),
        }
    }

    pub fn for_mode(mode: &IngestionMode) -> Self {
        match mode {
            IngestionMode::FullHistory => IngestionStrategy::FullHistory,
            IngestionMode::SingleCommit { .. } => IngestionStrategy::SingleCommit,
        }
    }

    pub fn steps(&self) -> &'static [StepKind] {
        match self {
            IngestionStrategy::FullHistory => Self::FULL_HISTORY_STEPS,
            IngestionStrategy::SingleCommit => Self::SINGLE_COMMIT_STEPS,
        }
    }

    pub fn pipeline(&self) -> Result<StepPipeline<IngestionContext>> {
        let mut pipeline = StepPipeline::new(self.as_str());
        for kind in self.steps() {
            pipeline.push(step_for(*kind)?);
        }
        Ok(pipeline)
    }
}

impl std::fmt::Display for IngestionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::CommitTarget;

    #[test]
    fn test_pipelines_follow_declared_order() {
        for strategy in [IngestionStrategy::FullHistory, IngestionStrategy::SingleCommit] {
            let pipeline = strategy.pipeline().unwrap();
            assert_eq!(pipeline.step_kinds(), strategy.steps().to_vec());
        }
    }

    #[test]
    fn test_single_commit_adds_resolution_steps() {
        let single = IngestionStrategy::SingleCommit.steps();
        assert_eq!(single[1], StepKind::ResolveHashes);
        assert_eq!(single[2], StepKind::EnsureCommits);
        assert_eq!(&single[3..], &IngestionStrategy::FULL_HISTORY_STEPS[1..]);
    }

    #[test]
    fn test_every_calculate_step_precedes_its_persist_step() {
        for strategy in [IngestionStrategy::FullHistory, IngestionStrategy::SingleCommit] {
            let steps = strategy.steps();
            let pos = |k: StepKind| steps.iter().position(|s| *s == k).unwrap();
            assert_eq!(pos(StepKind::PersistGuruMetrics), pos(StepKind::CalculateGuruMetrics) + 1);
            assert_eq!(
                pos(StepKind::PersistStructuralMetrics),
                pos(StepKind::CalculateStructuralMetrics) + 1
            );
            assert!(pos(StepKind::PersistGuruMetrics) < pos(StepKind::CalculateStructuralMetrics));
        }
    }

    #[test]
    fn test_strategy_lookup_is_closed() {
        assert_eq!(
            IngestionStrategy::from_name("single_commit").unwrap(),
            IngestionStrategy::SingleCommit
        );
        assert!(matches!(
            IngestionStrategy::from_name("incremental"),
            Err(OrchestratorError::UnknownStrategy(_))
        ));
        let mode = IngestionMode::SingleCommit {
            targets: vec![CommitTarget::rev("main")],
        };
        assert_eq!(IngestionStrategy::for_mode(&mode), IngestionStrategy::SingleCommit);
    }

    #[test]
    fn test_dataset_steps_are_not_ingestion_steps() {
        assert!(step_for(StepKind::SelectFeatures).is_err());
    }
}
