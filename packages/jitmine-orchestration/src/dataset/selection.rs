use super::DatasetContext;
use crate::error::{OrchestratorError, Result};
use crate::job::StepKind;
use crate::pipeline::PipelineStep;
use async_trait::async_trait;
use jitmine_core::{
    DataFrame, DatasetConfig, FeatureSelectionError, FeatureSelectionFactory,
    FeatureSelectionStrategy,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Resolved selection request: algorithm name + strategy
pub struct SelectionPlan {
    pub algorithm: String,
    pub strategy: Arc<dyn FeatureSelectionStrategy>,
}

/// Checks that must pass before selection runs
///
/// Order matters: a missing target is reported even when the algorithm
/// name is also bad. `Ok(None)` means feature selection is not configured.
pub fn plan_selection(
    config: &DatasetConfig,
    frame: &DataFrame,
    factory: &FeatureSelectionFactory,
) -> Result<Option<SelectionPlan>> {
    let Some(algorithm) = config.feature_selection_name() else {
        return Ok(None);
    };
    if !frame.has_column(&config.target_column) {
        return Err(OrchestratorError::MissingTargetColumn {
            column: config.target_column.clone(),
            available: frame.column_names().iter().map(|s| s.to_string()).collect(),
        });
    }
    let strategy = factory.get(algorithm)?;
    Ok(Some(SelectionPlan {
        algorithm: algorithm.to_string(),
        strategy,
    }))
}

/// Keep the selected feature columns followed by the target
///
/// Runs last in the dataset pipeline. The strategy call is offloaded to the
/// feature-selection pool.
pub struct FeatureSelectionStep;

#[async_trait]
impl PipelineStep<DatasetContext> for FeatureSelectionStep {
    fn kind(&self) -> StepKind {
        StepKind::SelectFeatures
    }

    async fn execute(&self, mut ctx: DatasetContext) -> Result<DatasetContext> {
        let Some(plan) = plan_selection(&ctx.config, &ctx.frame, &ctx.services.factory)? else {
            info!(
                "Job {}: feature selection not configured, skipping",
                ctx.job_id
            );
            return Ok(ctx);
        };

        let target = ctx.config.target_column.clone();
        let params = ctx
            .config
            .feature_selection
            .as_ref()
            .map(|fs| fs.params.clone())
            .unwrap_or_default();
        let (features, target_values) = ctx.frame.split_target(&target)?;
        let available: HashSet<String> = features
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        ctx.note(format!(
            "Feature selection started: {} over {} feature(s), {} row(s)",
            plan.algorithm,
            available.len(),
            features.n_rows()
        ));

        let strategy = plan.strategy.clone();
        let selected = ctx
            .services
            .pool
            .run(move || strategy.select_features(&features, &target_values, &params))
            .await??;

        let mut keep: Vec<String> = Vec::with_capacity(selected.len() + 1);
        for name in selected {
            if !available.contains(&name) {
                return Err(OrchestratorError::FeatureSelectionRuntime(
                    FeatureSelectionError::Runtime(format!(
                        "{} returned unknown column '{}'",
                        plan.algorithm, name
                    )),
                ));
            }
            if !keep.contains(&name) {
                keep.push(name);
            }
        }

        if keep.is_empty() {
            ctx.warn(format!(
                "{} selected no features; dataset keeps only '{}'",
                plan.algorithm, target
            ));
        }

        let kept = keep.len();
        keep.push(target);
        let names: Vec<&str> = keep.iter().map(String::as_str).collect();
        ctx.frame = ctx.frame.select(&names)?;

        ctx.note(format!(
            "Feature selection completed: {} of {} feature(s) kept",
            kept,
            available.len()
        ));
        Ok(ctx)
    }
}
