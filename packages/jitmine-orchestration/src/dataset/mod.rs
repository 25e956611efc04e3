//! Dataset generation
//!
//! `LoadDataset` → cleaning rules (in configured order) → `SelectFeatures` →
//! `PersistDataset`. The table is rebuilt from the metrics store on every
//! run, so nothing here is checkpointed.

pub mod builder;
pub mod cleaning;
pub mod context;
pub mod selection;

pub use builder::{build_frame, LABEL_COLUMN, STRUCTURAL_PREFIX};
pub use cleaning::CleaningStep;
pub use context::{DatasetContext, DatasetServices};
pub use selection::{plan_selection, FeatureSelectionStep, SelectionPlan};

use crate::error::{OrchestratorError, Result};
use crate::pipeline::{ProgressSink, StepPipeline};
use jitmine_core::DatasetConfig;
use jitmine_storage::{ArtifactStoreExt, DatasetGeneration, DatasetRecord, StorageError};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Artifact location of a generated dataset
pub fn dataset_location(dataset_id: &str) -> String {
    format!("datasets/{}.arrow", dataset_id)
}

/// One step per cleaning rule, then feature selection
pub fn dataset_pipeline(config: &DatasetConfig) -> StepPipeline<DatasetContext> {
    let mut pipeline = StepPipeline::new("dataset_generation");
    for (position, rule) in config.cleaning_rules.iter().enumerate() {
        pipeline.push(Box::new(CleaningStep::new(position, rule.clone())));
    }
    pipeline.with_step(FeatureSelectionStep)
}

/// Load the dataset record and build its table from stored metrics
pub async fn load_context(
    job_id: Uuid,
    dataset_id: &str,
    services: Arc<DatasetServices>,
    progress: Arc<dyn ProgressSink>,
) -> Result<DatasetContext> {
    let record = services
        .datasets
        .get_dataset(dataset_id)
        .await?
        .ok_or_else(|| StorageError::dataset_not_found(dataset_id))?;

    let rows = services.metrics.load_guru_metrics(&record.repo_id).await?;
    let tables = services
        .metrics
        .load_structural_metrics(&record.repo_id)
        .await?;
    let frame = build_frame(&rows, &tables)?;
    info!(
        "Job {}: dataset {} loaded from {} ({} rows x {} columns)",
        job_id,
        dataset_id,
        record.repo_id,
        frame.n_rows(),
        frame.n_cols()
    );

    Ok(DatasetContext::new(
        job_id,
        record.id,
        record.config,
        frame,
        services,
        progress,
    ))
}

/// Fail fast on selection problems before any cleaning rule touches the table
pub fn preflight(ctx: &DatasetContext) -> Result<()> {
    plan_selection(&ctx.config, &ctx.frame, &ctx.services.factory).map(|_| ())
}

/// Store the final table and write its counts and location back
pub async fn persist_dataset(ctx: &DatasetContext) -> Result<DatasetRecord> {
    let location = dataset_location(&ctx.dataset_id);
    let stored = ctx
        .services
        .artifacts
        .save_table(&location, &ctx.frame)
        .await?;
    if !stored {
        return Err(OrchestratorError::Storage(StorageError::io(format!(
            "artifact store refused {}",
            location
        ))));
    }

    let generation = DatasetGeneration {
        row_count: ctx.frame.n_rows(),
        column_count: ctx.frame.n_cols(),
        location,
    };
    let record = ctx
        .services
        .datasets
        .record_generation(&ctx.dataset_id, &generation)
        .await?;
    info!(
        "Job {}: dataset {} stored at {} ({} rows x {} columns)",
        ctx.job_id, ctx.dataset_id, generation.location, generation.row_count, generation.column_count
    );
    Ok(record)
}
