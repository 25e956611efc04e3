use crate::error::Result;
use crate::pipeline::{ProgressSink, ProgressUpdate};
use crate::worker_pool::FeatureSelectionPool;
use jitmine_core::{DataFrame, DatasetConfig, FeatureSelectionFactory};
use jitmine_storage::{ArtifactStore, DatasetStore, MetricsStore};
use std::sync::Arc;
use uuid::Uuid;

/// Collaborators of dataset generation
#[derive(Clone)]
pub struct DatasetServices {
    pub metrics: Arc<dyn MetricsStore>,
    pub datasets: Arc<dyn DatasetStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub factory: Arc<FeatureSelectionFactory>,
    pub pool: FeatureSelectionPool,
}

impl DatasetServices {
    /// Default strategy registry, pool of `worker_threads`
    pub fn new(
        metrics: Arc<dyn MetricsStore>,
        datasets: Arc<dyn DatasetStore>,
        artifacts: Arc<dyn ArtifactStore>,
        worker_threads: usize,
    ) -> Result<Self> {
        Ok(Self {
            metrics,
            datasets,
            artifacts,
            factory: Arc::new(FeatureSelectionFactory::with_defaults()),
            pool: FeatureSelectionPool::new(worker_threads)?,
        })
    }

    pub fn with_factory(mut self, factory: FeatureSelectionFactory) -> Self {
        self.factory = Arc::new(factory);
        self
    }
}

/// In-flight dataset plus its configuration
pub struct DatasetContext {
    pub job_id: Uuid,
    pub dataset_id: String,
    pub config: DatasetConfig,
    pub frame: DataFrame,
    pub warnings: Vec<String>,
    pub services: Arc<DatasetServices>,
    pub progress: Arc<dyn ProgressSink>,
}

impl DatasetContext {
    pub fn new(
        job_id: Uuid,
        dataset_id: impl Into<String>,
        config: DatasetConfig,
        frame: DataFrame,
        services: Arc<DatasetServices>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            job_id,
            dataset_id: dataset_id.into(),
            config,
            frame,
            warnings: Vec::new(),
            services,
            progress,
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("Job {}: {}", self.job_id, message);
        self.warnings.push(message);
    }

    pub fn note(&self, message: impl Into<String>) {
        self.progress.report(ProgressUpdate {
            job_id: self.job_id,
            message: message.into(),
            percent: None,
        });
    }
}
