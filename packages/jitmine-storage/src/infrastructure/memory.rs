//! In-memory stores (tests, store-less CLI runs)

use async_trait::async_trait;
use chrono::Utc;
use jitmine_core::features::bug_linking::BugLinkage;
use jitmine_core::features::guru_metrics::CommitGuruMetrics;
use jitmine_core::features::structural_metrics::StructuralMetricsTable;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::{
    ArtifactStore, CheckpointRecord, CheckpointStore, DatasetGeneration, DatasetRecord,
    DatasetStore, MetricsStore,
};
use crate::{Result, StorageError};

type PerRepo<T> = HashMap<String, BTreeMap<String, T>>;

#[derive(Clone, Default)]
pub struct InMemoryMetricsStore {
    guru: Arc<RwLock<PerRepo<CommitGuruMetrics>>>,
    structural: Arc<RwLock<PerRepo<StructuralMetricsTable>>>,
    linkages: Arc<RwLock<PerRepo<BugLinkage>>>,
    datasets: Arc<RwLock<HashMap<String, DatasetRecord>>>,
    checkpoints: Arc<RwLock<BTreeMap<String, CheckpointRecord>>>,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn save_guru_metrics(&self, repo_id: &str, rows: &[CommitGuruMetrics]) -> Result<()> {
        let mut guru = self.guru.write();
        let repo = guru.entry(repo_id.to_string()).or_default();
        for row in rows {
            repo.insert(row.commit_hash.to_string(), row.clone());
        }
        Ok(())
    }

    async fn load_guru_metrics(&self, repo_id: &str) -> Result<Vec<CommitGuruMetrics>> {
        let mut rows: Vec<CommitGuruMetrics> = self
            .guru
            .read()
            .get(repo_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| {
            a.author_timestamp
                .cmp(&b.author_timestamp)
                .then_with(|| a.commit_hash.as_str().cmp(b.commit_hash.as_str()))
        });
        Ok(rows)
    }

    async fn save_structural_metrics(
        &self,
        repo_id: &str,
        table: &StructuralMetricsTable,
    ) -> Result<()> {
        self.structural
            .write()
            .entry(repo_id.to_string())
            .or_default()
            .insert(table.commit_hash.to_string(), table.clone());
        Ok(())
    }

    async fn load_structural_metrics(&self, repo_id: &str) -> Result<Vec<StructuralMetricsTable>> {
        Ok(self
            .structural
            .read()
            .get(repo_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_bug_linkages(&self, repo_id: &str, linkages: &[BugLinkage]) -> Result<()> {
        let mut all = self.linkages.write();
        let repo = all.entry(repo_id.to_string()).or_default();
        for linkage in linkages {
            repo.insert(linkage.fix_hash.to_string(), linkage.clone());
        }
        Ok(())
    }

    async fn load_bug_linkages(&self, repo_id: &str) -> Result<Vec<BugLinkage>> {
        Ok(self
            .linkages
            .read()
            .get(repo_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl DatasetStore for InMemoryMetricsStore {
    async fn save_dataset(&self, record: &DatasetRecord) -> Result<()> {
        self.datasets
            .write()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_dataset(&self, dataset_id: &str) -> Result<Option<DatasetRecord>> {
        Ok(self.datasets.read().get(dataset_id).cloned())
    }

    async fn record_generation(
        &self,
        dataset_id: &str,
        generation: &DatasetGeneration,
    ) -> Result<DatasetRecord> {
        let mut datasets = self.datasets.write();
        let record = datasets
            .get_mut(dataset_id)
            .ok_or_else(|| StorageError::dataset_not_found(dataset_id))?;
        record.row_count = Some(generation.row_count);
        record.column_count = Some(generation.column_count);
        record.location = Some(generation.location.clone());
        record.generated_at = Some(Utc::now());
        Ok(record.clone())
    }
}

#[async_trait]
impl CheckpointStore for InMemoryMetricsStore {
    async fn save_checkpoint(&self, record: &CheckpointRecord) -> Result<()> {
        self.checkpoints
            .write()
            .insert(record.cache_key.clone(), record.clone());
        Ok(())
    }

    async fn load_checkpoint(&self, cache_key: &str) -> Result<Option<CheckpointRecord>> {
        Ok(self.checkpoints.read().get(cache_key).cloned())
    }

    async fn job_checkpoints(&self, job_id: &str) -> Result<Vec<CheckpointRecord>> {
        Ok(self
            .checkpoints
            .read()
            .values()
            .filter(|cp| cp.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn delete_job_checkpoints(&self, job_id: &str) -> Result<usize> {
        let mut checkpoints = self.checkpoints.write();
        let before = checkpoints.len();
        checkpoints.retain(|_, cp| cp.job_id != job_id);
        Ok(before - checkpoints.len())
    }
}

/// Blob map keyed by location id
#[derive(Clone, Default)]
pub struct InMemoryArtifactStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locations(&self) -> Vec<String> {
        let mut locations: Vec<String> = self.blobs.read().keys().cloned().collect();
        locations.sort();
        locations
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn save_bytes(&self, location: &str, bytes: Vec<u8>) -> Result<bool> {
        if location.is_empty() {
            return Err(StorageError::invalid_location(location));
        }
        self.blobs.write().insert(location.to_string(), bytes);
        Ok(true)
    }

    async fn load_bytes(&self, location: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(location).cloned())
    }

    async fn delete(&self, location: &str) -> Result<bool> {
        Ok(self.blobs.write().remove(location).is_some())
    }

    async fn exists(&self, location: &str) -> Result<bool> {
        Ok(self.blobs.read().contains_key(location))
    }
}
