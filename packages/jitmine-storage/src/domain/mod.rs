//! Domain layer: persistence records and port traits
//!
//! # Ports
//!
//! - `MetricsStore`: guru metrics, structural metrics and bug linkages,
//!   keyed by repository id and commit hash
//! - `DatasetStore`: dataset configuration records and generation results
//! - `ArtifactStore`: opaque blobs by location id, with object (bincode)
//!   and table (Arrow IPC) helpers in `ArtifactStoreExt`
//! - `CheckpointStore`: completed pipeline steps of a job, so a failed job
//!   can be resumed by a later process
//!
//! # Not-found outcomes
//!
//! Loading something absent is `Ok(None)` (or an empty `Vec`), deleting
//! something absent is `Ok(false)`. Errors are reserved for backend failures.

pub mod table_codec;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jitmine_core::features::bug_linking::BugLinkage;
use jitmine_core::features::guru_metrics::CommitGuruMetrics;
use jitmine_core::features::structural_metrics::StructuralMetricsTable;
use jitmine_core::{DataFrame, DatasetConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Result;

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// Dataset configuration record
///
/// `row_count`, `column_count` and `location` stay `None` until the dataset
/// has been generated once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: String,
    /// Repository whose mined metrics feed this dataset
    pub repo_id: String,
    pub config: DatasetConfig,
    #[serde(default)]
    pub row_count: Option<usize>,
    #[serde(default)]
    pub column_count: Option<usize>,
    /// Artifact location of the generated table
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

impl DatasetRecord {
    pub fn new(id: impl Into<String>, repo_id: impl Into<String>, config: DatasetConfig) -> Self {
        Self {
            id: id.into(),
            repo_id: repo_id.into(),
            config,
            row_count: None,
            column_count: None,
            location: None,
            generated_at: None,
        }
    }

    pub fn is_generated(&self) -> bool {
        self.location.is_some()
    }
}

/// Result of one dataset generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetGeneration {
    pub row_count: usize,
    pub column_count: usize,
    pub location: String,
}

/// Completed pipeline step of a job, as persisted
///
/// `payload` is opaque to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// `<job_id>:<step>`
    pub cache_key: String,
    pub job_id: String,
    pub step: String,
    pub payload: Vec<u8>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Traits
// ═══════════════════════════════════════════════════════════════════════════

/// Mined metrics persistence
///
/// All saves are upserts keyed by `(repo_id, commit_hash)`, so re-running a
/// persist step after a partial failure is safe.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Upsert guru rows (also used to persist bug labels)
    async fn save_guru_metrics(&self, repo_id: &str, rows: &[CommitGuruMetrics]) -> Result<()>;

    /// Guru rows ordered by author timestamp, oldest first
    async fn load_guru_metrics(&self, repo_id: &str) -> Result<Vec<CommitGuruMetrics>>;

    async fn save_structural_metrics(
        &self,
        repo_id: &str,
        table: &StructuralMetricsTable,
    ) -> Result<()>;

    async fn load_structural_metrics(&self, repo_id: &str) -> Result<Vec<StructuralMetricsTable>>;

    async fn save_bug_linkages(&self, repo_id: &str, linkages: &[BugLinkage]) -> Result<()>;

    async fn load_bug_linkages(&self, repo_id: &str) -> Result<Vec<BugLinkage>>;
}

/// Dataset records
#[async_trait]
pub trait DatasetStore: Send + Sync {
    async fn save_dataset(&self, record: &DatasetRecord) -> Result<()>;

    async fn get_dataset(&self, dataset_id: &str) -> Result<Option<DatasetRecord>>;

    /// Write row/column counts and location; unknown ids are `DatasetNotFound`
    async fn record_generation(
        &self,
        dataset_id: &str,
        generation: &DatasetGeneration,
    ) -> Result<DatasetRecord>;
}

/// Job checkpoints
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Upsert by `cache_key`
    async fn save_checkpoint(&self, record: &CheckpointRecord) -> Result<()>;

    async fn load_checkpoint(&self, cache_key: &str) -> Result<Option<CheckpointRecord>>;

    /// Checkpoints of one job, ordered by cache key
    async fn job_checkpoints(&self, job_id: &str) -> Result<Vec<CheckpointRecord>>;

    /// Returns how many checkpoints were removed
    async fn delete_job_checkpoints(&self, job_id: &str) -> Result<usize>;
}

/// Blob storage by opaque location id
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Returns `true` once the bytes are stored
    async fn save_bytes(&self, location: &str, bytes: Vec<u8>) -> Result<bool>;

    async fn load_bytes(&self, location: &str) -> Result<Option<Vec<u8>>>;

    /// `false` when nothing was stored at `location`
    async fn delete(&self, location: &str) -> Result<bool>;

    async fn exists(&self, location: &str) -> Result<bool>;
}

/// Typed helpers over any `ArtifactStore`
#[async_trait]
pub trait ArtifactStoreExt: ArtifactStore {
    async fn save_object<T>(&self, location: &str, value: &T) -> Result<bool>
    where
        T: Serialize + Sync,
    {
        let bytes = bincode::serialize(value)?;
        self.save_bytes(location, bytes).await
    }

    async fn load_object<T>(&self, location: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.load_bytes(location).await? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn save_table(&self, location: &str, table: &DataFrame) -> Result<bool> {
        let bytes = table_codec::encode_table(table)?;
        self.save_bytes(location, bytes).await
    }

    /// Materialize a stored table straight into a `DataFrame`
    async fn load_table(&self, location: &str) -> Result<Option<DataFrame>> {
        match self.load_bytes(location).await? {
            Some(bytes) => Ok(Some(table_codec::decode_table(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl<S: ArtifactStore + ?Sized> ArtifactStoreExt for S {}
