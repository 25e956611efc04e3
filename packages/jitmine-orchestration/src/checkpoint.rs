use crate::error::Result;
use crate::job::StepKind;
use chrono::Utc;
use jitmine_storage::{CheckpointRecord, CheckpointStore, InMemoryMetricsStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// What a durable step left behind (bincode payload of a checkpoint)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: StepKind,
    /// Records written by the step
    pub records: usize,
    pub completed_at_ms: i64,
}

impl StepOutcome {
    pub fn new(step: StepKind, records: usize) -> Self {
        Self {
            step,
            records,
            completed_at_ms: Utc::now().timestamp_millis(),
        }
    }
}

/// Completed durable step of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub job_id: Uuid,
    pub step: StepKind,
    pub cache_key: String,
    pub cache_data: Vec<u8>, // StepOutcome (bincode)
}

impl Checkpoint {
    pub fn new(job_id: Uuid, step: StepKind, cache_key: String, cache_data: Vec<u8>) -> Self {
        Self {
            job_id,
            step,
            cache_key,
            cache_data,
        }
    }

    /// `<job_id>:<step>`
    pub fn key_for(job_id: Uuid, step: StepKind) -> String {
        format!("{}:{}", job_id, step)
    }

    pub fn from_outcome(job_id: Uuid, outcome: &StepOutcome) -> Result<Self> {
        Ok(Self::new(
            job_id,
            outcome.step,
            Self::key_for(job_id, outcome.step),
            bincode::serialize(outcome)?,
        ))
    }

    fn to_record(&self) -> CheckpointRecord {
        CheckpointRecord {
            cache_key: self.cache_key.clone(),
            job_id: self.job_id.to_string(),
            step: self.step.as_str().to_string(),
            payload: self.cache_data.clone(),
        }
    }
}

/// Checkpoint manager
///
/// Checkpoints live as long as the backing store. A job that completes has
/// its checkpoints removed; a failed job keeps them so a later run (possibly
/// in another process sharing the store) skips the persisted steps.
#[derive(Clone)]
pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
}

impl CheckpointManager {
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self { store }
    }

    /// Process-local checkpoints
    pub fn new_in_memory() -> Self {
        Self::new(Arc::new(InMemoryMetricsStore::new()))
    }

    /// Save checkpoint, replacing any earlier one for the same job+step
    pub async fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<()> {
        self.store.save_checkpoint(&checkpoint.to_record()).await?;
        Ok(())
    }

    /// Load checkpoint by cache key
    pub async fn load_checkpoint(&self, cache_key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .store
            .load_checkpoint(cache_key)
            .await?
            .map(|record| record.payload))
    }

    /// Get completed steps for a job
    pub async fn completed_steps(&self, job_id: Uuid) -> Result<HashSet<StepKind>> {
        self.store
            .job_checkpoints(&job_id.to_string())
            .await?
            .iter()
            .map(|record| StepKind::from_str(&record.step))
            .collect()
    }

    /// Delete checkpoints for a job (cleanup after completion)
    pub async fn delete_job_checkpoints(&self, job_id: Uuid) -> Result<()> {
        self.store.delete_job_checkpoints(&job_id.to_string()).await?;
        Ok(())
    }
}

impl Default for CheckpointManager {
    fn default() -> Self {
        Self::new_in_memory()
    }
}
