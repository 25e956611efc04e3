//! SQLite adapter for MetricsStore, DatasetStore and CheckpointStore
//!
//! Rows are stored as JSON payloads keyed by `(repo_id, commit_hash)`; only
//! the columns needed for lookup and ordering are broken out.

use async_trait::async_trait;
use chrono::Utc;
use jitmine_core::features::bug_linking::BugLinkage;
use jitmine_core::features::guru_metrics::CommitGuruMetrics;
use jitmine_core::features::structural_metrics::StructuralMetricsTable;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{
    CheckpointRecord, CheckpointStore, DatasetGeneration, DatasetRecord, DatasetStore,
    MetricsStore,
};
use crate::{Result, StorageError};

/// SQLite-based metrics, dataset and checkpoint store
#[derive(Clone)]
pub struct SqliteMetricsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMetricsStore {
    /// Create a new SQLite store at the given path
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS guru_metrics (
                repo_id TEXT NOT NULL,
                commit_hash TEXT NOT NULL,
                author_timestamp INTEGER NOT NULL,
                contains_bug BOOLEAN NOT NULL DEFAULT 0,
                payload TEXT NOT NULL,
                PRIMARY KEY (repo_id, commit_hash)
            );

            CREATE INDEX IF NOT EXISTS idx_guru_metrics_time
             ON guru_metrics(repo_id, author_timestamp);

            CREATE TABLE IF NOT EXISTS structural_metrics (
                repo_id TEXT NOT NULL,
                commit_hash TEXT NOT NULL,
                payload TEXT NOT NULL,
                PRIMARY KEY (repo_id, commit_hash)
            );

            CREATE TABLE IF NOT EXISTS bug_linkages (
                repo_id TEXT NOT NULL,
                fix_hash TEXT NOT NULL,
                payload TEXT NOT NULL,
                PRIMARY KEY (repo_id, fix_hash)
            );

            CREATE TABLE IF NOT EXISTS datasets (
                dataset_id TEXT PRIMARY KEY,
                repo_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS checkpoints (
                cache_key TEXT PRIMARY KEY,
                job_id TEXT NOT NULL,
                step TEXT NOT NULL,
                payload BLOB NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_checkpoints_job
             ON checkpoints(job_id);",
        )?;
        Ok(())
    }

    fn load_payloads<T: DeserializeOwned>(&self, sql: &str, repo_id: &str) -> Result<Vec<T>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let payloads = stmt
            .query_map(params![repo_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(StorageError::from))
            .collect()
    }
}

#[async_trait]
impl MetricsStore for SqliteMetricsStore {
    async fn save_guru_metrics(&self, repo_id: &str, rows: &[CommitGuruMetrics]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO guru_metrics
                 (repo_id, commit_hash, author_timestamp, contains_bug, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in rows {
                stmt.execute(params![
                    repo_id,
                    row.commit_hash.as_str(),
                    row.author_timestamp,
                    row.contains_bug,
                    serde_json::to_string(row)?
                ])?;
            }
        }
        tx.commit()?;
        debug!("Saved {} guru row(s) for {}", rows.len(), repo_id);
        Ok(())
    }

    async fn load_guru_metrics(&self, repo_id: &str) -> Result<Vec<CommitGuruMetrics>> {
        self.load_payloads(
            "SELECT payload FROM guru_metrics WHERE repo_id = ?1
             ORDER BY author_timestamp, commit_hash",
            repo_id,
        )
    }

    async fn save_structural_metrics(
        &self,
        repo_id: &str,
        table: &StructuralMetricsTable,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO structural_metrics (repo_id, commit_hash, payload)
             VALUES (?1, ?2, ?3)",
            params![
                repo_id,
                table.commit_hash.as_str(),
                serde_json::to_string(table)?
            ],
        )?;
        Ok(())
    }

    async fn load_structural_metrics(&self, repo_id: &str) -> Result<Vec<StructuralMetricsTable>> {
        self.load_payloads(
            "SELECT payload FROM structural_metrics WHERE repo_id = ?1 ORDER BY commit_hash",
            repo_id,
        )
    }

    async fn save_bug_linkages(&self, repo_id: &str, linkages: &[BugLinkage]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO bug_linkages (repo_id, fix_hash, payload)
                 VALUES (?1, ?2, ?3)",
            )?;
            for linkage in linkages {
                stmt.execute(params![
                    repo_id,
                    linkage.fix_hash.as_str(),
                    serde_json::to_string(linkage)?
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    async fn load_bug_linkages(&self, repo_id: &str) -> Result<Vec<BugLinkage>> {
        self.load_payloads(
            "SELECT payload FROM bug_linkages WHERE repo_id = ?1 ORDER BY fix_hash",
            repo_id,
        )
    }
}

#[async_trait]
impl DatasetStore for SqliteMetricsStore {
    async fn save_dataset(&self, record: &DatasetRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO datasets (dataset_id, repo_id, payload, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                &record.id,
                &record.repo_id,
                serde_json::to_string(record)?,
                Utc::now().timestamp()
            ],
        )?;
        Ok(())
    }

    async fn get_dataset(&self, dataset_id: &str) -> Result<Option<DatasetRecord>> {
        let conn = self.conn.lock();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM datasets WHERE dataset_id = ?1",
                params![dataset_id],
                |row| row.get(0),
            )
            .optional()?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(StorageError::from))
            .transpose()
    }

    async fn record_generation(
        &self,
        dataset_id: &str,
        generation: &DatasetGeneration,
    ) -> Result<DatasetRecord> {
        let mut record = self
            .get_dataset(dataset_id)
            .await?
            .ok_or_else(|| StorageError::dataset_not_found(dataset_id))?;
        record.row_count = Some(generation.row_count);
        record.column_count = Some(generation.column_count);
        record.location = Some(generation.location.clone());
        record.generated_at = Some(Utc::now());
        self.save_dataset(&record).await?;
        Ok(record)
    }
}

fn checkpoint_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CheckpointRecord> {
    Ok(CheckpointRecord {
        cache_key: row.get(0)?,
        job_id: row.get(1)?,
        step: row.get(2)?,
        payload: row.get(3)?,
    })
}

#[async_trait]
impl CheckpointStore for SqliteMetricsStore {
    async fn save_checkpoint(&self, record: &CheckpointRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO checkpoints (cache_key, job_id, step, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &record.cache_key,
                &record.job_id,
                &record.step,
                &record.payload,
                Utc::now().timestamp()
            ],
        )?;
        debug!("Saved checkpoint {}", record.cache_key);
        Ok(())
    }

    async fn load_checkpoint(&self, cache_key: &str) -> Result<Option<CheckpointRecord>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT cache_key, job_id, step, payload FROM checkpoints WHERE cache_key = ?1",
                params![cache_key],
                checkpoint_from_row,
            )
            .optional()?;
        Ok(record)
    }

    async fn job_checkpoints(&self, job_id: &str) -> Result<Vec<CheckpointRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT cache_key, job_id, step, payload FROM checkpoints
             WHERE job_id = ?1 ORDER BY cache_key",
        )?;
        let records = stmt
            .query_map(params![job_id], checkpoint_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn delete_job_checkpoints(&self, job_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let removed = conn.execute("DELETE FROM checkpoints WHERE job_id = ?1", params![job_id])?;
        Ok(removed)
    }
}
