//! Contract tests shared by every store backend

use jitmine_core::features::bug_linking::BugLinkage;
use jitmine_core::features::guru_metrics::CommitGuruMetrics;
use jitmine_core::features::structural_metrics::{StructuralMetricsRow, StructuralMetricsTable};
use jitmine_core::{CommitHash, DataFrame, DatasetConfig};
use jitmine_storage::{
    ArtifactStore, ArtifactStoreExt, CheckpointRecord, CheckpointStore, DatasetGeneration,
    DatasetRecord, DatasetStore, ErrorKind, InMemoryArtifactStore, InMemoryMetricsStore, LocalArtifactStore, MetricsStore,
    SqliteMetricsStore,
};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tempfile::TempDir;

fn hash(n: u8) -> CommitHash {
    CommitHash::parse(&format!("{:040x}", n)).unwrap()
}

fn guru_row(n: u8, timestamp: i64) -> CommitGuruMetrics {
    CommitGuruMetrics {
        commit_hash: hash(n),
        parent_hashes: if n > 1 { vec![hash(n - 1)] } else { vec![] },
        author_email: "dev@example.com".to_string(),
        author_timestamp: timestamp,
        message: format!("commit {}", n),
        ns: 1,
        nd: 1,
        nf: 2,
        entropy: 0.9,
        la: 10,
        ld: 3,
        lt: 120.0,
        fix: false,
        ndev: 1,
        age: 2.5,
        nuc: 4,
        exp: n as u32,
        rexp: 1.5,
        sexp: 1,
        fixes: vec![],
        contains_bug: false,
        fixing_commits: vec![],
    }
}

fn structural_table(n: u8) -> StructuralMetricsTable {
    let mut metrics = BTreeMap::new();
    metrics.insert("cbo".to_string(), 3.0);
    metrics.insert("wmc".to_string(), f64::from(n));
    StructuralMetricsTable {
        commit_hash: hash(n),
        columns: vec!["cbo".to_string(), "wmc".to_string()],
        rows: vec![StructuralMetricsRow {
            commit_hash: hash(n),
            file: "src/Main.java".to_string(),
            entity: "Main".to_string(),
            metrics,
        }],
    }
}

async fn check_metrics_store(store: &dyn MetricsStore) {
    assert!(store.load_guru_metrics("lang").await.unwrap().is_empty());

    // Out of order on purpose: loads come back oldest first
    store
        .save_guru_metrics("lang", &[guru_row(2, 200), guru_row(1, 100)])
        .await
        .unwrap();
    store
        .save_guru_metrics("other", &[guru_row(9, 50)])
        .await
        .unwrap();

    let rows = store.load_guru_metrics("lang").await.unwrap();
    assert_eq!(
        rows.iter().map(|r| r.commit_hash.clone()).collect::<Vec<_>>(),
        vec![hash(1), hash(2)]
    );

    // Upsert: labels written later replace the stored row
    let mut labelled = rows[0].clone();
    labelled.contains_bug = true;
    labelled.fixing_commits = vec![hash(2)];
    store.save_guru_metrics("lang", &[labelled.clone()]).await.unwrap();
    let rows = store.load_guru_metrics("lang").await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], labelled);

    store
        .save_structural_metrics("lang", &structural_table(1))
        .await
        .unwrap();
    store
        .save_structural_metrics("lang", &structural_table(1))
        .await
        .unwrap();
    let tables = store.load_structural_metrics("lang").await.unwrap();
    assert_eq!(tables, vec![structural_table(1)]);

    let linkage = BugLinkage {
        fix_hash: hash(2),
        issue_ids: vec!["42".to_string()],
    };
    store
        .save_bug_linkages("lang", &[linkage.clone()])
        .await
        .unwrap();
    assert_eq!(store.load_bug_linkages("lang").await.unwrap(), vec![linkage]);
    assert!(store.load_bug_linkages("other").await.unwrap().is_empty());
}

async fn check_dataset_store(store: &dyn DatasetStore) {
    assert!(store.get_dataset("ds-1").await.unwrap().is_none());

    let generation = DatasetGeneration {
        row_count: 10,
        column_count: 6,
        location: "datasets/ds-1.arrow".to_string(),
    };
    let err = store.record_generation("ds-1", &generation).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::DatasetNotFound);

    let record = DatasetRecord::new("ds-1", "lang", DatasetConfig::new("is_buggy"));
    store.save_dataset(&record).await.unwrap();
    assert_eq!(store.get_dataset("ds-1").await.unwrap(), Some(record));

    let updated = store.record_generation("ds-1", &generation).await.unwrap();
    assert_eq!(updated.row_count, Some(10));
    assert_eq!(updated.column_count, Some(6));
    assert!(updated.generated_at.is_some());
    assert_eq!(store.get_dataset("ds-1").await.unwrap(), Some(updated));
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct TrainedModel {
    name: String,
    weights: Vec<f64>,
}

async fn check_artifact_store(store: &dyn ArtifactStore) {
    assert_eq!(store.load_bytes("models/missing.bin").await.unwrap(), None);
    assert!(!store.delete("models/missing.bin").await.unwrap());
    assert!(!store.exists("models/missing.bin").await.unwrap());

    assert!(store.save_bytes("raw/blob", vec![1, 2, 3]).await.unwrap());
    assert_eq!(store.load_bytes("raw/blob").await.unwrap(), Some(vec![1, 2, 3]));
    assert!(store.exists("raw/blob").await.unwrap());
    assert!(store.delete("raw/blob").await.unwrap());
    assert!(!store.exists("raw/blob").await.unwrap());

    let model = TrainedModel {
        name: "logreg".to_string(),
        weights: vec![0.5, -1.25],
    };
    assert!(store.save_object("models/m1.bin", &model).await.unwrap());
    let loaded: Option<TrainedModel> = store.load_object("models/m1.bin").await.unwrap();
    assert_eq!(loaded, Some(model));
    let missing: Option<TrainedModel> = store.load_object("models/m2.bin").await.unwrap();
    assert_eq!(missing, None);

    let frame = DataFrame::from_columns(vec![
        ("la", vec![1.0, 2.0]),
        ("is_buggy", vec![0.0, 1.0]),
    ])
    .unwrap();
    assert!(store.save_table("datasets/ds-1.arrow", &frame).await.unwrap());
    assert_eq!(
        store.load_table("datasets/ds-1.arrow").await.unwrap(),
        Some(frame)
    );
    assert_eq!(store.load_table("datasets/none.arrow").await.unwrap(), None);
}

fn checkpoint(job_id: &str, step: &str, payload: &[u8]) -> CheckpointRecord {
    CheckpointRecord {
        cache_key: format!("{}:{}", job_id, step),
        job_id: job_id.to_string(),
        step: step.to_string(),
        payload: payload.to_vec(),
    }
}

async fn check_checkpoint_store(store: &dyn CheckpointStore) {
    assert_eq!(store.load_checkpoint("job-a:link_issues").await.unwrap(), None);

    store
        .save_checkpoint(&checkpoint("job-a", "persist_guru_metrics", &[1]))
        .await
        .unwrap();
    store
        .save_checkpoint(&checkpoint("job-a", "link_issues", &[2]))
        .await
        .unwrap();
    store
        .save_checkpoint(&checkpoint("job-b", "link_issues", &[3]))
        .await
        .unwrap();
    // Same key replaces
    store
        .save_checkpoint(&checkpoint("job-a", "link_issues", &[4, 5]))
        .await
        .unwrap();

    assert_eq!(
        store.load_checkpoint("job-a:link_issues").await.unwrap(),
        Some(checkpoint("job-a", "link_issues", &[4, 5]))
    );

    let steps: Vec<String> = store
        .job_checkpoints("job-a")
        .await
        .unwrap()
        .into_iter()
        .map(|cp| cp.step)
        .collect();
    assert_eq!(steps, vec!["link_issues", "persist_guru_metrics"]);

    assert_eq!(store.delete_job_checkpoints("job-a").await.unwrap(), 2);
    assert_eq!(store.delete_job_checkpoints("job-a").await.unwrap(), 0);
    assert!(store.job_checkpoints("job-a").await.unwrap().is_empty());
    assert_eq!(store.job_checkpoints("job-b").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_in_memory_metrics_store() {
    let store = InMemoryMetricsStore::new();
    check_metrics_store(&store).await;
    check_dataset_store(&store).await;
    check_checkpoint_store(&store).await;
}

#[tokio::test]
async fn test_sqlite_metrics_store() {
    let dir = TempDir::new().unwrap();
    let store = SqliteMetricsStore::new(dir.path().join("jitmine.db")).unwrap();
    check_metrics_store(&store).await;
    check_dataset_store(&store).await;
    check_checkpoint_store(&store).await;
}

#[tokio::test]
async fn test_sqlite_store_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("jitmine.db");
    {
        let store = SqliteMetricsStore::new(&path).unwrap();
        store
            .save_guru_metrics("lang", &[guru_row(1, 100)])
            .await
            .unwrap();
        store
            .save_checkpoint(&checkpoint("job-a", "link_issues", &[7]))
            .await
            .unwrap();
    }
    let reopened = SqliteMetricsStore::new(&path).unwrap();
    assert_eq!(reopened.load_guru_metrics("lang").await.unwrap().len(), 1);
    assert_eq!(reopened.job_checkpoints("job-a").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_in_memory_artifact_store() {
    let store = InMemoryArtifactStore::new();
    check_artifact_store(&store).await;
    assert_eq!(
        store.locations(),
        vec!["datasets/ds-1.arrow".to_string(), "models/m1.bin".to_string()]
    );
}

#[tokio::test]
async fn test_local_artifact_store() {
    let dir = TempDir::new().unwrap();
    let store = LocalArtifactStore::new(dir.path());
    check_artifact_store(&store).await;
    assert!(dir.path().join("datasets/ds-1.arrow").exists());
}

#[tokio::test]
async fn test_local_artifact_store_rejects_escaping_locations() {
    let dir = TempDir::new().unwrap();
    let store = LocalArtifactStore::new(dir.path().join("root"));
    let err = store
        .save_bytes("../outside.bin", vec![0])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidLocation);
    assert!(!dir.path().join("outside.bin").exists());
}
