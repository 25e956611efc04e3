//! jitmine-storage - Persistence and artifact ports for the mining pipelines
//!
//! ## Boundaries
//!
//! 1. **Metrics**: guru rows, structural tables and bug linkages, keyed by
//!    repository id and commit hash. Saves are upserts.
//! 2. **Datasets**: configuration records plus the row/column counts and
//!    artifact location written when generation completes.
//! 3. **Artifacts**: opaque blobs by location id. Missing artifacts load as
//!    `None` and delete as `false`.
//! 4. **Checkpoints**: completed steps per job, keyed by `<job_id>:<step>`.
//!    The SQLite store keeps them next to the metrics they describe.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jitmine_storage::{ArtifactStoreExt, LocalArtifactStore};
//!
//! let store = LocalArtifactStore::new("/var/lib/jitmine/artifacts");
//! store.save_table("datasets/ds-1.arrow", &frame).await?;
//! let frame = store.load_table("datasets/ds-1.arrow").await?;
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{
    ArtifactStore, ArtifactStoreExt, CheckpointRecord, CheckpointStore, DatasetGeneration,
    DatasetRecord, DatasetStore, MetricsStore,
};
pub use infrastructure::{InMemoryArtifactStore, InMemoryMetricsStore, LocalArtifactStore};

#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteMetricsStore;
