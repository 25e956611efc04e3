//! Infrastructure layer - Storage adapters
//!
//! - `memory`: in-memory metrics/dataset store and artifact store
//! - `local`: filesystem artifact store
//! - `sqlite`: SQLite metrics/dataset store

pub mod local;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use local::LocalArtifactStore;
pub use memory::{InMemoryArtifactStore, InMemoryMetricsStore};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteMetricsStore;
