//! Per-repository mutual exclusion
//!
//! One working copy per repository id; checkouts and fetches on it must not
//! interleave between concurrent runs.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct RepositoryLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl RepositoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `repo_id`'s working copy
    pub async fn acquire(&self, repo_id: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not held across the await
        let lock = self
            .locks
            .entry(repo_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        debug!("Waiting for repository lock: {}", repo_id);
        lock.lock_owned().await
    }

    /// Lock without waiting; `None` while another run holds it
    pub fn try_acquire(&self, repo_id: &str) -> Option<OwnedMutexGuard<()>> {
        let lock = self
            .locks
            .entry(repo_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.try_lock_owned().ok()
    }
}
