//! Bounded worker pool for feature selection
//!
//! Selection is CPU-bound and can run for minutes on wide datasets. It runs
//! on a dedicated rayon pool so the async runtime keeps serving other jobs;
//! the awaiting task gets the result back over a oneshot channel.

use crate::error::{OrchestratorError, Result};
use jitmine_core::FeatureSelectionError;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Clone)]
pub struct FeatureSelectionPool {
    pool: Arc<rayon::ThreadPool>,
    threads: usize,
}

impl FeatureSelectionPool {
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("jitmine-fs-{}", i))
            .build()
            .map_err(OrchestratorError::config)?;
        Ok(Self {
            pool: Arc::new(pool),
            threads,
        })
    }

    /// 75% of the available cores
    pub fn with_default_threads() -> Result<Self> {
        Self::new(num_cpus::get() * 3 / 4)
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `task` on the pool; a panic becomes `FeatureSelectionRuntime`
    pub async fn run<T, F>(&self, task: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.pool.spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(task));
            if tx.send(result).is_err() {
                debug!("Feature selection result dropped (caller went away)");
            }
        });

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(panic)) => Err(OrchestratorError::FeatureSelectionRuntime(
                FeatureSelectionError::Runtime(format!(
                    "worker panicked: {}",
                    panic_message(panic.as_ref())
                )),
            )),
            Err(_) => Err(OrchestratorError::FeatureSelectionRuntime(
                FeatureSelectionError::Runtime("worker exited without a result".to_string()),
            )),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_runs_task_off_the_runtime() {
        let pool = FeatureSelectionPool::new(2).unwrap();
        let name = pool
            .run(|| std::thread::current().name().map(str::to_string))
            .await
            .unwrap();
        assert!(name.unwrap().starts_with("jitmine-fs-"));
    }

    #[tokio::test]
    async fn test_panic_is_reported_as_runtime_error() {
        let pool = FeatureSelectionPool::new(1).unwrap();
        let err = pool
            .run(|| -> usize { panic!("singular matrix") })
            .await
            .unwrap_err();
        match err {
            OrchestratorError::FeatureSelectionRuntime(FeatureSelectionError::Runtime(msg)) => {
                assert!(msg.contains("singular matrix"))
            }
            other => panic!("expected FeatureSelectionRuntime, got {:?}", other),
        }

        // Pool still usable afterwards
        assert_eq!(pool.run(|| 7).await.unwrap(), 7);
    }

    #[test]
    fn test_thread_count_has_floor_of_one() {
        assert_eq!(FeatureSelectionPool::new(0).unwrap().threads(), 1);
    }
}
