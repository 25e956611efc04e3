use super::context::{IngestionServices, ServiceFactory};
use crate::error::{OrchestratorError, Result};
use jitmine_core::features::bug_linking::{
    GithubIssueTracker, IssueLinker, IssueTracker, StaticIssueTracker,
};
use jitmine_core::features::guru_metrics::GuruMetricsCalculator;
use jitmine_core::features::structural_metrics::CommandMetricsRunner;
use jitmine_core::{GitVcs, MinerConfig};
use jitmine_storage::MetricsStore;
use std::sync::Arc;
use tracing::warn;

/// Production services built from `MinerConfig`
///
/// - git working copy at `<workspace_dir>/<repo_id>`
/// - GitHub issues when the URL is a GitHub one, otherwise keyword-only
///   fix detection
/// - the configured structural-metrics command
pub struct ConfiguredServiceFactory {
    config: MinerConfig,
    store: Arc<dyn MetricsStore>,
    calculator: Arc<GuruMetricsCalculator>,
    linker: Arc<IssueLinker>,
}

impl ConfiguredServiceFactory {
    pub fn new(config: MinerConfig, store: Arc<dyn MetricsStore>) -> Result<Self> {
        let calculator = GuruMetricsCalculator::new(config.guru.fix_keywords.as_slice())
            .map_err(OrchestratorError::config)?;
        let linker =
            IssueLinker::new(&config.issues.key_pattern).map_err(OrchestratorError::config)?;
        Ok(Self {
            config,
            store,
            calculator: Arc::new(calculator),
            linker: Arc::new(linker),
        })
    }

    fn issue_tracker(&self, repo_url: &str) -> Arc<dyn IssueTracker> {
        let token = std::env::var(&self.config.issues.token_env)
            .ok()
            .filter(|t| !t.is_empty());
        let labels = self.config.issues.bug_labels.clone();
        match GithubIssueTracker::from_repo_url(repo_url, labels, token) {
            Ok(tracker) => Arc::new(tracker),
            Err(e) => {
                warn!("{}; falling back to keyword-based fix detection", e);
                Arc::new(StaticIssueTracker::new(Vec::new()))
            }
        }
    }
}

impl ServiceFactory for ConfiguredServiceFactory {
    fn services_for(&self, repo_id: &str, repo_url: &str) -> Result<IngestionServices> {
        let metrics = &self.config.structural_metrics;
        Ok(IngestionServices {
            vcs: Arc::new(GitVcs::new(
                self.config.repo_dir(repo_id),
                self.config.git.binary.clone(),
            )),
            store: self.store.clone(),
            metrics_runner: Arc::new(CommandMetricsRunner::new(
                metrics.program.clone(),
                metrics.args.clone(),
                metrics.output_file.clone(),
                self.config.metrics_scratch_dir().join(repo_id),
            )),
            issue_tracker: self.issue_tracker(repo_url),
            calculator: self.calculator.clone(),
            linker: self.linker.clone(),
            bug_labels: self.config.issues.bug_labels.clone(),
        })
    }
}
