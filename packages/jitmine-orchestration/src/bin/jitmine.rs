//! jitmine - mine repositories and generate defect-prediction datasets
//!
//! Usage:
//!   jitmine --config jitmine.yaml ingest --repo-id widgets --url https://github.com/acme/widgets
//!   jitmine ingest --repo-id widgets --url ... --commit 3f2a9c1 --before 1700000000
//!   jitmine generate-dataset --dataset datasets/widgets-mrmr.yaml
//!   jitmine resume --job failed-job.json
//!   jitmine algorithms
//!
//! The final job is printed as JSON on stdout (logs go to stderr). With a
//! `database_path` configured, a failed job printed this way can be handed
//! to `resume`, which skips the steps it already persisted.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use jitmine_core::{FeatureSelectionFactory, MinerConfig};
use jitmine_orchestration::{
    CheckpointManager, CommitTarget, ConfiguredServiceFactory, DatasetServices, Job, JobState,
    Orchestrator,
};
use jitmine_storage::{
    CheckpointStore, DatasetRecord, DatasetStore, InMemoryMetricsStore, LocalArtifactStore,
    MetricsStore, SqliteMetricsStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jitmine", about = "Just-in-time defect prediction mining")]
struct Cli {
    /// YAML configuration (defaults + JITMINE_* overrides when omitted)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine a repository (full history unless targets are given)
    Ingest {
        #[arg(long)]
        repo_id: String,
        #[arg(long)]
        url: String,
        /// Commit hash or ref to mine (repeatable)
        #[arg(long = "commit", value_name = "REV")]
        commits: Vec<String>,
        /// Mine the last commit before this unix timestamp (repeatable)
        #[arg(long = "before", value_name = "UNIX_TS")]
        before: Vec<i64>,
    },
    /// Register a dataset definition and generate it
    GenerateDataset {
        /// YAML file with `id`, `repo_id` and `config`
        #[arg(long, value_name = "FILE")]
        dataset: PathBuf,
    },
    /// Re-run a failed job from its last persisted step
    Resume {
        /// Job JSON as printed by an earlier `ingest` or `generate-dataset`
        #[arg(long, value_name = "FILE")]
        job: PathBuf,
    },
    /// List feature-selection algorithms as JSON
    Algorithms,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => MinerConfig::from_yaml(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => MinerConfig::from_env().context("loading configuration from environment")?,
    };

    if let Command::Algorithms = cli.command {
        return print_algorithms();
    }

    let (metrics, datasets, checkpoints) = match &config.database_path {
        Some(path) => {
            let store = Arc::new(
                SqliteMetricsStore::new(path)
                    .with_context(|| format!("opening database {}", path.display()))?,
            );
            (
                store.clone() as Arc<dyn MetricsStore>,
                store.clone() as Arc<dyn DatasetStore>,
                Some(store as Arc<dyn CheckpointStore>),
            )
        }
        None => {
            warn!("No database_path configured; mined data lives only for this run");
            let store = Arc::new(InMemoryMetricsStore::new());
            (store.clone() as Arc<dyn MetricsStore>, store as Arc<dyn DatasetStore>, None)
        }
    };
    let dataset_services = DatasetServices::new(
        metrics.clone(),
        datasets.clone(),
        Arc::new(LocalArtifactStore::new(config.artifacts_dir.clone())),
        config.feature_selection.worker_threads,
    )?;
    let factory = ConfiguredServiceFactory::new(config, metrics)?;
    let mut orchestrator = Orchestrator::new(Arc::new(factory), Arc::new(dataset_services));
    let durable_checkpoints = checkpoints.is_some();
    if let Some(store) = checkpoints {
        orchestrator = orchestrator.with_checkpoints(CheckpointManager::new(store));
    }

    let job = match cli.command {
        Command::Ingest {
            repo_id,
            url,
            commits,
            before,
        } => {
            if commits.is_empty() && before.is_empty() {
                Job::full_history(repo_id, url)
            } else {
                let targets = commits
                    .into_iter()
                    .map(CommitTarget::rev)
                    .chain(before.into_iter().map(CommitTarget::before))
                    .collect();
                Job::single_commit(repo_id, url, targets)
            }
        }
        Command::GenerateDataset { dataset } => {
            let text = std::fs::read_to_string(&dataset)
                .with_context(|| format!("reading {}", dataset.display()))?;
            let record: DatasetRecord = serde_yaml::from_str(&text)
                .with_context(|| format!("parsing {}", dataset.display()))?;
            datasets.save_dataset(&record).await?;
            info!("Dataset {} registered for repo {}", record.id, record.repo_id);
            Job::dataset_generation(record.id)
        }
        Command::Resume { job } => {
            if !durable_checkpoints {
                bail!("resume needs a database_path; checkpoints of earlier runs are not kept");
            }
            let text = std::fs::read_to_string(&job)
                .with_context(|| format!("reading {}", job.display()))?;
            let job: Job = serde_json::from_str(&text)
                .with_context(|| format!("parsing job {}", job.display()))?;
            if !matches!(job.state, JobState::Failed { .. }) {
                bail!("job {} is {}, only failed jobs resume", job.id, job.state.state_name());
            }
            info!("Resuming job {}", job.id);
            job
        }
        Command::Algorithms => return print_algorithms(),
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let job = orchestrator.run_job(job, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&job)?);

    match &job.state {
        JobState::Completed { .. } => Ok(()),
        other => bail!("job {} ended {}", job.id, other.state_name()),
    }
}

fn print_algorithms() -> Result<()> {
    let definitions = FeatureSelectionFactory::with_defaults().definitions();
    println!("{}", serde_json::to_string_pretty(&definitions)?);
    Ok(())
}
