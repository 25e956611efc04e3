/// Structural metrics tool runner
use super::error::MetricsToolError;
use super::table::{parse_metrics_csv, StructuralMetricsTable};
use crate::features::vcs::CommitHash;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info};

#[async_trait]
pub trait StructuralMetricsRunner: Send + Sync {
    /// Measure the working copy at `repo_dir`, which must already be at `commit`
    async fn run(
        &self,
        repo_dir: &Path,
        commit: &CommitHash,
    ) -> Result<StructuralMetricsTable, MetricsToolError>;
}

/// Runs a configured program and parses the CSV it writes
///
/// `args` may contain `{repo}` and `{output}` placeholders. The tool writes
/// `output_file` into a per-commit scratch directory under `scratch_root`,
/// which is removed after parsing.
#[derive(Debug, Clone)]
pub struct CommandMetricsRunner {
    program: String,
    args: Vec<String>,
    output_file: String,
    scratch_root: PathBuf,
}

impl CommandMetricsRunner {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        output_file: impl Into<String>,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            output_file: output_file.into(),
            scratch_root: scratch_root.into(),
        }
    }

    fn render_args(&self, repo_dir: &Path, output_dir: &Path) -> Vec<String> {
        let repo = repo_dir.to_string_lossy();
        let output = output_dir.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{repo}", &repo).replace("{output}", &output))
            .collect()
    }
}

#[async_trait]
impl StructuralMetricsRunner for CommandMetricsRunner {
    async fn run(
        &self,
        repo_dir: &Path,
        commit: &CommitHash,
    ) -> Result<StructuralMetricsTable, MetricsToolError> {
        let output_dir = self.scratch_root.join(commit.as_str());
        tokio::fs::create_dir_all(&output_dir).await?;
        let args = self.render_args(repo_dir, &output_dir);

        info!("Running {} for commit {}", self.program, commit.short());
        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(repo_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| MetricsToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            error!(
                "{} failed on {} ({:?}): {}",
                self.program,
                commit.short(),
                output.status.code(),
                stderr.trim()
            );
            let _ = tokio::fs::remove_dir_all(&output_dir).await;
            return Err(MetricsToolError::Failed {
                program: self.program.clone(),
                exit_code: output.status.code(),
                stderr,
            });
        }

        let csv_path = output_dir.join(&self.output_file);
        let text = match tokio::fs::read_to_string(&csv_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let _ = tokio::fs::remove_dir_all(&output_dir).await;
                return Err(MetricsToolError::MissingOutput(
                    csv_path.display().to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        let _ = tokio::fs::remove_dir_all(&output_dir).await;

        let table = parse_metrics_csv(commit, &text)?;
        info!(
            "{}: {} entities x {} metrics at {}",
            self.program,
            table.rows.len(),
            table.columns.len(),
            commit.short()
        );
        Ok(table)
    }
}

/// Pre-computed tables keyed by commit (tests, replays)
#[derive(Debug, Clone, Default)]
pub struct StaticMetricsRunner {
    tables: HashMap<CommitHash, StructuralMetricsTable>,
}

impl StaticMetricsRunner {
    pub fn new(tables: Vec<StructuralMetricsTable>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|t| (t.commit_hash.clone(), t))
                .collect(),
        }
    }
}

#[async_trait]
impl StructuralMetricsRunner for StaticMetricsRunner {
    async fn run(
        &self,
        _repo_dir: &Path,
        commit: &CommitHash,
    ) -> Result<StructuralMetricsTable, MetricsToolError> {
        self.tables.get(commit).cloned().ok_or_else(|| MetricsToolError::Failed {
            program: "static".to_string(),
            exit_code: Some(1),
            stderr: format!("no metrics recorded for {}", commit),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit() -> CommitHash {
        CommitHash::parse("0000000000000000000000000000000000000abc").unwrap()
    }

    #[test]
    fn test_render_args_substitutes_placeholders() {
        let runner = CommandMetricsRunner::new(
            "java",
            vec!["-jar".into(), "ck.jar".into(), "{repo}".into(), "{output}/".into()],
            "class.csv",
            "/scratch",
        );
        let args = runner.render_args(Path::new("/work/repo"), Path::new("/scratch/abc"));
        assert_eq!(args, vec!["-jar", "ck.jar", "/work/repo", "/scratch/abc/"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tool_writing_csv_is_parsed() {
        let repo = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let runner = CommandMetricsRunner::new(
            "sh",
            vec![
                "-c".into(),
                "printf 'file,class,cbo\\nA.java,A,4\\n' > {output}/class.csv".into(),
            ],
            "class.csv",
            scratch.path(),
        );

        let table = runner.run(repo.path(), &commit()).await.unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].metrics["cbo"], 4.0);
        assert!(!scratch.path().join(commit().as_str()).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_fatal() {
        let repo = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let runner = CommandMetricsRunner::new(
            "sh",
            vec!["-c".into(), "echo boom >&2; exit 3".into()],
            "class.csv",
            scratch.path(),
        );

        match runner.run(repo.path(), &commit()).await {
            Err(MetricsToolError::Failed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(3));
                assert!(stderr.contains("boom"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_output_is_fatal() {
        let repo = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let runner = CommandMetricsRunner::new("true", vec![], "class.csv", scratch.path());

        assert!(matches!(
            runner.run(repo.path(), &commit()).await,
            Err(MetricsToolError::MissingOutput(_))
        ));
    }
}
