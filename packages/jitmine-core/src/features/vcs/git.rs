/// Git command executor
use super::commit::{CommitHash, FileChange, LineRange, RawCommit};
use super::error::{Result, VcsError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error};

/// Structured result of one process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Version-control capability set
///
/// One production implementation (`GitVcs`) and one scripted double
/// (`FakeVcs`). All operations act on a single working copy.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Working-copy directory
    fn repo_path(&self) -> &Path;

    /// Run an arbitrary command against the working copy
    ///
    /// Non-zero exits are returned as `CommandOutput`, not errors; callers
    /// that need the failure typed go through the higher-level operations.
    async fn run_command(&self, args: &[&str]) -> Result<CommandOutput>;

    /// Resolve a symbolic reference (branch, tag, `HEAD~3`, short hash)
    async fn resolve_ref(&self, reference: &str) -> Result<CommitHash>;

    /// First parent of `hash`; `None` for a root commit
    async fn parent_hash(&self, hash: &CommitHash) -> Result<Option<CommitHash>>;

    /// Whether the commit object is present locally
    async fn commit_exists(&self, hash: &CommitHash) -> Result<bool>;

    /// Clone `url` into the working copy, or fetch when it already exists
    ///
    /// After a fetch, local branches point where origin's branches do.
    async fn clone_or_fetch(&self, url: &str) -> Result<()>;

    /// Fetch a single commit from `origin`
    async fn fetch_commit(&self, hash: &CommitHash) -> Result<()>;

    /// Check out a commit (detached HEAD)
    async fn checkout(&self, hash: &CommitHash, force: bool) -> Result<()>;

    /// Default branch of `origin` (e.g. "main")
    async fn default_branch(&self) -> Result<String>;

    /// Most recent commit reachable from `root` strictly before `timestamp`
    async fn find_commit_before_timestamp(
        &self,
        timestamp: i64,
        root: &str,
    ) -> Result<Option<CommitHash>>;

    /// Oldest-first history of `revision` with per-file numstat
    async fn log_with_numstat(&self, revision: &str) -> Result<Vec<RawCommit>>;

    /// Line ranges removed between `parent` and `commit`, keyed by path in `parent`
    async fn deleted_line_ranges(
        &self,
        parent: &CommitHash,
        commit: &CommitHash,
    ) -> Result<BTreeMap<String, Vec<LineRange>>>;

    /// Commits that last touched `ranges` of `path` as of `revision`
    async fn blame_lines(
        &self,
        revision: &CommitHash,
        path: &str,
        ranges: &[LineRange],
    ) -> Result<Vec<CommitHash>>;
}

/// Git command executor
///
/// Executes git commands in a repository. Processes are killed when the
/// awaiting future is dropped, so an aborted run never leaves a checkout
/// half-applied in the background.
#[derive(Debug, Clone)]
pub struct GitVcs {
    repo_path: PathBuf,
    binary: String,
}

impl GitVcs {
    /// Executor for a working copy that may not exist yet (clone target)
    pub fn new(repo_path: impl AsRef<Path>, binary: impl Into<String>) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
            binary: binary.into(),
        }
    }

    /// Executor for an existing working copy
    pub fn open(repo_path: impl AsRef<Path>, binary: impl Into<String>) -> Result<Self> {
        let path = repo_path.as_ref().to_path_buf();

        if !path.join(".git").exists() {
            return Err(VcsError::NotARepository(path.display().to_string()));
        }

        Ok(Self::new(path, binary))
    }

    async fn exec(&self, cwd: &Path, args: &[&str]) -> Result<CommandOutput> {
        debug!("{} {} (in {})", self.binary, args.join(" "), cwd.display());
        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        })
    }

    /// Run and turn a non-zero exit into `CommandFailed`
    async fn run_checked(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        let output = self.exec(cwd, args).await?;
        if output.success() {
            return Ok(output.stdout);
        }

        let command = format!("{} {}", self.binary, args.join(" "));
        error!(
            "{} exited with {:?}: {}",
            command,
            output.exit_code,
            output.stderr.trim()
        );
        Err(VcsError::CommandFailed {
            command,
            exit_code: output.exit_code,
            stderr: output.stderr,
        })
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        self.run_checked(&self.repo_path, args).await
    }
}

#[async_trait]
impl VersionControl for GitVcs {
    fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    async fn run_command(&self, args: &[&str]) -> Result<CommandOutput> {
        self.exec(&self.repo_path, args).await
    }

    async fn resolve_ref(&self, reference: &str) -> Result<CommitHash> {
        let spec = format!("{}^{{commit}}", reference);
        let stdout = self.git(&["rev-parse", "--verify", &spec]).await?;
        CommitHash::parse(&stdout)
    }

    async fn parent_hash(&self, hash: &CommitHash) -> Result<Option<CommitHash>> {
        // `rev-list --parents -n 1` prints "<hash> <parent>..." and works for roots
        let stdout = self
            .git(&["rev-list", "--parents", "-n", "1", hash.as_str()])
            .await?;
        match stdout.split_whitespace().nth(1) {
            Some(parent) => Ok(Some(CommitHash::parse(parent)?)),
            None => Ok(None),
        }
    }

    async fn commit_exists(&self, hash: &CommitHash) -> Result<bool> {
        let spec = format!("{}^{{commit}}", hash);
        let output = self.run_command(&["cat-file", "-e", &spec]).await?;
        Ok(output.success())
    }

    async fn clone_or_fetch(&self, url: &str) -> Result<()> {
        if self.repo_path.join(".git").exists() {
            // Local branches mirror origin so history queries by branch name
            // see new upstream commits. Checkouts are detached, so moving the
            // branch under the working tree is harmless.
            self.git(&[
                "fetch",
                "--prune",
                "--tags",
                "--update-head-ok",
                "origin",
                "+refs/heads/*:refs/heads/*",
                "+refs/heads/*:refs/remotes/origin/*",
            ])
            .await?;
            return Ok(());
        }

        let parent = self
            .repo_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&parent).await?;
        let dest = self.repo_path.to_string_lossy().to_string();
        self.run_checked(&parent, &["clone", url, &dest]).await?;
        Ok(())
    }

    async fn fetch_commit(&self, hash: &CommitHash) -> Result<()> {
        self.git(&["fetch", "origin", hash.as_str()]).await?;
        Ok(())
    }

    async fn checkout(&self, hash: &CommitHash, force: bool) -> Result<()> {
        let mut args = vec!["checkout", "--quiet"];
        if force {
            args.push("--force");
        }
        args.push(hash.as_str());
        self.git(&args).await?;
        Ok(())
    }

    async fn default_branch(&self) -> Result<String> {
        let remote_head = self
            .run_command(&["symbolic-ref", "--short", "refs/remotes/origin/HEAD"])
            .await?;
        if remote_head.success() {
            let name = remote_head.stdout.trim();
            return Ok(name.strip_prefix("origin/").unwrap_or(name).to_string());
        }

        let current = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        Ok(current.trim().to_string())
    }

    async fn find_commit_before_timestamp(
        &self,
        timestamp: i64,
        root: &str,
    ) -> Result<Option<CommitHash>> {
        // --before is inclusive; shift by one second for "strictly before"
        let Some(cutoff) = timestamp.checked_sub(1) else {
            return Ok(None);
        };
        let before = format!("--before=@{}", cutoff);
        let stdout = self
            .git(&["rev-list", "-1", "--date-order", &before, root])
            .await?;
        let line = stdout.trim();
        if line.is_empty() {
            return Ok(None);
        }
        Ok(Some(CommitHash::parse(line)?))
    }

    async fn log_with_numstat(&self, revision: &str) -> Result<Vec<RawCommit>> {
        let stdout = self
            .git(&[
                "log",
                revision,
                "--reverse",
                "--no-renames",
                "--numstat",
                LOG_FORMAT,
            ])
            .await?;
        parse_numstat_log(&stdout)
    }

    async fn deleted_line_ranges(
        &self,
        parent: &CommitHash,
        commit: &CommitHash,
    ) -> Result<BTreeMap<String, Vec<LineRange>>> {
        let stdout = self
            .git(&[
                "diff",
                "-U0",
                "--no-renames",
                "--no-color",
                parent.as_str(),
                commit.as_str(),
            ])
            .await?;
        parse_deleted_ranges(&stdout)
    }

    async fn blame_lines(
        &self,
        revision: &CommitHash,
        path: &str,
        ranges: &[LineRange],
    ) -> Result<Vec<CommitHash>> {
        if ranges.is_empty() {
            return Ok(Vec::new());
        }

        let range_args: Vec<String> = ranges.iter().map(LineRange::as_blame_arg).collect();
        let mut args = vec!["blame", "--porcelain", "-w"];
        for range in &range_args {
            args.push("-L");
            args.push(range);
        }
        args.push(revision.as_str());
        args.push("--");
        args.push(path);

        let stdout = self.git(&args).await?;
        Ok(parse_blame_porcelain(&stdout))
    }
}

/// Record separator before each commit, unit separator between fields
const LOG_FORMAT: &str = "--format=%x1e%H%x1f%P%x1f%ae%x1f%at%x1f%B%x1f";

/// Parse `git log --numstat` output produced with `LOG_FORMAT`
pub fn parse_numstat_log(stdout: &str) -> Result<Vec<RawCommit>> {
    let mut commits = Vec::new();

    for record in stdout.split('\x1e').filter(|r| !r.trim().is_empty()) {
        let fields: Vec<&str> = record.splitn(6, '\x1f').collect();
        if fields.len() != 6 {
            return Err(VcsError::ParseError(format!(
                "malformed log record ({} fields)",
                fields.len()
            )));
        }

        let hash = CommitHash::parse(fields[0])?;
        let parents = fields[1]
            .split_whitespace()
            .map(CommitHash::parse)
            .collect::<Result<Vec<_>>>()?;
        let author_timestamp = fields[3].trim().parse::<i64>().map_err(|e| {
            VcsError::ParseError(format!("bad timestamp for {}: {}", hash.short(), e))
        })?;

        let file_changes = fields[5]
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(parse_numstat_line)
            .collect::<Result<Vec<_>>>()?;

        commits.push(RawCommit {
            hash,
            parents,
            author_email: fields[2].trim().to_string(),
            author_timestamp,
            message: fields[4].trim().to_string(),
            file_changes,
        });
    }

    Ok(commits)
}

fn parse_numstat_line(line: &str) -> Result<FileChange> {
    let mut parts = line.splitn(3, '\t');
    let (added, deleted, path) = match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(d), Some(p)) => (a, d, p),
        _ => return Err(VcsError::ParseError(format!("bad numstat line: {:?}", line))),
    };

    // Binary files report "-"
    let count = |s: &str| -> Result<u32> {
        if s == "-" {
            return Ok(0);
        }
        s.parse::<u32>()
            .map_err(|e| VcsError::ParseError(format!("bad numstat count {:?}: {}", s, e)))
    };

    Ok(FileChange {
        path: path.trim().to_string(),
        added: count(added.trim())?,
        deleted: count(deleted.trim())?,
    })
}

/// Parse `git diff -U0` hunks into deleted ranges on the old side
pub fn parse_deleted_ranges(diff: &str) -> Result<BTreeMap<String, Vec<LineRange>>> {
    let mut ranges: BTreeMap<String, Vec<LineRange>> = BTreeMap::new();
    let mut current: Option<String> = None;

    for line in diff.lines() {
        if line.starts_with("diff --git ") {
            current = None;
        } else if let Some(old) = line.strip_prefix("--- ") {
            // New files have no old side to blame
            current = old.strip_prefix("a/").map(str::to_string);
        } else if line.starts_with("@@") {
            let Some(path) = current.as_ref() else {
                continue;
            };
            let range = parse_hunk_old_side(line)?;
            if range.count > 0 {
                ranges.entry(path.clone()).or_default().push(range);
            }
        }
    }

    Ok(ranges)
}

/// "@@ -12,3 +12,0 @@" -> LineRange { start: 12, count: 3 }
fn parse_hunk_old_side(header: &str) -> Result<LineRange> {
    let old = header
        .split_whitespace()
        .find_map(|tok| tok.strip_prefix('-'))
        .ok_or_else(|| VcsError::ParseError(format!("bad hunk header: {:?}", header)))?;

    let mut parts = old.splitn(2, ',');
    let parse = |s: &str| {
        s.parse::<u32>()
            .map_err(|e| VcsError::ParseError(format!("bad hunk header {:?}: {}", header, e)))
    };
    let start = parse(parts.next().unwrap_or(""))?;
    let count = match parts.next() {
        Some(c) => parse(c)?,
        None => 1,
    };
    Ok(LineRange::new(start, count))
}

/// Distinct commit hashes from `git blame --porcelain`, in first-seen order
pub fn parse_blame_porcelain(stdout: &str) -> Vec<CommitHash> {
    let mut seen = Vec::new();
    for line in stdout.lines() {
        if line.starts_with('\t') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let (Some(first), Some(_orig), Some(_final)) = (tokens.next(), tokens.next(), tokens.next())
        else {
            continue;
        };
        if let Ok(hash) = CommitHash::parse(first) {
            if !seen.contains(&hash) {
                seen.push(hash);
            }
        }
    }
    seen
}
