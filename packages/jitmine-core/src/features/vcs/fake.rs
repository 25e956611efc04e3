/// Scripted in-memory `VersionControl` double
use super::commit::{CommitHash, LineRange, RawCommit};
use super::error::{Result, VcsError};
use super::git::{CommandOutput, VersionControl};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// In-memory repository history for pipeline tests
///
/// Commits are kept oldest-first. `remote_only` commits are "on the remote"
/// until `fetch_commit` brings them in. Every mutating call is recorded in
/// `calls()` so tests can assert ordering.
pub struct FakeVcs {
    repo_path: PathBuf,
    commits: Vec<RawCommit>,
    refs: HashMap<String, CommitHash>,
    remote_only: Mutex<HashSet<CommitHash>>,
    deleted: HashMap<CommitHash, BTreeMap<String, Vec<LineRange>>>,
    blame: HashMap<(CommitHash, String), Vec<CommitHash>>,
    fail_checkout: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeVcs {
    pub fn new(repo_path: impl AsRef<Path>, commits: Vec<RawCommit>) -> Self {
        let mut refs = HashMap::new();
        if let Some(last) = commits.last() {
            refs.insert("HEAD".to_string(), last.hash.clone());
            refs.insert("main".to_string(), last.hash.clone());
        }
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
            commits,
            refs,
            remote_only: Mutex::new(HashSet::new()),
            deleted: HashMap::new(),
            blame: HashMap::new(),
            fail_checkout: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_ref(mut self, name: &str, hash: CommitHash) -> Self {
        self.refs.insert(name.to_string(), hash);
        self
    }

    /// Pretend `hash` exists only on the remote
    pub fn with_remote_only(self, hash: CommitHash) -> Self {
        self.remote_only
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(hash);
        self
    }

    /// Lines deleted by `fix` relative to its parent
    pub fn with_deleted_lines(
        mut self,
        fix: CommitHash,
        path: &str,
        ranges: Vec<LineRange>,
    ) -> Self {
        self.deleted
            .entry(fix)
            .or_default()
            .insert(path.to_string(), ranges);
        self
    }

    /// Blame answer for `path` at `revision`
    pub fn with_blame(mut self, revision: CommitHash, path: &str, culprits: Vec<CommitHash>) -> Self {
        self.blame.insert((revision, path.to_string()), culprits);
        self
    }

    pub fn failing_checkout(mut self) -> Self {
        self.fail_checkout = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    fn is_local(&self, hash: &CommitHash) -> bool {
        let remote_only = self.remote_only.lock().unwrap_or_else(|e| e.into_inner());
        self.commits.iter().any(|c| &c.hash == hash) && !remote_only.contains(hash)
    }

    fn failed(command: &str, stderr: &str) -> VcsError {
        VcsError::CommandFailed {
            command: command.to_string(),
            exit_code: Some(128),
            stderr: stderr.to_string(),
        }
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    async fn run_command(&self, args: &[&str]) -> Result<CommandOutput> {
        self.record(format!("run {}", args.join(" ")));
        Ok(CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
        })
    }

    async fn resolve_ref(&self, reference: &str) -> Result<CommitHash> {
        if let Some(hash) = self.refs.get(reference) {
            return Ok(hash.clone());
        }
        if let Ok(hash) = CommitHash::parse(reference) {
            return Ok(hash);
        }
        self.commits
            .iter()
            .find(|c| c.hash.as_str().starts_with(reference))
            .map(|c| c.hash.clone())
            .ok_or_else(|| Self::failed("git rev-parse", "fatal: unknown revision"))
    }

    async fn parent_hash(&self, hash: &CommitHash) -> Result<Option<CommitHash>> {
        self.commits
            .iter()
            .find(|c| &c.hash == hash)
            .map(|c| c.first_parent().cloned())
            .ok_or_else(|| Self::failed("git rev-list", "fatal: bad object"))
    }

    async fn commit_exists(&self, hash: &CommitHash) -> Result<bool> {
        Ok(self.is_local(hash))
    }

    async fn clone_or_fetch(&self, url: &str) -> Result<()> {
        self.record(format!("clone_or_fetch {}", url));
        Ok(())
    }

    async fn fetch_commit(&self, hash: &CommitHash) -> Result<()> {
        self.record(format!("fetch {}", hash));
        let mut remote_only = self.remote_only.lock().unwrap_or_else(|e| e.into_inner());
        if remote_only.remove(hash) || self.commits.iter().any(|c| &c.hash == hash) {
            Ok(())
        } else {
            Err(Self::failed("git fetch", "fatal: remote error: not our ref"))
        }
    }

    async fn checkout(&self, hash: &CommitHash, force: bool) -> Result<()> {
        self.record(format!("checkout {}{}", hash, if force { " --force" } else { "" }));
        if self.fail_checkout || !self.is_local(hash) {
            return Err(Self::failed("git checkout", "fatal: reference is not a tree"));
        }
        Ok(())
    }

    async fn default_branch(&self) -> Result<String> {
        Ok("main".to_string())
    }

    async fn find_commit_before_timestamp(
        &self,
        timestamp: i64,
        _root: &str,
    ) -> Result<Option<CommitHash>> {
        Ok(self
            .commits
            .iter()
            .filter(|c| c.author_timestamp < timestamp)
            .max_by_key(|c| c.author_timestamp)
            .map(|c| c.hash.clone()))
    }

    async fn log_with_numstat(&self, revision: &str) -> Result<Vec<RawCommit>> {
        let tip = self.resolve_ref(revision).await?;
        let end = self
            .commits
            .iter()
            .position(|c| c.hash == tip)
            .ok_or_else(|| Self::failed("git log", "fatal: bad revision"))?;
        Ok(self.commits[..=end].to_vec())
    }

    async fn deleted_line_ranges(
        &self,
        _parent: &CommitHash,
        commit: &CommitHash,
    ) -> Result<BTreeMap<String, Vec<LineRange>>> {
        Ok(self.deleted.get(commit).cloned().unwrap_or_default())
    }

    async fn blame_lines(
        &self,
        revision: &CommitHash,
        path: &str,
        _ranges: &[LineRange],
    ) -> Result<Vec<CommitHash>> {
        Ok(self
            .blame
            .get(&(revision.clone(), path.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
