/// Commit identity and raw history records
use super::error::{Result, VcsError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Full 40-character lowercase hexadecimal commit hash
///
/// Immutable once observed. Every hash produced by the adapter goes through
/// `CommitHash::parse`, so holders never need to re-validate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitHash(String);

impl CommitHash {
    pub const LEN: usize = 40;

    /// Parse and normalize a hash (surrounding whitespace is ignored)
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.len() != Self::LEN || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(VcsError::InvalidHash(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> &str {
        &self.0[..10]
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CommitHash {
    type Error = VcsError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CommitHash> for String {
    fn from(hash: CommitHash) -> Self {
        hash.0
    }
}

impl AsRef<str> for CommitHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Per-file line counts of a commit (`git log --numstat`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub added: u32,
    pub deleted: u32,
}

/// A commit as observed by a history query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCommit {
    pub hash: CommitHash,
    pub parents: Vec<CommitHash>,
    pub author_email: String,
    /// Unix seconds
    pub author_timestamp: i64,
    pub message: String,
    pub file_changes: Vec<FileChange>,
}

impl RawCommit {
    pub fn first_parent(&self) -> Option<&CommitHash> {
        self.parents.first()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Inclusive, 1-indexed line range in a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub count: u32,
}

impl LineRange {
    pub fn new(start: u32, count: u32) -> Self {
        Self { start, count }
    }

    /// `-L` argument understood by `git blame`
    pub fn as_blame_arg(&self) -> String {
        format!("{},+{}", self.start, self.count)
    }
}
