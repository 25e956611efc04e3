/// Commit Guru metrics row
use crate::features::vcs::CommitHash;
use serde::{Deserialize, Serialize};

/// One row per commit, keyed by `commit_hash`
///
/// Produced by the calculate step, persisted by the persist step, and later
/// mutated by bug linking (`fixes`, `contains_bug`, `fixing_commits`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitGuruMetrics {
    pub commit_hash: CommitHash,
    pub parent_hashes: Vec<CommitHash>,
    pub author_email: String,
    pub author_timestamp: i64,
    pub message: String,

    /// Subsystems (top-level directories) touched
    pub ns: u32,
    /// Directories touched
    pub nd: u32,
    /// Files touched
    pub nf: u32,
    /// Distribution of modified lines across files, normalized to [0, 1]
    pub entropy: f64,
    pub la: u32,
    pub ld: u32,
    /// Mean size in lines of the touched files before the change
    pub lt: f64,
    pub fix: bool,
    pub ndev: u32,
    /// Mean days since the touched files were last changed
    pub age: f64,
    pub nuc: u32,
    pub exp: u32,
    pub rexp: f64,
    pub sexp: u32,

    /// Issue ids this commit resolves
    #[serde(default)]
    pub fixes: Vec<String>,
    #[serde(default)]
    pub contains_bug: bool,
    /// Fix commits whose blame pointed at this commit
    #[serde(default)]
    pub fixing_commits: Vec<CommitHash>,
}

impl CommitGuruMetrics {
    /// Feature names in column order
    pub const FEATURES: [&'static str; 14] = [
        "ns", "nd", "nf", "entropy", "la", "ld", "lt", "fix", "ndev", "age", "nuc", "exp",
        "rexp", "sexp",
    ];

    /// Numeric feature values aligned with `FEATURES`
    pub fn feature_values(&self) -> [f64; 14] {
        [
            self.ns as f64,
            self.nd as f64,
            self.nf as f64,
            self.entropy,
            self.la as f64,
            self.ld as f64,
            self.lt,
            if self.fix { 1.0 } else { 0.0 },
            self.ndev as f64,
            self.age,
            self.nuc as f64,
            self.exp as f64,
            self.rexp,
            self.sexp as f64,
        ]
    }

    /// Merge the bug-linking fields of a previously stored row
    ///
    /// Labels come from other commits' fixes, so recomputing this row's
    /// metrics never clears them.
    pub fn carry_labels_from(&mut self, stored: &CommitGuruMetrics) {
        self.contains_bug |= stored.contains_bug;
        for fix in &stored.fixing_commits {
            if !self.fixing_commits.contains(fix) {
                self.fixing_commits.push(fix.clone());
            }
        }
        if self.fixes.is_empty() {
            self.fixes = stored.fixes.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: u8) -> CommitGuruMetrics {
        CommitGuruMetrics {
            commit_hash: CommitHash::parse(&format!("{:040x}", n)).unwrap(),
            parent_hashes: vec![],
            author_email: "dev@acme.io".to_string(),
            author_timestamp: i64::from(n),
            message: "change".to_string(),
            ns: 1,
            nd: 1,
            nf: 1,
            entropy: 0.0,
            la: 1,
            ld: 0,
            lt: 0.0,
            fix: false,
            ndev: 1,
            age: 0.0,
            nuc: 1,
            exp: 0,
            rexp: 0.0,
            sexp: 0,
            fixes: vec![],
            contains_bug: false,
            fixing_commits: vec![],
        }
    }

    #[test]
    fn test_recomputed_row_keeps_stored_labels() {
        let fix_a = CommitHash::parse(&"a".repeat(40)).unwrap();
        let fix_b = CommitHash::parse(&"b".repeat(40)).unwrap();

        let mut stored = row(2);
        stored.contains_bug = true;
        stored.fixing_commits = vec![fix_a.clone()];
        stored.fixes = vec!["17".to_string()];

        let mut fresh = row(2);
        fresh.la = 9;
        fresh.fixing_commits = vec![fix_b.clone(), fix_a.clone()];
        fresh.carry_labels_from(&stored);

        assert!(fresh.contains_bug);
        assert_eq!(fresh.fixing_commits, vec![fix_b, fix_a]);
        assert_eq!(fresh.fixes, vec!["17".to_string()]);
        assert_eq!(fresh.la, 9);
    }

    #[test]
    fn test_unlabelled_stored_row_changes_nothing() {
        let mut fresh = row(3);
        fresh.fixes = vec!["4".to_string()];
        let before = fresh.clone();
        fresh.carry_labels_from(&row(3));
        assert_eq!(fresh, before);
    }
}
