//! Commit Guru metric calculation over an oldest-first history walk

use super::domain::CommitGuruMetrics;
use crate::features::vcs::RawCommit;
use rayon::prelude::*;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::info;

const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_YEAR: f64 = 365.25 * SECONDS_PER_DAY;

/// Default fix keywords (corrective-maintenance vocabulary)
pub const DEFAULT_FIX_KEYWORDS: &[&str] = &[
    "fix", "bug", "defect", "patch", "crash", "error", "fault", "failure", "incorrect",
    "wrong", "issue", "problem", "resolve",
];

#[derive(Default)]
struct FileHistory {
    lines: i64,
    last_modified: Option<i64>,
    authors: HashSet<String>,
    commits: HashSet<u32>,
}

#[derive(Default)]
struct AuthorHistory {
    timestamps: Vec<i64>,
    subsystem_commits: HashMap<String, u32>,
}

/// Computes `CommitGuruMetrics` for a chronologically ordered history
pub struct GuruMetricsCalculator {
    fix_pattern: Regex,
}

impl GuruMetricsCalculator {
    pub fn new<S: AsRef<str>>(fix_keywords: &[S]) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = fix_keywords
            .iter()
            .map(|k| regex::escape(k.as_ref()))
            .collect();
        let fix_pattern = Regex::new(&format!(r"(?i)\b({})", alternatives.join("|")))?;
        Ok(Self { fix_pattern })
    }

    pub fn is_fix_message(&self, message: &str) -> bool {
        self.fix_pattern.is_match(message)
    }

    /// Walk `history` (oldest first) and emit one row per commit
    pub fn calculate(&self, history: &[RawCommit]) -> Vec<CommitGuruMetrics> {
        let entropies: Vec<f64> = history.par_iter().map(change_entropy).collect();

        let mut files: HashMap<String, FileHistory> = HashMap::new();
        let mut authors: HashMap<String, AuthorHistory> = HashMap::new();
        let mut rows = Vec::with_capacity(history.len());

        for (idx, commit) in history.iter().enumerate() {
            let ts = commit.author_timestamp;
            let subsystems: HashSet<String> = commit
                .file_changes
                .iter()
                .map(|f| subsystem_of(&f.path))
                .collect();
            let directories: HashSet<&str> = commit
                .file_changes
                .iter()
                .map(|f| directory_of(&f.path))
                .collect();

            let mut la = 0u32;
            let mut ld = 0u32;
            let mut prior_lines = 0i64;
            let mut ages = Vec::new();
            let mut devs: HashSet<&str> = HashSet::new();
            let mut prior_changes: HashSet<u32> = HashSet::new();

            for change in &commit.file_changes {
                la += change.added;
                ld += change.deleted;
                if let Some(history) = files.get(&change.path) {
                    prior_lines += history.lines.max(0);
                    if let Some(last) = history.last_modified {
                        ages.push((ts - last).max(0) as f64 / SECONDS_PER_DAY);
                    }
                    devs.extend(history.authors.iter().map(String::as_str));
                    prior_changes.extend(history.commits.iter().copied());
                }
            }

            let nf = commit.file_changes.len() as u32;
            let author = authors.get(&commit.author_email);
            let (exp, rexp, sexp) = match author {
                Some(a) => (
                    a.timestamps.len() as u32,
                    a.timestamps
                        .iter()
                        .map(|prev| 1.0 / ((ts - prev).max(0) as f64 / SECONDS_PER_YEAR + 1.0))
                        .sum(),
                    subsystems
                        .iter()
                        .map(|s| a.subsystem_commits.get(s).copied().unwrap_or(0))
                        .sum(),
                ),
                None => (0, 0.0, 0),
            };

            rows.push(CommitGuruMetrics {
                commit_hash: commit.hash.clone(),
                parent_hashes: commit.parents.clone(),
                author_email: commit.author_email.clone(),
                author_timestamp: ts,
                message: commit.message.clone(),
                ns: subsystems.len() as u32,
                nd: directories.len() as u32,
                nf,
                entropy: entropies[idx],
                la,
                ld,
                lt: if nf == 0 { 0.0 } else { prior_lines as f64 / nf as f64 },
                fix: self.is_fix_message(&commit.message),
                ndev: devs.len() as u32,
                age: if ages.is_empty() {
                    0.0
                } else {
                    ages.iter().sum::<f64>() / ages.len() as f64
                },
                nuc: prior_changes.len() as u32,
                exp,
                rexp,
                sexp,
                fixes: Vec::new(),
                contains_bug: false,
                fixing_commits: Vec::new(),
            });

            for change in &commit.file_changes {
                let history = files.entry(change.path.clone()).or_default();
                history.lines += change.added as i64 - change.deleted as i64;
                history.last_modified = Some(ts);
                history.authors.insert(commit.author_email.clone());
                history.commits.insert(idx as u32);
            }
            let author = authors.entry(commit.author_email.clone()).or_default();
            author.timestamps.push(ts);
            for subsystem in subsystems {
                *author.subsystem_commits.entry(subsystem).or_insert(0) += 1;
            }
        }

        info!(
            "GuruMetrics: computed {} rows over {} files / {} authors",
            rows.len(),
            files.len(),
            authors.len()
        );
        rows
    }
}

/// Shannon entropy of modified lines across files, normalized by log2(nf)
fn change_entropy(commit: &RawCommit) -> f64 {
    let changes: Vec<f64> = commit
        .file_changes
        .iter()
        .map(|f| (f.added + f.deleted) as f64)
        .filter(|c| *c > 0.0)
        .collect();
    let total: f64 = changes.iter().sum();
    if changes.len() < 2 || total == 0.0 {
        return 0.0;
    }

    let entropy: f64 = changes
        .iter()
        .map(|c| {
            let p = c / total;
            -p * p.log2()
        })
        .sum();
    entropy / (changes.len() as f64).log2()
}

fn subsystem_of(path: &str) -> String {
    match path.split_once('/') {
        Some((top, _)) => top.to_string(),
        None => String::new(),
    }
}

fn directory_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::vcs::{CommitHash, FileChange};

    fn hash(n: u8) -> CommitHash {
        CommitHash::parse(&format!("{:040x}", n)).unwrap()
    }

    fn commit(n: u8, author: &str, ts: i64, msg: &str, files: &[(&str, u32, u32)]) -> RawCommit {
        RawCommit {
            hash: hash(n),
            parents: if n > 1 { vec![hash(n - 1)] } else { vec![] },
            author_email: author.to_string(),
            author_timestamp: ts,
            message: msg.to_string(),
            file_changes: files
                .iter()
                .map(|(p, a, d)| FileChange {
                    path: p.to_string(),
                    added: *a,
                    deleted: *d,
                })
                .collect(),
        }
    }

    fn calculator() -> GuruMetricsCalculator {
        GuruMetricsCalculator::new(DEFAULT_FIX_KEYWORDS).unwrap()
    }

    #[test]
    fn test_first_commit_has_no_history() {
        let history = vec![commit(1, "a@x", 0, "init", &[("src/a.rs", 10, 0), ("README", 2, 0)])];
        let rows = calculator().calculate(&history);

        let row = &rows[0];
        assert_eq!(row.nf, 2);
        assert_eq!(row.ns, 2); // "src" + root
        assert_eq!(row.la, 12);
        assert_eq!(row.exp, 0);
        assert_eq!(row.ndev, 0);
        assert_eq!(row.lt, 0.0);
        assert!(!row.fix);
    }

    #[test]
    fn test_history_accumulates() {
        let day = SECONDS_PER_DAY as i64;
        let history = vec![
            commit(1, "a@x", 0, "init", &[("src/a.rs", 10, 0)]),
            commit(2, "b@x", day, "grow", &[("src/a.rs", 5, 1)]),
            commit(3, "a@x", 3 * day, "Fix crash in parser", &[("src/a.rs", 1, 1)]),
        ];
        let rows = calculator().calculate(&history);

        let third = &rows[2];
        assert_eq!(third.lt, 14.0);
        assert_eq!(third.ndev, 2);
        assert_eq!(third.nuc, 2);
        assert_eq!(third.age, 2.0);
        assert_eq!(third.exp, 1);
        assert_eq!(third.sexp, 1);
        assert!(third.fix);
        assert!(third.rexp > 0.99 && third.rexp <= 1.0);
    }

    #[test]
    fn test_entropy_is_normalized() {
        let even = commit(1, "a@x", 0, "x", &[("a", 5, 0), ("b", 5, 0)]);
        assert!((change_entropy(&even) - 1.0).abs() < 1e-9);

        let skewed = commit(1, "a@x", 0, "x", &[("a", 9, 0), ("b", 1, 0)]);
        let e = change_entropy(&skewed);
        assert!(e > 0.0 && e < 1.0);

        let single = commit(1, "a@x", 0, "x", &[("a", 9, 0)]);
        assert_eq!(change_entropy(&single), 0.0);
    }

    #[test]
    fn test_fix_keyword_requires_word_start() {
        let calc = calculator();
        assert!(calc.is_fix_message("Bugfix for #12"));
        assert!(!calc.is_fix_message("prefix cleanup"));
    }
}
