//! Fix commit -> issue association

use super::issues::Issue;
use crate::features::guru_metrics::CommitGuruMetrics;
use crate::features::vcs::CommitHash;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A fix commit and the issue(s) it resolves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugLinkage {
    pub fix_hash: CommitHash,
    /// Empty when the commit was classified by message keywords alone
    pub issue_ids: Vec<String>,
}

/// Extracts issue references from commit messages
pub struct IssueLinker {
    key_pattern: Regex,
}

impl IssueLinker {
    /// `key_pattern` uses capture group 1 as the issue id when present
    pub fn new(key_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            key_pattern: Regex::new(key_pattern)?,
        })
    }

    /// Issue ids referenced by `message`, in order of appearance
    pub fn referenced_ids(&self, message: &str) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for caps in self.key_pattern.captures_iter(message) {
            let id = caps
                .get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().to_string());
            if let Some(id) = id {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    /// Mark fix commits in `rows` and return their linkages
    ///
    /// With issues available, only references to fetched issues count. With
    /// none, the keyword-based `fix` flag decides.
    pub fn link(&self, rows: &mut [CommitGuruMetrics], issues: &[Issue]) -> Vec<BugLinkage> {
        let known: HashSet<&str> = issues.iter().map(|i| i.id.as_str()).collect();
        let mut linkages = Vec::new();

        for row in rows.iter_mut() {
            let referenced = self.referenced_ids(&row.message);
            let issue_ids: Vec<String> = if known.is_empty() {
                if !row.fix {
                    continue;
                }
                referenced
            } else {
                let matched: Vec<String> = referenced
                    .into_iter()
                    .filter(|id| known.contains(id.as_str()))
                    .collect();
                if matched.is_empty() {
                    continue;
                }
                matched
            };

            row.fixes = issue_ids.clone();
            linkages.push(BugLinkage {
                fix_hash: row.commit_hash.clone(),
                issue_ids,
            });
        }

        linkages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: u8, message: &str, fix: bool) -> CommitGuruMetrics {
        CommitGuruMetrics {
            commit_hash: CommitHash::parse(&format!("{:040x}", n)).unwrap(),
            parent_hashes: vec![],
            author_email: "a@x".to_string(),
            author_timestamp: n as i64,
            message: message.to_string(),
            ns: 0,
            nd: 0,
            nf: 0,
            entropy: 0.0,
            la: 0,
            ld: 0,
            lt: 0.0,
            fix,
            ndev: 0,
            age: 0.0,
            nuc: 0,
            exp: 0,
            rexp: 0.0,
            sexp: 0,
            fixes: vec![],
            contains_bug: false,
            fixing_commits: vec![],
        }
    }

    fn issue(id: &str) -> Issue {
        Issue {
            id: id.to_string(),
            title: String::new(),
            labels: vec!["bug".to_string()],
            closed_at: None,
        }
    }

    #[test]
    fn test_referenced_ids_dedup() {
        let linker = IssueLinker::new(r"#(\d+)").unwrap();
        assert_eq!(linker.referenced_ids("closes #12, see #3 and #12"), vec!["12", "3"]);
    }

    #[test]
    fn test_jira_style_pattern_without_group() {
        let linker = IssueLinker::new(r"[A-Z]+-\d+").unwrap();
        assert_eq!(linker.referenced_ids("LANG-1234: fix NPE"), vec!["LANG-1234"]);
    }

    #[test]
    fn test_link_against_fetched_issues() {
        let linker = IssueLinker::new(r"#(\d+)").unwrap();
        let mut rows = vec![
            row(1, "feature #1", false),
            row(2, "fix crash #2", true),
            row(3, "fix typo", true),
        ];
        let linkages = linker.link(&mut rows, &[issue("2")]);

        assert_eq!(linkages.len(), 1);
        assert_eq!(linkages[0].fix_hash, rows[1].commit_hash);
        assert_eq!(rows[1].fixes, vec!["2"]);
        assert!(rows[2].fixes.is_empty());
    }

    #[test]
    fn test_link_falls_back_to_keywords_without_issues() {
        let linker = IssueLinker::new(r"#(\d+)").unwrap();
        let mut rows = vec![row(1, "add feature", false), row(2, "fix typo", true)];
        let linkages = linker.link(&mut rows, &[]);

        assert_eq!(linkages.len(), 1);
        assert!(linkages[0].issue_ids.is_empty());
    }
}
