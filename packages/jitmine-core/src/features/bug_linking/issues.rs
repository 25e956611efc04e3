//! Issue tracker boundary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Issue tracker returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Not a GitHub repository URL: {0}")]
    InvalidRepoUrl(String),
}

/// A closed issue as reported by the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub labels: Vec<String>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Issue {
    pub fn has_any_label(&self, labels: &[String]) -> bool {
        self.labels
            .iter()
            .any(|l| labels.iter().any(|wanted| wanted.eq_ignore_ascii_case(l)))
    }
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Closed issues carrying one of the tracker's bug labels
    async fn fetch_issues(&self) -> Result<Vec<Issue>, IssueError>;
}

/// Fixed issue list (offline runs, tests)
#[derive(Debug, Clone, Default)]
pub struct StaticIssueTracker {
    issues: Vec<Issue>,
}

impl StaticIssueTracker {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }
}

#[async_trait]
impl IssueTracker for StaticIssueTracker {
    async fn fetch_issues(&self) -> Result<Vec<Issue>, IssueError> {
        Ok(self.issues.clone())
    }
}

#[derive(Deserialize)]
struct GithubLabel {
    name: String,
}

#[derive(Deserialize)]
struct GithubIssue {
    number: u64,
    title: String,
    #[serde(default)]
    labels: Vec<GithubLabel>,
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

/// GitHub REST issues (closed, filtered by label, paginated)
pub struct GithubIssueTracker {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    labels: Vec<String>,
    token: Option<String>,
}

impl GithubIssueTracker {
    const PER_PAGE: usize = 100;

    pub fn from_repo_url(
        url: &str,
        labels: Vec<String>,
        token: Option<String>,
    ) -> Result<Self, IssueError> {
        let (owner, repo) = parse_github_url(url)?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_base: "https://api.github.com".to_string(),
            owner,
            repo,
            labels,
            token,
        })
    }

    /// Point at a GitHub Enterprise (or mock) API root
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn fetch_page(&self, label: &str, page: usize) -> Result<Vec<GithubIssue>, IssueError> {
        let url = format!(
            "{}/repos/{}/{}/issues",
            self.api_base, self.owner, self.repo
        );
        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, "jitmine")
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .query(&[
                ("state", "closed".to_string()),
                ("labels", label.to_string()),
                ("per_page", Self::PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IssueError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl IssueTracker for GithubIssueTracker {
    async fn fetch_issues(&self) -> Result<Vec<Issue>, IssueError> {
        let mut issues: Vec<Issue> = Vec::new();

        for label in &self.labels {
            let mut page = 1;
            loop {
                let batch = self.fetch_page(label, page).await?;
                let batch_len = batch.len();
                debug!(
                    "GitHub {}/{}: label {:?} page {} -> {} issues",
                    self.owner, self.repo, label, page, batch_len
                );

                for raw in batch.into_iter().filter(|i| i.pull_request.is_none()) {
                    let id = raw.number.to_string();
                    if issues.iter().any(|i| i.id == id) {
                        continue;
                    }
                    issues.push(Issue {
                        id,
                        title: raw.title,
                        labels: raw.labels.into_iter().map(|l| l.name).collect(),
                        closed_at: raw.closed_at,
                    });
                }

                if batch_len < Self::PER_PAGE {
                    break;
                }
                page += 1;
            }
        }

        info!(
            "GitHub {}/{}: fetched {} closed bug issues",
            self.owner,
            self.repo,
            issues.len()
        );
        Ok(issues)
    }
}

/// "https://github.com/o/r.git" | "git@github.com:o/r" -> ("o", "r")
fn parse_github_url(url: &str) -> Result<(String, String), IssueError> {
    let invalid = || IssueError::InvalidRepoUrl(url.to_string());
    let rest = url
        .strip_prefix("https://github.com/")
        .or_else(|| url.strip_prefix("http://github.com/"))
        .or_else(|| url.strip_prefix("git@github.com:"))
        .ok_or_else(invalid)?;

    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let mut parts = rest.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_github_url_variants() {
        for url in [
            "https://github.com/apache/commons-lang",
            "https://github.com/apache/commons-lang.git",
            "https://github.com/apache/commons-lang/",
            "git@github.com:apache/commons-lang.git",
        ] {
            let (owner, repo) = parse_github_url(url).unwrap();
            assert_eq!(owner, "apache");
            assert_eq!(repo, "commons-lang");
        }
    }

    #[test]
    fn test_parse_github_url_rejects_other_hosts() {
        assert!(parse_github_url("https://gitlab.com/a/b").is_err());
        assert!(parse_github_url("https://github.com/only-owner").is_err());
    }

    #[test]
    fn test_label_match_is_case_insensitive() {
        let issue = Issue {
            id: "7".to_string(),
            title: "crash".to_string(),
            labels: vec!["Bug".to_string()],
            closed_at: None,
        };
        assert!(issue.has_any_label(&["bug".to_string()]));
        assert!(!issue.has_any_label(&["enhancement".to_string()]));
    }

    #[tokio::test]
    async fn test_static_tracker_returns_issues() {
        let tracker = StaticIssueTracker::new(vec![Issue {
            id: "1".to_string(),
            title: "t".to_string(),
            labels: vec![],
            closed_at: None,
        }]);
        assert_eq!(tracker.fetch_issues().await.unwrap().len(), 1);
    }
}
