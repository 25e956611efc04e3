//! Guru metrics -> issue linking -> SZZ labelling over a scripted history

use jitmine_core::features::bug_linking::{Issue, IssueLinker, IssueTracker, StaticIssueTracker, SzzLabeler};
use jitmine_core::features::guru_metrics::GuruMetricsCalculator;
use jitmine_core::features::guru_metrics::calculator::DEFAULT_FIX_KEYWORDS;
use jitmine_core::features::vcs::{CommitHash, FakeVcs, FileChange, LineRange, RawCommit};

fn hash(n: u8) -> CommitHash {
    CommitHash::parse(&format!("{:040x}", n)).unwrap()
}

fn commit(n: u8, message: &str, path: &str, added: u32, deleted: u32) -> RawCommit {
    RawCommit {
        hash: hash(n),
        parents: if n > 1 { vec![hash(n - 1)] } else { vec![] },
        author_email: "dev@example.com".to_string(),
        author_timestamp: 1_700_000_000 + i64::from(n) * 3_600,
        message: message.to_string(),
        file_changes: vec![FileChange {
            path: path.to_string(),
            added,
            deleted,
        }],
    }
}

fn history() -> Vec<RawCommit> {
    vec![
        commit(1, "initial import", "src/parser.rs", 120, 0),
        commit(2, "add streaming mode", "src/parser.rs", 30, 4),
        commit(3, "docs", "README.md", 10, 0),
        commit(4, "fix crash on empty input #7", "src/parser.rs", 3, 2),
    ]
}

fn bug_issue(id: &str) -> Issue {
    Issue {
        id: id.to_string(),
        title: "crash on empty input".to_string(),
        labels: vec!["bug".to_string()],
        closed_at: None,
    }
}

#[tokio::test]
async fn test_fix_commit_labels_the_inducing_commit() {
    let vcs = FakeVcs::new("/repos/parser", history())
        .with_deleted_lines(hash(4), "src/parser.rs", vec![LineRange::new(40, 2)])
        // hash(0x63) is outside the mined history and must be ignored
        .with_blame(hash(3), "src/parser.rs", vec![hash(2), hash(0x63)]);

    let calculator = GuruMetricsCalculator::new(DEFAULT_FIX_KEYWORDS).unwrap();
    let mut rows = calculator.calculate(&history());
    assert_eq!(rows.len(), 4);
    assert!(rows[3].fix);

    let issues = StaticIssueTracker::new(vec![bug_issue("7")])
        .fetch_issues()
        .await
        .unwrap();
    let linkages = IssueLinker::new(r"#(\d+)").unwrap().link(&mut rows, &issues);
    assert_eq!(linkages.len(), 1);
    assert_eq!(linkages[0].fix_hash, hash(4));
    assert_eq!(rows[3].fixes, vec!["7"]);

    let labelled = SzzLabeler::label(&vcs, &mut rows, &linkages).await.unwrap();
    assert_eq!(labelled, 1);
    assert!(rows[1].contains_bug);
    assert_eq!(rows[1].fixing_commits, vec![hash(4)]);
    assert!(!rows[0].contains_bug);
    assert!(!rows[3].contains_bug);
}

#[tokio::test]
async fn test_labelling_is_idempotent() {
    let vcs = FakeVcs::new("/repos/parser", history())
        .with_deleted_lines(hash(4), "src/parser.rs", vec![LineRange::new(40, 2)])
        .with_blame(hash(3), "src/parser.rs", vec![hash(2)]);
    let mut rows = GuruMetricsCalculator::new(DEFAULT_FIX_KEYWORDS)
        .unwrap()
        .calculate(&history());
    let linkages = IssueLinker::new(r"#(\d+)").unwrap().link(&mut rows, &[]);

    assert_eq!(SzzLabeler::label(&vcs, &mut rows, &linkages).await.unwrap(), 1);
    assert_eq!(SzzLabeler::label(&vcs, &mut rows, &linkages).await.unwrap(), 0);
    assert_eq!(rows[1].fixing_commits, vec![hash(4)]);
}

#[tokio::test]
async fn test_fix_without_deletions_labels_nothing() {
    let vcs = FakeVcs::new("/repos/parser", history());
    let mut rows = GuruMetricsCalculator::new(DEFAULT_FIX_KEYWORDS)
        .unwrap()
        .calculate(&history());
    let linkages = IssueLinker::new(r"#(\d+)").unwrap().link(&mut rows, &[]);

    assert_eq!(SzzLabeler::label(&vcs, &mut rows, &linkages).await.unwrap(), 0);
    assert!(rows.iter().all(|r| !r.contains_bug));
}
