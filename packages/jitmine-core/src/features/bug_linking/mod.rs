/// Bug Linkage
///
/// 1. Fetch bug issues from a tracker (`IssueTracker`)
/// 2. Link fix commits to the issues they reference (`IssueLinker`)
/// 3. Label the commits that introduced the fixed lines (`SzzLabeler`)
pub mod issues;
pub mod linker;
pub mod szz;

pub use issues::{GithubIssueTracker, Issue, IssueError, IssueTracker, StaticIssueTracker};
pub use linker::{BugLinkage, IssueLinker};
pub use szz::SzzLabeler;
