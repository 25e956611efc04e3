/// Version-Control Adapter
///
/// Wraps the git binary behind the `VersionControl` capability trait.
///
/// ## Contract
/// - Every shelling operation returns a structured `CommandOutput`; a
///   non-zero exit becomes `VcsError::CommandFailed` with stderr + exit code.
/// - "Not found" lookups (no commit before a timestamp, root commit parent)
///   are `Ok(None)`, never errors.
pub mod commit;
pub mod error;
pub mod fake;
pub mod git;

pub use commit::{CommitHash, FileChange, LineRange, RawCommit};
pub use error::{Result, VcsError};
pub use fake::FakeVcs;
pub use git::{CommandOutput, GitVcs, VersionControl};
