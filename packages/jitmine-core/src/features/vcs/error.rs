/// Version-control errors
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("Not a git repository: {0}")]
    NotARepository(String),

    #[error("`{command}` failed (exit code {}): {stderr}", exit_code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Invalid commit hash: {0:?}")]
    InvalidHash(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VcsError {
    /// Exit code of the failed process, if this is a command failure
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            VcsError::CommandFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, VcsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display_carries_stderr() {
        let err = VcsError::CommandFailed {
            command: "git checkout deadbeef".to_string(),
            exit_code: Some(128),
            stderr: "fatal: reference is not a tree".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("128"));
        assert!(msg.contains("reference is not a tree"));
        assert_eq!(err.exit_code(), Some(128));
    }

    #[test]
    fn test_killed_process_has_no_exit_code() {
        let err = VcsError::CommandFailed {
            command: "git fetch".to_string(),
            exit_code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("signal"));
    }
}
