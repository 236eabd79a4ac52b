use std::io;

use thiserror::Error;

/// Failure of one external git invocation.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("render width must be positive (got {0})")]
    InvalidWidth(usize),
    #[error("render worker failed: {0}")]
    Worker(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_source_error_mentions_command_and_stderr() {
        let err = SourceError::Failed {
            command: "git log".to_string(),
            status: "exit status: 128".to_string(),
            stderr: "fatal: not a git repository".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("git log"));
        assert!(text.contains("not a git repository"));
    }

    #[test]
    fn spawn_error_keeps_io_source() {
        let err = SourceError::Spawn {
            command: "git branch".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("no such file"));
    }
}
