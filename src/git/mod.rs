use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use log::debug;
use tokio::process::Command;

use crate::domain::CommitRecord;
use crate::error::SourceError;

/// Separator between `git log` fields; does not occur in author names or dates.
pub const FIELD_SEPARATOR: &str = "||";
const FIELD_COUNT: usize = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub command_preview: String,
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait GitClient: Send + Sync {
    async fn history(&self, limit: Option<usize>) -> Result<String, SourceError>;
    async fn branch(&self) -> Result<String, SourceError>;
    async fn diff(&self, from: &str, to: &str) -> Result<String, SourceError>;
}

#[derive(Debug, Clone)]
pub struct CliGitClient {
    cwd: PathBuf,
}

impl CliGitClient {
    pub fn new(cwd: PathBuf) -> Self {
        Self { cwd }
    }

    async fn run_git<S: AsRef<str>>(&self, args: &[S]) -> Result<CommandResult, SourceError> {
        let preview = format!(
            "git {}",
            args.iter()
                .map(|part| part.as_ref().to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut command = Command::new("git");
        command
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for arg in args {
            command.arg(arg.as_ref());
        }

        debug!("running {preview}");
        let output = command.output().await.map_err(|source| SourceError::Spawn {
            command: preview.clone(),
            source,
        })?;
        Ok(CommandResult {
            command_preview: preview,
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn run_checked<S: AsRef<str>>(&self, args: &[S]) -> Result<String, SourceError> {
        let out = self.run_git(args).await?;
        if !out.success {
            return Err(SourceError::Failed {
                command: out.command_preview,
                status: out.status,
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(out.stdout)
    }
}

#[async_trait]
impl GitClient for CliGitClient {
    async fn history(&self, limit: Option<usize>) -> Result<String, SourceError> {
        let sep = FIELD_SEPARATOR;
        let format = format!("--format=%H{sep}%an{sep}%as{sep}%s");
        let mut args = vec!["log".to_string(), format];
        if let Some(limit) = limit {
            args.push("-n".to_string());
            args.push(limit.to_string());
        }
        self.run_checked(args.as_slice()).await
    }

    async fn branch(&self) -> Result<String, SourceError> {
        let out = self.run_checked(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        Ok(out.trim_end_matches(['\r', '\n']).to_string())
    }

    async fn diff(&self, from: &str, to: &str) -> Result<String, SourceError> {
        self.run_checked(&["diff", "--no-color", from, to]).await
    }
}

/// Turns `git log` output into records. Lines without exactly four fields are dropped.
pub fn parse_history(raw: &str) -> Vec<CommitRecord> {
    raw.lines()
        .filter_map(|line| {
            let cols = line.split(FIELD_SEPARATOR).collect::<Vec<_>>();
            if cols.len() != FIELD_COUNT {
                return None;
            }
            Some(CommitRecord {
                hash: cols[0].to_string(),
                author: cols[1].to_string(),
                date: cols[2].to_string(),
                message: cols[3].to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_lines_in_order() {
        let raw = "h1||Alice||2024-01-01||Fix bug\nh2||Bob||2024-01-02||Add feature\n";
        let parsed = parse_history(raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].hash, "h1");
        assert_eq!(parsed[0].author, "Alice");
        assert_eq!(parsed[0].date, "2024-01-01");
        assert_eq!(parsed[0].message, "Fix bug");
        assert_eq!(parsed[1].hash, "h2");
        assert_eq!(parsed[1].message, "Add feature");
    }

    #[test]
    fn drops_malformed_lines_between_good_ones() {
        let raw = "garbage\nh1||Alice||2024-01-01||Fix bug\nh9||only||three\n\nh2||Bob||2024-01-02||Add feature\nx||y||z||w||extra\n";
        let parsed = parse_history(raw);
        let hashes = parsed.iter().map(|r| r.hash.as_str()).collect::<Vec<_>>();
        assert_eq!(hashes, vec!["h1", "h2"]);
    }

    #[test]
    fn parse_is_total_on_empty_input() {
        assert!(parse_history("").is_empty());
        assert!(parse_history("\n").is_empty());
        assert!(parse_history("no separators here\nstill none\n").is_empty());
    }

    #[test]
    fn keeps_single_pipes_inside_messages() {
        let parsed = parse_history("h1||Alice||2024-01-01||a | b\n");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].message, "a | b");
    }
}
