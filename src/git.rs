//! Reading commit history from a local repository.
//!
//! Shells out to the `git` CLI; only the metadata the analyzer needs is
//! parsed. Diff text is fetched separately through [`crate::diff`].

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};

use crate::models::CommitRecord;

/// Errors from git history operations.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Git command failed: {0}")]
    CommandFailed(String),
    #[error("Failed to execute git: {0}")]
    ExecutionFailed(#[from] std::io::Error),
    #[error("Failed to parse git output: {0}")]
    ParseError(String),
}

// Unit separators keep multi-line commit bodies parseable.
const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';

/// Reads commit history via the local `git` CLI.
pub struct CommitReader {
    work_dir: Option<PathBuf>,
}

impl CommitReader {
    pub fn new() -> Self {
        Self { work_dir: None }
    }

    pub fn with_work_dir(work_dir: impl AsRef<Path>) -> Self {
        Self {
            work_dir: Some(work_dir.as_ref().to_path_buf()),
        }
    }

    fn run_git(&self, args: &[&str]) -> Result<String, GitError> {
        let mut cmd = Command::new("git");
        if let Some(ref dir) = self.work_dir {
            cmd.current_dir(dir);
        }
        cmd.args(args);

        let output = cmd.output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::CommandFailed(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Read commits authored within the last `since_days` days, newest first.
    pub fn read_commits(&self, since_days: i64) -> Result<Vec<CommitRecord>, GitError> {
        let since = format!("--since={} days ago", since_days);
        let pretty = format!(
            "--pretty=format:%H{sep}%an{sep}%aI{sep}%B{rec}",
            sep = FIELD_SEP,
            rec = RECORD_SEP
        );
        let output = self.run_git(&["log", &since, &pretty])?;

        output
            .split(RECORD_SEP)
            .map(str::trim)
            .filter(|record| !record.is_empty())
            .map(parse_record)
            .collect()
    }
}

impl Default for CommitReader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_record(record: &str) -> Result<CommitRecord, GitError> {
    let fields: Vec<&str> = record.splitn(4, FIELD_SEP).collect();
    let [sha, author, date, message] = fields.as_slice() else {
        return Err(GitError::ParseError(format!(
            "expected 4 fields, got {}",
            fields.len()
        )));
    };

    let date: DateTime<Utc> = DateTime::parse_from_rfc3339(date.trim())
        .map_err(|e| GitError::ParseError(format!("bad commit date '{}': {}", date, e)))?
        .with_timezone(&Utc);

    Ok(CommitRecord::new(
        sha.trim(),
        message.trim(),
        author.trim(),
        date,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_record() {
        let record = format!(
            "0123456789abcdef{s}Ada{s}2024-03-15T10:00:00+02:00{s}feat: add thing\n\nwith body",
            s = FIELD_SEP
        );
        let commit = parse_record(&record).unwrap();
        assert_eq!(commit.sha, "0123456789abcdef");
        assert_eq!(commit.author, "Ada");
        assert!(commit.message.starts_with("feat: add thing"));
        assert_eq!(commit.date.to_rfc3339(), "2024-03-15T08:00:00+00:00");
    }

    #[test]
    fn rejects_truncated_records() {
        let record = format!("abc{s}Ada", s = FIELD_SEP);
        assert!(parse_record(&record).is_err());
    }

    #[test]
    fn rejects_bad_dates() {
        let record = format!("abc{s}Ada{s}yesterday{s}msg", s = FIELD_SEP);
        assert!(matches!(parse_record(&record), Err(GitError::ParseError(_))));
    }
}
