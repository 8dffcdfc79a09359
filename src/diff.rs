//! Diff fetching boundary for the enhanced analysis path.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Errors from diff fetching.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("Diff command failed: {0}")]
    CommandFailed(String),
    #[error("Failed to execute git: {0}")]
    ExecutionFailed(#[from] std::io::Error),
}

/// Trait for fetching a commit's diff - allows mocking in tests.
///
/// `repo` identifies the repository the way the implementation expects it
/// (a working directory for the git CLI implementation, a `owner/name` pair
/// for a hosted-API implementation).
pub trait DiffSource: Send + Sync {
    /// Fetch the diff text for a commit.
    ///
    /// Returns `Ok(None)` when the commit has no diff content (e.g., a merge
    /// commit) - that is not a failure.
    fn diff_for(&self, repo: &str, sha: &str) -> Result<Option<String>, DiffError>;
}

/// Diff source that shells out to the local `git` CLI.
pub struct GitCliDiffSource {
    /// Working directory for git commands; `repo` arguments are ignored when set.
    work_dir: Option<PathBuf>,
}

impl GitCliDiffSource {
    pub fn new() -> Self {
        Self { work_dir: None }
    }

    pub fn with_work_dir(work_dir: impl AsRef<Path>) -> Self {
        Self {
            work_dir: Some(work_dir.as_ref().to_path_buf()),
        }
    }

    fn run_git(&self, repo: &str, args: &[&str]) -> Result<String, DiffError> {
        let mut cmd = Command::new("git");
        match self.work_dir {
            Some(ref dir) => {
                cmd.current_dir(dir);
            }
            None => {
                cmd.current_dir(repo);
            }
        }
        cmd.args(args);

        let output = cmd.output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DiffError::CommandFailed(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Default for GitCliDiffSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffSource for GitCliDiffSource {
    fn diff_for(&self, repo: &str, sha: &str) -> Result<Option<String>, DiffError> {
        // --format= suppresses the commit header so only the diff remains.
        // Merge commits produce no output here.
        let diff = self.run_git(repo, &["show", "--format=", sha])?;

        if diff.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(diff))
        }
    }
}
