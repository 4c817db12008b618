use std::path::Path;
use std::process::Command;

use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git command failed: {cmd}: {stderr}")]
    CommandFailed { cmd: String, stderr: String },
    #[error("git command io error: {cmd}: {source}")]
    CommandIo { cmd: String, source: std::io::Error },
    #[error("git output was not utf-8")]
    OutputNotUtf8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchState {
    Created,
    Existing,
}

pub fn upgrade_branch_name(from: &str, to: &str) -> String {
    format!("upgrade-{from}-to-{to}")
}

/// Switch to `branch`, creating it from HEAD when it does not exist yet.
pub fn checkout_upgrade_branch(repo: &Path, branch: &str) -> Result<BranchState, GitError> {
    if branch_exists(repo, branch)? {
        run_git(repo, &["checkout", branch])?;
        info!(branch, "switched to existing upgrade branch");
        Ok(BranchState::Existing)
    } else {
        run_git(repo, &["checkout", "-b", branch])?;
        info!(branch, "created upgrade branch");
        Ok(BranchState::Created)
    }
}

pub fn current_branch(repo: &Path) -> Result<String, GitError> {
    let output = run_git(repo, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    Ok(output.trim().to_string())
}

fn branch_exists(repo: &Path, branch: &str) -> Result<bool, GitError> {
    let reference = format!("refs/heads/{branch}");
    let cmd_string = format!("git rev-parse --verify --quiet {reference}");
    let output = Command::new("git")
        .current_dir(repo)
        .args(["rev-parse", "--verify", "--quiet", &reference])
        .output()
        .map_err(|source| GitError::CommandIo {
            cmd: cmd_string.clone(),
            source,
        })?;

    match output.status.code() {
        Some(0) => Ok(true),
        Some(1) => Ok(false),
        _ => Err(GitError::CommandFailed {
            cmd: cmd_string,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }),
    }
}

fn run_git(repo: &Path, args: &[&str]) -> Result<String, GitError> {
    let cmd_string = format!("git {}", args.join(" "));
    let output = Command::new("git")
        .current_dir(repo)
        .args(args)
        .output()
        .map_err(|source| GitError::CommandIo {
            cmd: cmd_string.clone(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(GitError::CommandFailed {
            cmd: cmd_string,
            stderr,
        });
    }

    String::from_utf8(output.stdout).map_err(|_| GitError::OutputNotUtf8)
}
