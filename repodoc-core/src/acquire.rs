use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::PipelineConfig;
use crate::contract::ProcessRunner;
use crate::error::{CloneError, RunError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneRequest {
    pub url: String,
    pub branch: String,
}

/// A shallow clone in a scratch directory. Dropping the value deletes the directory;
/// [`ClonedRepository::retain`] keeps it on disk instead.
#[derive(Debug)]
pub struct ClonedRepository {
    dir: TempDir,
}

impl ClonedRepository {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Keeps the clone on disk and returns where it lives.
    pub fn retain(self) -> PathBuf {
        self.dir.keep()
    }
}

/// `git clone --depth 1 --branch <branch> <url> <scratch>` under the configured workspace
/// root, bounded by `config.clone_timeout()`. Any failure removes the scratch directory
/// before returning.
pub async fn clone_repository(
    runner: &dyn ProcessRunner,
    request: &CloneRequest,
    job_id: &str,
    config: &PipelineConfig,
) -> Result<ClonedRepository, CloneError> {
    std::fs::create_dir_all(&config.workspace_dir)?;
    let dir = tempfile::Builder::new()
        .prefix(&format!("repo-{job_id}-"))
        .tempdir_in(&config.workspace_dir)?;

    tracing::info!(
        repo_url = %request.url,
        branch = %request.branch,
        path = %dir.path().display(),
        "Cloning repository"
    );

    let args = vec![
        "clone".to_string(),
        "--depth".to_string(),
        "1".to_string(),
        "--branch".to_string(),
        request.branch.clone(),
        request.url.clone(),
        dir.path().display().to_string(),
    ];

    let timeout = config.clone_timeout();
    let output = runner
        .run("git", &args, timeout)
        .await
        .map_err(|e| match e {
            RunError::TimedOut { .. } => CloneError::TimedOut(timeout),
            RunError::Launch { source, .. } => CloneError::Launch(source.to_string()),
        })?;

    if !output.success() {
        let stderr = output.stderr.trim().to_string();
        tracing::error!(
            repo_url = %request.url,
            status = ?output.status,
            stderr = %stderr,
            "git clone failed"
        );
        return Err(CloneError::Git {
            code: output.status,
            stderr: if stderr.is_empty() {
                "Unknown error".to_string()
            } else {
                stderr
            },
        });
    }

    tracing::info!(path = %dir.path().display(), "Clone succeeded");
    Ok(ClonedRepository { dir })
}
