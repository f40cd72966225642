//! Git-backed publisher.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::SyncConfig;

use super::{PublishOutcome, Publisher, SyncError};

/// Commit message for a snapshot taken at `at`.
pub fn commit_message(at: DateTime<Utc>) -> String {
    format!(
        "Update database {}",
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Publishes by committing the database directory in a git working tree.
///
/// Calls are serialized: a second publish waits for the first to finish.
pub struct GitPublisher {
    config: SyncConfig,
    lock: Mutex<()>,
}

impl GitPublisher {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            lock: Mutex::new(()),
        }
    }

    /// Run git with `args` in the working tree and return its stdout.
    async fn git(&self, args: &[&str]) -> Result<String, SyncError> {
        debug!(args = ?args, "Running git");

        let output = Command::new(&self.config.git_path)
            .arg("-C")
            .arg(&self.config.repo_dir)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SyncError::GitNotFound {
                        path: self.config.git_path.clone(),
                    }
                } else {
                    SyncError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(SyncError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

async fn absolute(path: &Path) -> Result<PathBuf, SyncError> {
    Ok(tokio::fs::canonicalize(path).await?)
}

#[async_trait]
impl Publisher for GitPublisher {
    fn name(&self) -> &str {
        "git"
    }

    async fn publish(
        &self,
        database_root: &Path,
        changed: bool,
    ) -> Result<PublishOutcome, SyncError> {
        if !changed {
            info!("No changes to publish");
            return Ok(PublishOutcome::Skipped);
        }

        let _guard = self.lock.lock().await;

        let root = absolute(database_root).await?;
        let root_arg = root.to_string_lossy().into_owned();

        self.git(&["add", "-A", "--", &root_arg]).await?;

        let status = self
            .git(&["status", "--porcelain", "--", &root_arg])
            .await?;
        if status.trim().is_empty() {
            info!("Database unchanged since last commit");
            return Ok(PublishOutcome::NothingToCommit);
        }

        let message = commit_message(Utc::now());
        self.git(&["commit", "-m", &message, "--", &root_arg]).await?;
        info!(message = %message, "Committed database snapshot");

        let pushed = match &self.config.remote {
            Some(remote) => {
                self.git(&["push", remote, &self.config.branch]).await?;
                info!(remote = %remote, branch = %self.config.branch, "Pushed database snapshot");
                true
            }
            None => false,
        };

        Ok(PublishOutcome::Committed { message, pushed })
    }
}
