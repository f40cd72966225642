//! Snapshot publishing.
//!
//! After indexing, the runner hands the database root to a [`Publisher`]
//! together with whether the run changed anything. The git implementation
//! commits the database directory and pushes it when a remote is
//! configured.

mod git;

pub use git::{commit_message, GitPublisher};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// What a publish call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Nothing changed (or publishing is disabled); no command was run.
    Skipped,
    /// Files were staged but the tree matched the last commit.
    NothingToCommit,
    /// A commit was created, and pushed if a remote is configured.
    Committed { message: String, pushed: bool },
}

/// Errors that can occur while publishing a snapshot.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The git binary could not be started.
    #[error("git not found at {path}")]
    GitNotFound { path: PathBuf },

    /// A git command exited unsuccessfully.
    #[error("`{command}` failed with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives the database root once per run.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the name of this publisher implementation.
    fn name(&self) -> &str;

    /// Version and transmit the snapshot under `database_root`.
    ///
    /// Must be a no-op returning [`PublishOutcome::Skipped`] when `changed`
    /// is false.
    async fn publish(&self, database_root: &Path, changed: bool)
        -> Result<PublishOutcome, SyncError>;
}

/// Publisher used when sync is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

#[async_trait]
impl Publisher for NoopPublisher {
    fn name(&self) -> &str {
        "noop"
    }

    async fn publish(
        &self,
        _database_root: &Path,
        _changed: bool,
    ) -> Result<PublishOutcome, SyncError> {
        Ok(PublishOutcome::Skipped)
    }
}
