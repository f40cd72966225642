//! Publisher that records calls instead of running git.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::sync::{commit_message, PublishOutcome, Publisher, SyncError};

use super::lock;

/// Mock implementation of the Publisher trait.
///
/// Every call is recorded as `(database_root, changed)`. Changed snapshots
/// report a commit that was not pushed.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    calls: Mutex<Vec<(PathBuf, bool)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(PathBuf, bool)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish(
        &self,
        database_root: &Path,
        changed: bool,
    ) -> Result<PublishOutcome, SyncError> {
        lock(&self.calls).push((database_root.to_path_buf(), changed));
        if !changed {
            return Ok(PublishOutcome::Skipped);
        }
        Ok(PublishOutcome::Committed {
            message: commit_message(Utc::now()),
            pushed: false,
        })
    }
}
