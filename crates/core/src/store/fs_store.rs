//! File system record store.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

use crate::offer::Offer;

use super::{validate_record_id, RecordIter, RecordStore, StoreError};

const RECORD_EXTENSION: &str = "json";

/// Stores each offer as `<dir>/<id>.json`.
///
/// Writes go to a hidden temp file in the same directory and are renamed
/// into place, so a reader never observes a half-written record.
/// [`RecordStore::list_all`] enumerates records in ascending file name
/// order.
#[derive(Debug, Clone)]
pub struct FsRecordStore {
    dir: PathBuf,
}

impl FsRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for `id`.
    pub fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RECORD_EXTENSION))
    }

    /// Sorted paths of every record file currently on disk.
    fn record_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let path = entry.path();
            let is_record = path.extension().is_some_and(|ext| ext == RECORD_EXTENSION)
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('.'));
            if is_record {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

fn read_record(path: &Path) -> Option<Offer> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable record");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(offer) => Some(offer),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping malformed record");
            None
        }
    }
}

#[async_trait]
impl RecordStore for FsRecordStore {
    async fn save(&self, offer: &Offer) -> Result<(), StoreError> {
        validate_record_id(&offer.id)?;

        let json = serde_json::to_vec_pretty(offer).map_err(|e| StoreError::Serialize {
            id: offer.id.clone(),
            source: e,
        })?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let destination = self.record_path(&offer.id);
        let temp = self
            .dir
            .join(format!(".{}.{}.tmp", offer.id, uuid::Uuid::new_v4()));

        if let Err(e) = fs::write(&temp, &json).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StoreError::io(&temp, e));
        }
        if let Err(e) = fs::rename(&temp, &destination).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StoreError::io(&destination, e));
        }

        Ok(())
    }

    fn list_all(&self) -> Result<RecordIter<'_>, StoreError> {
        let paths = self.record_paths()?;
        Ok(Box::new(
            paths.into_iter().filter_map(|path| read_record(&path)),
        ))
    }
}
