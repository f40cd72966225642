//! All-or-nothing persistence of the index set.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};

use super::{IndexError, IndexSet};

const NAMESPACES_FILE: &str = "namespaces.json";
const TITLES_FILE: &str = "titles.json";
const TAGS_FILE: &str = "tags.json";
const LIST_FILE: &str = "list.json";

/// File names of the artifacts inside the index directory.
pub const ARTIFACT_NAMES: [&str; 4] = [NAMESPACES_FILE, TITLES_FILE, TAGS_FILE, LIST_FILE];

/// Writes the four artifacts into an index directory.
///
/// All artifacts are staged in a sibling directory first and the staged
/// directory is renamed over the live one, so readers see either the old
/// set or the new set. If staging fails the live directory is untouched.
#[derive(Debug, Clone)]
pub struct IndexWriter {
    index_dir: PathBuf,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> IndexError + '_ {
    move |source| IndexError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn encode<T: Serialize>(artifact: &'static str, value: &T) -> Result<Vec<u8>, IndexError> {
    serde_json::to_vec(value).map_err(|source| IndexError::Serialize { artifact, source })
}

async fn decode<T: DeserializeOwned>(dir: &Path, artifact: &'static str) -> Result<T, IndexError> {
    let path = dir.join(artifact);
    let bytes = fs::read(&path).await.map_err(io_error(&path))?;
    serde_json::from_slice(&bytes).map_err(|source| IndexError::Serialize { artifact, source })
}

impl IndexWriter {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
        }
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    fn dir_name(&self) -> String {
        self.index_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "index".to_string())
    }

    fn sibling(&self, kind: &str) -> PathBuf {
        self.index_dir.with_file_name(format!(
            ".{}.{}-{}",
            self.dir_name(),
            kind,
            uuid::Uuid::new_v4()
        ))
    }

    /// Clean up after a swap that was interrupted by a crash.
    ///
    /// The live directory is moved aside before the staged one takes its
    /// place. If the process died in between, the moved-aside set is the
    /// last complete index and is put back. Leftover staging directories are
    /// removed.
    async fn recover_interrupted_swap(&self) -> Result<(), IndexError> {
        let parent = match self.index_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut entries = match fs::read_dir(&parent).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_error(&parent)(e)),
        };

        let previous_prefix = format!(".{}.previous-", self.dir_name());
        let staging_prefix = format!(".{}.staging-", self.dir_name());
        let mut previous = Vec::new();
        let mut staging = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error(&parent))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&previous_prefix) {
                previous.push(entry.path());
            } else if name.starts_with(&staging_prefix) {
                staging.push(entry.path());
            }
        }

        for path in staging {
            warn!(path = %path.display(), "Removing leftover index staging directory");
            if let Err(e) = fs::remove_dir_all(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove staging directory");
            }
        }

        let live_exists = fs::try_exists(&self.index_dir)
            .await
            .map_err(io_error(&self.index_dir))?;
        let mut previous = previous.into_iter();
        if !live_exists {
            if let Some(path) = previous.next() {
                warn!(
                    path = %path.display(),
                    dir = %self.index_dir.display(),
                    "Restoring index from an interrupted swap"
                );
                fs::rename(&path, &self.index_dir)
                    .await
                    .map_err(io_error(&self.index_dir))?;
            }
        }
        for path in previous {
            warn!(path = %path.display(), "Removing leftover previous index");
            if let Err(e) = fs::remove_dir_all(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove previous index");
            }
        }
        Ok(())
    }

    /// Persist `index`, replacing any previous set.
    pub async fn write(&self, index: &IndexSet) -> Result<(), IndexError> {
        let artifacts = [
            (NAMESPACES_FILE, encode(NAMESPACES_FILE, &index.namespaces)?),
            (TITLES_FILE, encode(TITLES_FILE, &index.titles)?),
            (TAGS_FILE, encode(TAGS_FILE, &index.tags)?),
            (LIST_FILE, encode(LIST_FILE, &index.list)?),
        ];

        if let Some(parent) = self.index_dir.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(io_error(parent))?;
            }
        }

        self.recover_interrupted_swap().await?;

        let staging = self.sibling("staging");
        if let Err(e) = stage(&staging, &artifacts).await {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        self.swap_in(&staging).await?;
        info!(dir = %self.index_dir.display(), offers = index.list.len(), "Index written");
        Ok(())
    }

    async fn swap_in(&self, staging: &Path) -> Result<(), IndexError> {
        let previous = if fs::try_exists(&self.index_dir)
            .await
            .map_err(io_error(&self.index_dir))?
        {
            let previous = self.sibling("previous");
            if let Err(e) = fs::rename(&self.index_dir, &previous).await {
                let _ = fs::remove_dir_all(staging).await;
                return Err(io_error(&self.index_dir)(e));
            }
            Some(previous)
        } else {
            None
        };

        if let Err(e) = fs::rename(staging, &self.index_dir).await {
            if let Some(previous) = &previous {
                if let Err(restore) = fs::rename(previous, &self.index_dir).await {
                    warn!(error = %restore, "Failed to restore previous index");
                }
            }
            let _ = fs::remove_dir_all(staging).await;
            return Err(io_error(&self.index_dir)(e));
        }

        if let Some(previous) = previous {
            if let Err(e) = fs::remove_dir_all(&previous).await {
                warn!(path = %previous.display(), error = %e, "Failed to remove previous index");
            }
        }
        Ok(())
    }

    /// Read the current index set back, if one has been written.
    ///
    /// A set left aside by an interrupted swap is restored first.
    pub async fn load(&self) -> Result<Option<IndexSet>, IndexError> {
        self.recover_interrupted_swap().await?;
        if !fs::try_exists(&self.index_dir)
            .await
            .map_err(io_error(&self.index_dir))?
        {
            return Ok(None);
        }

        Ok(Some(IndexSet {
            namespaces: decode(&self.index_dir, NAMESPACES_FILE).await?,
            titles: decode(&self.index_dir, TITLES_FILE).await?,
            tags: decode(&self.index_dir, TAGS_FILE).await?,
            list: decode(&self.index_dir, LIST_FILE).await?,
        }))
    }
}

async fn stage(staging: &Path, artifacts: &[(&str, Vec<u8>)]) -> Result<(), IndexError> {
    fs::create_dir(staging).await.map_err(io_error(staging))?;
    for (name, bytes) in artifacts {
        let path = staging.join(name);
        fs::write(&path, bytes).await.map_err(io_error(&path))?;
    }
    Ok(())
}
