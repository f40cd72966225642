//! Error types for the record store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting or reading records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record id cannot be mapped to a file name.
    #[error("Invalid record id: {0:?}")]
    InvalidId(String),

    /// Failed to serialize the record.
    #[error("Failed to serialize record {id}: {source}")]
    Serialize {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backend-specific failure (used by non-filesystem stores).
    #[error("Record store failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
