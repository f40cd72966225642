//! Derived indexes over the record store.
//!
//! The four artifacts (`namespaces`, `titles`, `tags`, `list`) are rebuilt
//! from scratch on every run by [`Indexer::rebuild`], so they are a pure
//! function of the records on disk. [`IndexWriter`] swaps the whole set
//! into place at once.

mod builder;
mod types;
mod writer;

pub use builder::Indexer;
pub use types::*;
pub use writer::{IndexWriter, ARTIFACT_NAMES};

use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while rebuilding or writing indexes.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The record store could not be enumerated.
    #[error("Failed to enumerate records: {0}")]
    Store(#[from] StoreError),

    /// Failed to serialize an artifact.
    #[error("Failed to serialize {artifact}: {source}")]
    Serialize {
        artifact: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem error while writing artifacts.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rebuild task panicked or was cancelled.
    #[error("Index task failed: {0}")]
    Task(String),
}
