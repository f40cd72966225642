//! One mirror run from first request to published snapshot.
//!
//! The runner drains the store-wide search, then each configured namespace
//! in order, rebuilds the index from the record store, writes the run
//! metrics artifact and finally hands the database to the publisher.
//! Phase timings travel in a [`RunMetrics`] value that the run returns.

mod queries;
#[allow(clippy::module_inception)]
mod runner;
mod types;

pub use queries::QueryDocuments;
pub use runner::MirrorRunner;
pub use types::*;

use thiserror::Error;

use crate::fetcher::FetchError;
use crate::index::IndexError;
use crate::sync::SyncError;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// A drain failed for good.
    #[error("Fetching '{query}' failed: {source}")]
    Fetch {
        query: String,
        #[source]
        source: FetchError,
    },

    /// Indexing or writing the index failed.
    #[error("Indexing failed: {0}")]
    Index(#[from] IndexError),

    /// The run metrics artifact could not be written.
    #[error("Failed to write run metrics to {path}: {message}")]
    Metrics { path: String, message: String },

    /// Publishing failed.
    #[error("Publishing failed: {0}")]
    Sync(#[from] SyncError),
}

impl RunError {
    /// Whether the run stopped because cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Fetch {
                source: FetchError::Cancelled,
                ..
            }
        )
    }
}
