//! Paginated fetching of catalog offers.
//!
//! [`PageFetcher`] turns one `(start, count)` request into a [`Page`],
//! retrying remote application errors with a fixed delay.
//! [`PaginationDriver`] walks the cursor until the declared total is
//! covered and persists every element it receives.
//!
//! [`Page`]: crate::offer::Page

mod cancel;
mod driver;
mod page_fetcher;
mod query;
mod selector;

pub use cancel::CancellationFlag;
pub use driver::{DrainSummary, PaginationDriver};
pub use page_fetcher::{PageFetcher, RetryPolicy};
pub use query::OfferQuery;
pub use selector::ResultSelector;

use thiserror::Error;

use crate::remote::TransportError;

/// Errors that end a fetch or a drain.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request produced no structured response. Never retried.
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The retry ceiling was reached while the remote kept reporting errors.
    #[error("Giving up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// An error-free response did not project into `{elements, paging}`.
    #[error("Response does not match the expected page shape at '{selector}'")]
    MalformedPage { selector: String },

    /// The remote echoed a cursor that does not advance.
    #[error("Cursor stalled at start={start} (count={count}, total={total})")]
    StalledCursor { start: u64, count: u64, total: u64 },

    /// The run was cancelled between requests.
    #[error("Fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether this error came from the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
