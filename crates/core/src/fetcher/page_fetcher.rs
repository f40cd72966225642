//! Single-page fetch with fixed-delay retry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::metrics;
use crate::offer::Page;
use crate::remote::{GraphQlResponse, QueryTransport};

use super::{CancellationFlag, FetchError, OfferQuery, ResultSelector};

/// How remote application errors are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed delay between attempts. There is no backoff growth.
    pub delay: Duration,
    /// Total attempts including the first; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.delay_ms),
            max_attempts: config.max_attempts,
        }
    }
}

impl RetryPolicy {
    fn allows_another_attempt(&self, attempts_so_far: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts_so_far < max)
    }
}

/// Result of inspecting one response.
enum Outcome {
    Page(Page),
    Retry(String),
    Malformed,
}

fn classify(response: &GraphQlResponse, selector: &ResultSelector) -> Outcome {
    let page = response.data.as_ref().and_then(|data| selector.project(data));
    match (page, response.has_errors()) {
        (Some(page), _) => Outcome::Page(page),
        (None, true) => Outcome::Retry(response.error_summary()),
        (None, false) => Outcome::Malformed,
    }
}

/// Issues page requests through a [`QueryTransport`].
pub struct PageFetcher {
    transport: Arc<dyn QueryTransport>,
    retry: RetryPolicy,
    cancel: CancellationFlag,
}

impl PageFetcher {
    pub fn new(transport: Arc<dyn QueryTransport>, retry: RetryPolicy) -> Self {
        Self {
            transport,
            retry,
            cancel: CancellationFlag::new(),
        }
    }

    /// Abort pending retries when `cancel` is set.
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch the page at `start` with `count` elements.
    ///
    /// - Transport failures are returned immediately.
    /// - A response whose data projects into a page is a success, even when
    ///   it also carries `errors`.
    /// - `errors` without a usable page are retried after the fixed delay
    ///   with identical arguments, until the ceiling (if any) is reached.
    /// - An error-free response without a usable page is malformed.
    pub async fn fetch(
        &self,
        query: &OfferQuery,
        start: u64,
        count: u64,
    ) -> Result<Page, FetchError> {
        let variables = query.variables_for(start, count);
        let mut attempts = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            attempts += 1;

            let started = Instant::now();
            let response = self
                .transport
                .execute(&query.document, &variables)
                .await?;
            metrics::FETCH_DURATION
                .with_label_values(&[query.label.as_str()])
                .observe(started.elapsed().as_secs_f64());

            match classify(&response, &query.selector) {
                Outcome::Page(page) => {
                    if response.has_errors() {
                        warn!(
                            query = %query.label,
                            start,
                            errors = %response.error_summary(),
                            "Accepting partial page returned alongside errors"
                        );
                    }
                    debug!(
                        query = %query.label,
                        start = page.paging.start,
                        count = page.paging.count,
                        total = page.paging.total,
                        elements = page.elements.len(),
                        attempts,
                        "Fetched page"
                    );
                    metrics::PAGES_FETCHED
                        .with_label_values(&[query.label.as_str()])
                        .inc();
                    return Ok(page);
                }
                Outcome::Malformed => {
                    return Err(FetchError::MalformedPage {
                        selector: query.selector.path(),
                    });
                }
                Outcome::Retry(summary) => {
                    if !self.retry.allows_another_attempt(attempts) {
                        return Err(FetchError::RetriesExhausted {
                            attempts,
                            last_error: summary,
                        });
                    }
                    warn!(
                        query = %query.label,
                        start,
                        count,
                        attempt = attempts,
                        delay_ms = self.retry.delay.as_millis() as u64,
                        errors = %summary,
                        "Remote returned errors without data, retrying"
                    );
                    metrics::FETCH_RETRIES
                        .with_label_values(&[query.label.as_str()])
                        .inc();
                    tokio::time::sleep(self.retry.delay).await;
                }
            }
        }
    }
}
