//! Cursor loop over a paginated query.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::offer::Offer;
use crate::store::RecordStore;

use super::{CancellationFlag, FetchError, OfferQuery, PageFetcher};

/// Default number of elements requested per page.
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// Default number of record writes in flight within one page.
pub const DEFAULT_WRITE_CONCURRENCY: usize = 16;

/// Outcome of draining one query.
#[derive(Debug, Clone, Default)]
pub struct DrainSummary {
    pub label: String,
    /// Pages received from the remote.
    pub pages: u32,
    /// Collection size declared by the first page.
    pub total: u64,
    /// Records written to the store.
    pub persisted: usize,
    /// Elements that could not be parsed or written.
    pub write_failures: usize,
    /// Every parsed offer, in arrival order.
    pub offers: Vec<Offer>,
}

impl DrainSummary {
    /// Ids of the parsed offers, in arrival order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.offers.iter().map(|o| o.id.as_str())
    }
}

/// Walks a query's cursor from offset zero to the declared total.
pub struct PaginationDriver {
    fetcher: PageFetcher,
    store: Arc<dyn RecordStore>,
    page_size: u64,
    write_concurrency: usize,
    cancel: CancellationFlag,
}

impl PaginationDriver {
    pub fn new(fetcher: PageFetcher, store: Arc<dyn RecordStore>) -> Self {
        Self {
            fetcher,
            store,
            page_size: DEFAULT_PAGE_SIZE,
            write_concurrency: DEFAULT_WRITE_CONCURRENCY,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_write_concurrency(mut self, write_concurrency: usize) -> Self {
        self.write_concurrency = write_concurrency.max(1);
        self
    }

    /// Stop between pages once `cancel` is set.
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Fetch every page of `query` and persist each element.
    ///
    /// The first request always goes out, since only a page reveals the
    /// total. After each page the next offset is taken from the cursor the
    /// remote echoed back, and the loop continues while that offset is below
    /// the total declared by the first page. All writes for a page have
    /// completed before the next page is requested, so every record is on
    /// disk when this returns.
    pub async fn drain_all(&self, query: &OfferQuery) -> Result<DrainSummary, FetchError> {
        let mut summary = DrainSummary {
            label: query.label.clone(),
            ..DrainSummary::default()
        };
        let mut start = 0u64;
        let mut declared_total: Option<u64> = None;

        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let page = self.fetcher.fetch(query, start, self.page_size).await?;
            summary.pages += 1;

            let total = *declared_total.get_or_insert(page.paging.total);
            if page.paging.total != total {
                warn!(
                    query = %query.label,
                    declared = total,
                    reported = page.paging.total,
                    "Remote total changed mid-run, keeping the first value"
                );
            }

            let received = page.elements.len();
            self.persist_page(page.elements, &mut summary).await;

            let next = page.paging.next_start();
            debug!(
                query = %query.label,
                start = page.paging.start,
                received,
                next,
                total,
                "Page persisted"
            );

            if next >= total {
                break;
            }
            if next <= start {
                return Err(FetchError::StalledCursor {
                    start: page.paging.start,
                    count: page.paging.count,
                    total,
                });
            }
            if received == 0 {
                warn!(
                    query = %query.label,
                    start = page.paging.start,
                    total,
                    "Empty page before the declared total, stopping"
                );
                break;
            }
            start = next;
        }

        summary.total = declared_total.unwrap_or_default();
        info!(
            query = %summary.label,
            pages = summary.pages,
            total = summary.total,
            persisted = summary.persisted,
            write_failures = summary.write_failures,
            "Drain complete"
        );
        Ok(summary)
    }

    /// Parse and write one page of elements, concurrently, and wait for all
    /// writes. Failures are logged and counted, never propagated.
    async fn persist_page(&self, elements: Vec<Value>, summary: &mut DrainSummary) {
        let mut offers = Vec::with_capacity(elements.len());
        for element in elements {
            match Offer::from_value(element) {
                Ok(offer) => offers.push(offer),
                Err(e) => {
                    warn!(query = %summary.label, error = %e, "Skipping malformed element");
                    summary.write_failures += 1;
                    metrics::RECORD_WRITE_FAILURES.inc();
                }
            }
        }

        let store = &self.store;
        let results: Vec<_> = stream::iter(offers)
            .map(move |offer| async move {
                let result = store.save(&offer).await;
                (offer, result)
            })
            .buffered(self.write_concurrency)
            .collect()
            .await;

        for (offer, result) in results {
            match result {
                Ok(()) => {
                    summary.persisted += 1;
                    metrics::RECORDS_PERSISTED.inc();
                }
                Err(e) => {
                    warn!(id = %offer.id, error = %e, "Failed to persist record");
                    summary.write_failures += 1;
                    metrics::RECORD_WRITE_FAILURES.inc();
                }
            }
            summary.offers.push(offer);
        }
    }
}
