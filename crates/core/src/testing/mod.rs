//! Testing utilities and mock implementations.
//!
//! These stand in for the remote API, the record store and the publisher
//! so a whole mirror run can be exercised without network or git.
//!
//! # Example
//!
//! ```rust,ignore
//! use offermirror_core::fetcher::ResultSelector;
//! use offermirror_core::testing::{fixtures, MemoryRecordStore, MockCatalog, MockTransport};
//!
//! let transport = MockTransport::with_catalog(MockCatalog::new(
//!     ResultSelector::STORE_SEARCH,
//!     fixtures::offer_values(0..5),
//! ));
//! transport.fail_next_catalog_requests(2);
//! let store = MemoryRecordStore::new();
//! ```

mod memory_store;
mod mock_transport;
mod recording_publisher;

pub use memory_store::MemoryRecordStore;
pub use mock_transport::{MockCatalog, MockTransport, RecordedRequest};
pub use recording_publisher::RecordingPublisher;

use std::sync::{Mutex, MutexGuard};

/// Lock a mock's state, ignoring poisoning from a panicked test thread.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::ops::Range;

    use serde_json::{json, Map, Value};

    use crate::offer::{KeyImage, Offer, Seller, THUMBNAIL_IMAGE_TYPE};

    /// Deterministic id for the `i`-th synthetic offer. Sorts numerically.
    pub fn offer_id(i: usize) -> String {
        format!("offer-{:05}", i)
    }

    /// Raw page elements for synthetic offers `range`, spread over three
    /// namespaces.
    pub fn offer_values(range: Range<usize>) -> Vec<Value> {
        range
            .map(|i| {
                json!({
                    "id": offer_id(i),
                    "namespace": format!("ns-{}", i % 3),
                    "title": format!("Offer {}", i),
                    "tags": [{ "id": format!("{}", 1000 + i % 4), "name": format!("Tag {}", i % 4) }],
                    "categories": [{ "path": "games" }, { "path": "games/edition/base" }],
                    "seller": { "id": "o-seller", "name": "Mock Seller" },
                    "creationDate": "2020-01-01T00:00:00.000Z",
                    "lastModifiedDate": format!("2024-03-{:02}T12:00:00.000Z", 1 + i % 28),
                    "keyImages": [
                        { "type": "DieselStoreFrontWide", "url": format!("https://cdn.test/{}/wide.png", i) },
                        { "type": THUMBNAIL_IMAGE_TYPE, "url": format!("https://cdn.test/{}/thumb.png", i) }
                    ],
                    "productSlug": format!("offer-{}", i),
                    "description": format!("Synthetic offer number {}", i)
                })
            })
            .collect()
    }

    /// An offer with a thumbnail, seller and timestamps.
    pub fn offer(id: &str, namespace: Option<&str>) -> Offer {
        let mut offer = Offer::new(id, format!("Title of {}", id));
        offer.namespace = namespace.map(str::to_string);
        offer.seller = Some(Seller {
            name: Some("Mock Seller".to_string()),
            extra: Map::new(),
        });
        offer.creation_date = Some("2020-01-01T00:00:00.000Z".to_string());
        offer.last_modified_date = Some("2024-01-01T00:00:00.000Z".to_string());
        offer.key_images = Some(vec![KeyImage {
            image_type: THUMBNAIL_IMAGE_TYPE.to_string(),
            url: format!("https://cdn.test/{}/thumb.png", id),
        }]);
        offer
    }

    /// A `data` object holding one page nested at `selector_path`.
    pub fn page_data(
        selector_path: &str,
        elements: Vec<Value>,
        start: u64,
        count: u64,
        total: u64,
    ) -> Value {
        let page = json!({
            "elements": elements,
            "paging": { "start": start, "count": count, "total": total }
        });
        selector_path
            .split('.')
            .filter(|segment| !segment.is_empty())
            .rev()
            .fold(page, |inner, segment| json!({ segment: inner }))
    }
}
