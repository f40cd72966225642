//! Full rebuild of the index set from the record store.

use std::sync::Arc;
use std::time::Instant;

use chrono::DateTime;
use tracing::{debug, info};

use crate::metrics;
use crate::offer::Offer;
use crate::store::RecordStore;

use super::{IndexError, IndexSet, ListEntry};

/// Epoch seconds of an ISO-8601 timestamp, or 0 when absent or invalid.
fn epoch_seconds(timestamp: Option<&str>) -> i64 {
    timestamp
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.timestamp())
        .unwrap_or(0)
}

impl From<&Offer> for ListEntry {
    fn from(offer: &Offer) -> Self {
        Self {
            id: offer.id.clone(),
            namespace: offer.namespace.clone().unwrap_or_default(),
            title: offer.title.clone(),
            category_paths: offer.category_paths(),
            seller_name: offer.seller_name().unwrap_or_default().to_string(),
            created_at: epoch_seconds(offer.creation_date.as_deref()),
            last_modified_at: epoch_seconds(offer.last_modified_date.as_deref()),
            thumbnail_url: offer.thumbnail_url().unwrap_or_default().to_string(),
            product_slug: offer.product_slug.clone().unwrap_or_default(),
        }
    }
}

/// Rebuilds the [`IndexSet`] from whatever the store currently holds.
#[derive(Clone)]
pub struct Indexer {
    store: Arc<dyn RecordStore>,
}

impl Indexer {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Build all four artifacts from a fresh scan of the store.
    ///
    /// Records are visited in the store's enumeration order, which is also
    /// the order of `list`. Malformed records are skipped by the store.
    pub fn rebuild(&self) -> Result<IndexSet, IndexError> {
        let started = Instant::now();
        let mut index = IndexSet::default();

        for offer in self.store.list_all()? {
            add_offer(&mut index, &offer);
        }

        let elapsed = started.elapsed();
        metrics::INDEX_REBUILD_DURATION
            .with_label_values(&[])
            .observe(elapsed.as_secs_f64());
        info!(
            offers = index.list.len(),
            namespaces = index.namespaces.len(),
            tags = index.tags.len(),
            duration_ms = elapsed.as_millis() as u64,
            "Index rebuilt"
        );
        Ok(index)
    }

    /// [`Indexer::rebuild`] on the blocking thread pool.
    pub async fn rebuild_blocking(&self) -> Result<IndexSet, IndexError> {
        let indexer = self.clone();
        tokio::task::spawn_blocking(move || indexer.rebuild())
            .await
            .map_err(|e| IndexError::Task(e.to_string()))?
    }
}

fn add_offer(index: &mut IndexSet, offer: &Offer) {
    if let Some(namespace) = &offer.namespace {
        index
            .namespaces
            .entry(namespace.clone())
            .or_default()
            .insert(offer.id.clone());
    }

    index.titles.insert(offer.id.clone(), offer.title.clone());

    for tag in offer.tags() {
        index.tags.insert(tag.id.clone(), tag.clone());
    }

    let entry = ListEntry::from(offer);
    if entry.thumbnail_url.is_empty() {
        debug!(id = %offer.id, "Offer has no thumbnail");
    }
    index.list.push(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::{Category, KeyImage, Seller, Tag};
    use crate::testing::{fixtures, MemoryRecordStore};
    use serde_json::Map;

    fn tag(id: &str, name: &str) -> Tag {
        Tag {
            id: id.to_string(),
            name: Some(name.to_string()),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_epoch_seconds() {
        assert_eq!(epoch_seconds(Some("1970-01-01T00:01:00.000Z")), 60);
        assert_eq!(epoch_seconds(Some("2020-06-01T12:00:00+02:00")), 1591005600);
        assert_eq!(epoch_seconds(Some("not a date")), 0);
        assert_eq!(epoch_seconds(None), 0);
    }

    #[test]
    fn test_list_entry_from_full_offer() {
        let mut offer = Offer::new("a", "Game A");
        offer.namespace = Some("ns".to_string());
        offer.categories = Some(vec![
            Some(Category {
                path: "games".to_string(),
            }),
            None,
            Some(Category {
                path: "games/edition/base".to_string(),
            }),
        ]);
        offer.seller = Some(Seller {
            name: Some("Studio".to_string()),
            extra: Map::new(),
        });
        offer.creation_date = Some("1970-01-01T00:00:10.000Z".to_string());
        offer.last_modified_date = Some("1970-01-01T00:00:20.000Z".to_string());
        offer.key_images = Some(vec![KeyImage {
            image_type: "Thumbnail".to_string(),
            url: "https://cdn/a.png".to_string(),
        }]);
        offer.product_slug = Some("game-a".to_string());

        let entry = ListEntry::from(&offer);
        assert_eq!(entry.namespace, "ns");
        assert_eq!(entry.category_paths, vec!["games", "games/edition/base"]);
        assert_eq!(entry.seller_name, "Studio");
        assert_eq!(entry.created_at, 10);
        assert_eq!(entry.last_modified_at, 20);
        assert_eq!(entry.thumbnail_url, "https://cdn/a.png");
        assert_eq!(entry.product_slug, "game-a");
    }

    #[test]
    fn test_list_entry_defaults_for_bare_offer() {
        let entry = ListEntry::from(&Offer::new("b", "Bare"));
        assert_eq!(
            entry,
            ListEntry {
                id: "b".to_string(),
                title: "Bare".to_string(),
                ..ListEntry::default()
            }
        );
    }

    #[test]
    fn test_thumbnail_missing_or_non_thumbnail_is_empty() {
        let mut without_images = Offer::new("a", "A");
        without_images.key_images = None;

        let mut wide_only = Offer::new("b", "B");
        wide_only.key_images = Some(vec![KeyImage {
            image_type: "DieselStoreFrontWide".to_string(),
            url: "https://cdn/wide.png".to_string(),
        }]);

        let store = Arc::new(MemoryRecordStore::with_offers(vec![without_images, wide_only]));
        let index = Indexer::new(store).rebuild().unwrap();

        assert_eq!(index.list.len(), 2);
        assert!(index.list.iter().all(|e| e.thumbnail_url.is_empty()));
    }

    #[test]
    fn test_rebuild_groups_namespaces_and_merges_tags() {
        let mut a = fixtures::offer("a", Some("ns1"));
        a.tags = Some(vec![Some(tag("1", "Action")), None, Some(tag("2", "RPG"))]);
        let mut b = fixtures::offer("b", Some("ns1"));
        b.tags = Some(vec![Some(tag("1", "Action (renamed)"))]);
        let c = fixtures::offer("c", Some("ns2"));
        let d = fixtures::offer("d", None);

        let store = Arc::new(MemoryRecordStore::with_offers(vec![a, b, c, d]));
        let index = Indexer::new(store).rebuild().unwrap();

        assert_eq!(index.namespaces.len(), 2);
        assert_eq!(
            index.namespaces["ns1"].iter().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert_eq!(index.namespaces["ns2"].iter().collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(index.titles.len(), 4);
        assert_eq!(index.titles["d"], fixtures::offer("d", None).title);
        assert_eq!(index.tags.len(), 2);
        assert_eq!(index.tags["1"].name.as_deref(), Some("Action (renamed)"));
        let ids: Vec<_> = index.list.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let store = Arc::new(MemoryRecordStore::with_offers(vec![
            fixtures::offer("x", Some("ns")),
            fixtures::offer("y", Some("ns")),
        ]));
        let indexer = Indexer::new(store);

        let first = serde_json::to_string(&indexer.rebuild().unwrap()).unwrap();
        let second = serde_json::to_string(&indexer.rebuild().unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rebuild_blocking() {
        let store = Arc::new(MemoryRecordStore::with_offers(vec![fixtures::offer(
            "x",
            Some("ns"),
        )]));
        let index = Indexer::new(store).rebuild_blocking().await.unwrap();
        assert_eq!(index.len(), 1);
    }
}
