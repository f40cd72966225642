//! Index artifact types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::offer::Tag;

/// Positional form of a list entry as written to `list.json`.
type ListTuple = (
    String,
    String,
    String,
    Vec<String>,
    String,
    i64,
    i64,
    String,
    String,
);

/// Compact per-offer row of the `list` artifact.
///
/// Serialized as a JSON array:
/// `[id, namespace, title, categoryPaths, sellerName, createdAt,
/// lastModifiedAt, thumbnailUrl, productSlug]`, with timestamps in epoch
/// seconds. Absent source fields become `""`, `0` or `[]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ListTuple", into = "ListTuple")]
pub struct ListEntry {
    pub id: String,
    pub namespace: String,
    pub title: String,
    pub category_paths: Vec<String>,
    pub seller_name: String,
    pub created_at: i64,
    pub last_modified_at: i64,
    pub thumbnail_url: String,
    pub product_slug: String,
}

impl From<ListTuple> for ListEntry {
    fn from(t: ListTuple) -> Self {
        Self {
            id: t.0,
            namespace: t.1,
            title: t.2,
            category_paths: t.3,
            seller_name: t.4,
            created_at: t.5,
            last_modified_at: t.6,
            thumbnail_url: t.7,
            product_slug: t.8,
        }
    }
}

impl From<ListEntry> for ListTuple {
    fn from(e: ListEntry) -> Self {
        (
            e.id,
            e.namespace,
            e.title,
            e.category_paths,
            e.seller_name,
            e.created_at,
            e.last_modified_at,
            e.thumbnail_url,
            e.product_slug,
        )
    }
}

/// The full set of derived artifacts.
///
/// Maps are ordered so serialization is byte-stable across rebuilds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSet {
    /// Namespace to the ids of offers declaring it.
    pub namespaces: BTreeMap<String, BTreeSet<String>>,
    /// Offer id to title.
    pub titles: BTreeMap<String, String>,
    /// Tag id to tag, deduplicated across offers.
    pub tags: BTreeMap<String, Tag>,
    /// One entry per offer, in store enumeration order.
    pub list: Vec<ListEntry>,
}

impl IndexSet {
    /// Number of offers indexed.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_entry_serializes_as_array() {
        let entry = ListEntry {
            id: "a".to_string(),
            namespace: "ns".to_string(),
            title: "Game".to_string(),
            category_paths: vec!["games".to_string()],
            seller_name: "Studio".to_string(),
            created_at: 1,
            last_modified_at: 2,
            thumbnail_url: "https://cdn/t.png".to_string(),
            product_slug: "game".to_string(),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!(["a", "ns", "Game", ["games"], "Studio", 1, 2, "https://cdn/t.png", "game"])
        );

        let back: ListEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_default_entry_uses_safe_defaults() {
        let value = serde_json::to_value(ListEntry::default()).unwrap();
        assert_eq!(value, json!(["", "", "", [], "", 0, 0, "", ""]));
    }
}
