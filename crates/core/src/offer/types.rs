//! Offer and paging types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Offer
// ============================================================================

/// A catalog offer as returned by the remote API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    /// Stable primary key.
    pub id: String,
    /// Group key (the offer's sandbox/namespace).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub title: String,
    /// Tags in remote order. Individual entries may be null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Option<Tag>>>,
    /// Categories in remote order. Individual entries may be null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Option<Category>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<Seller>,
    /// ISO-8601 creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    /// ISO-8601 last modification timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_images: Option<Vec<KeyImage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_slug: Option<String>,
    /// Every other field of the remote payload, preserved as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Offer {
    /// Create a bare offer with only an id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            namespace: None,
            title: title.into(),
            tags: None,
            categories: None,
            seller: None,
            creation_date: None,
            last_modified_date: None,
            key_images: None,
            product_slug: None,
            extra: Map::new(),
        }
    }

    /// Parse an offer from a raw page element.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Non-null tags in remote order.
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter().flatten().flatten()
    }

    /// Category paths in remote order, skipping null entries.
    pub fn category_paths(&self) -> Vec<String> {
        self.categories
            .iter()
            .flatten()
            .flatten()
            .map(|c| c.path.clone())
            .collect()
    }

    /// URL of the first key image typed `Thumbnail`, if any.
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.key_images
            .as_ref()?
            .iter()
            .find(|image| image.image_type == THUMBNAIL_IMAGE_TYPE)
            .map(|image| image.url.as_str())
    }

    /// Seller display name, if present.
    pub fn seller_name(&self) -> Option<&str> {
        self.seller.as_ref().and_then(|s| s.name.as_deref())
    }
}

/// Key image type used for list thumbnails.
pub const THUMBNAIL_IMAGE_TYPE: &str = "Thumbnail";

/// An offer tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An offer category, e.g. `games/edition/base`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub path: String,
}

/// The seller of an offer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Seller {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A key image (thumbnail, wide banner, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyImage {
    #[serde(rename = "type")]
    pub image_type: String,
    pub url: String,
}

// ============================================================================
// Paging
// ============================================================================

/// Pagination cursor echoed back by the remote.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paging {
    /// Offset of the first element of this page.
    pub start: u64,
    /// Page size the remote applied.
    pub count: u64,
    /// Size of the whole collection.
    pub total: u64,
}

impl Paging {
    /// Offset of the page after this one.
    pub fn next_start(&self) -> u64 {
        self.start.saturating_add(self.count)
    }
}

/// One page of results after projection by a result selector.
///
/// Elements stay raw so a single malformed offer does not reject the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub elements: Vec<Value>,
    pub paging: Paging,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_offer_keeps_unknown_fields() {
        let value = json!({
            "id": "abc",
            "title": "Some Game",
            "namespace": "ns1",
            "effectiveDate": "2020-01-01T00:00:00.000Z",
            "price": { "totalPrice": { "discountPrice": 0 } }
        });

        let offer = Offer::from_value(value.clone()).unwrap();
        assert_eq!(offer.id, "abc");
        assert_eq!(offer.namespace.as_deref(), Some("ns1"));
        assert!(offer.extra.contains_key("effectiveDate"));

        let back = serde_json::to_value(&offer).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_offer_requires_id() {
        let result = Offer::from_value(json!({ "title": "No id" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_null_tags_and_categories_are_skipped() {
        let offer = Offer::from_value(json!({
            "id": "x",
            "title": "X",
            "tags": [null, { "id": "1", "name": "Action" }],
            "categories": [{ "path": "games" }, null, { "path": "applications" }]
        }))
        .unwrap();

        let tags: Vec<_> = offer.tags().map(|t| t.id.as_str()).collect();
        assert_eq!(tags, vec!["1"]);
        assert_eq!(offer.category_paths(), vec!["games", "applications"]);
    }

    #[test]
    fn test_thumbnail_url() {
        let mut offer = Offer::new("x", "X");
        assert_eq!(offer.thumbnail_url(), None);

        offer.key_images = Some(vec![
            KeyImage {
                image_type: "DieselStoreFrontWide".to_string(),
                url: "https://cdn/wide.png".to_string(),
            },
            KeyImage {
                image_type: "Thumbnail".to_string(),
                url: "https://cdn/thumb.png".to_string(),
            },
            KeyImage {
                image_type: "Thumbnail".to_string(),
                url: "https://cdn/second.png".to_string(),
            },
        ]);
        assert_eq!(offer.thumbnail_url(), Some("https://cdn/thumb.png"));
    }

    #[test]
    fn test_paging_next_start() {
        let paging = Paging {
            start: 1000,
            count: 1000,
            total: 2500,
        };
        assert_eq!(paging.next_start(), 2000);
    }
}
