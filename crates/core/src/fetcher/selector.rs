//! Projection of a raw `data` object onto the page shape.

use serde_json::Value;

use crate::offer::Page;

/// Dotted path to the `{elements, paging}` object inside a response's
/// `data`, e.g. `Catalog.searchStore`.
///
/// The same fetcher serves every query shape; only the selector differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSelector {
    path: Vec<String>,
}

impl ResultSelector {
    /// Store-wide search results.
    pub const STORE_SEARCH: &'static str = "Catalog.searchStore";
    /// Offers of a single namespace.
    pub const NAMESPACE_OFFERS: &'static str = "Catalog.catalogOffers";

    pub fn new(path: &str) -> Self {
        Self {
            path: path
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn store_search() -> Self {
        Self::new(Self::STORE_SEARCH)
    }

    pub fn namespace_offers() -> Self {
        Self::new(Self::NAMESPACE_OFFERS)
    }

    /// The dotted path this selector follows.
    pub fn path(&self) -> String {
        self.path.join(".")
    }

    /// Follow the path into `data`.
    pub fn select<'a>(&self, data: &'a Value) -> Option<&'a Value> {
        self.path
            .iter()
            .try_fold(data, |value, segment| value.get(segment.as_str()))
    }

    /// Follow the path and parse the result as a page.
    ///
    /// Returns `None` when the path is missing or the value lacks a valid
    /// `elements` array and `paging` cursor.
    pub fn project(&self, data: &Value) -> Option<Page> {
        let selected = self.select(data)?;
        serde_json::from_value(selected.clone()).ok()
    }
}
