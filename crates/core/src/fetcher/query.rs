use std::sync::Arc;

use serde_json::{Map, Value};

use super::ResultSelector;

/// A paginated query: document, filters and where the page lives in the
/// response.
#[derive(Debug, Clone)]
pub struct OfferQuery {
    /// Short name used in logs and metric labels (`store`, `namespace:ue`).
    pub label: String,
    /// Opaque GraphQL document.
    pub document: Arc<str>,
    /// Query-specific filters; `start` and `count` are added per request.
    pub variables: Map<String, Value>,
    pub selector: ResultSelector,
}

impl OfferQuery {
    pub fn new(
        label: impl Into<String>,
        document: impl Into<Arc<str>>,
        selector: ResultSelector,
    ) -> Self {
        Self {
            label: label.into(),
            document: document.into(),
            variables: Map::new(),
            selector,
        }
    }

    /// Add a filter variable.
    pub fn with_variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    /// Variables for one page request.
    pub fn variables_for(&self, start: u64, count: u64) -> Map<String, Value> {
        let mut variables = self.variables.clone();
        variables.insert("start".to_string(), Value::from(start));
        variables.insert("count".to_string(), Value::from(count));
        variables
    }
}
