use std::path::Path;
use std::sync::Arc;

use crate::config::{ConfigError, QueriesConfig};

const STORE_OFFERS_QUERY: &str = include_str!("../../queries/FetchStoreOffersQuery.graphql");
const OFFERS_BY_NAMESPACE_QUERY: &str =
    include_str!("../../queries/FetchStoreOffersByNamespaceQuery.graphql");

/// The GraphQL documents a run sends. Treated as opaque text.
#[derive(Debug, Clone)]
pub struct QueryDocuments {
    pub store_offers: Arc<str>,
    pub offers_by_namespace: Arc<str>,
}

impl Default for QueryDocuments {
    fn default() -> Self {
        Self {
            store_offers: Arc::from(STORE_OFFERS_QUERY),
            offers_by_namespace: Arc::from(OFFERS_BY_NAMESPACE_QUERY),
        }
    }
}

async fn read_document(path: &Path) -> Result<Arc<str>, ConfigError> {
    tokio::fs::read_to_string(path)
        .await
        .map(Arc::from)
        .map_err(|source| ConfigError::QueryDocument {
            path: path.display().to_string(),
            source,
        })
}

impl QueryDocuments {
    /// Built-in documents, replaced by any file configured in `[queries]`.
    pub async fn load(config: &QueriesConfig) -> Result<Self, ConfigError> {
        let mut documents = Self::default();
        if let Some(path) = &config.store_offers {
            documents.store_offers = read_document(path).await?;
        }
        if let Some(path) = &config.offers_by_namespace {
            documents.offers_by_namespace = read_document(path).await?;
        }
        Ok(documents)
    }
}
