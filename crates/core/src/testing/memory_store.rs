//! In-memory record store for testing.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::offer::Offer;
use crate::store::{validate_record_id, RecordIter, RecordStore, StoreError};

use super::lock;

/// Mock implementation of the RecordStore trait.
///
/// Records are kept in id order. Ids registered with
/// [`MemoryRecordStore::fail_on`] fail to save.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<String, Offer>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `offers`.
    pub fn with_offers(offers: Vec<Offer>) -> Self {
        let store = Self::new();
        lock(&store.records).extend(offers.into_iter().map(|o| (o.id.clone(), o)));
        store
    }

    /// Make saves of `id` fail.
    pub fn fail_on(&self, id: &str) {
        lock(&self.failing).insert(id.to_string());
    }

    pub fn get(&self, id: &str) -> Option<Offer> {
        lock(&self.records).get(id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.records).is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn save(&self, offer: &Offer) -> Result<(), StoreError> {
        validate_record_id(&offer.id)?;
        if lock(&self.failing).contains(&offer.id) {
            return Err(StoreError::Backend(format!(
                "simulated write failure for {}",
                offer.id
            )));
        }
        lock(&self.records).insert(offer.id.clone(), offer.clone());
        Ok(())
    }

    fn list_all(&self) -> Result<RecordIter<'_>, StoreError> {
        let offers: Vec<Offer> = lock(&self.records).values().cloned().collect();
        Ok(Box::new(offers.into_iter()))
    }
}
