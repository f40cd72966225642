//! Record persistence.
//!
//! Offers are stored one JSON file per id. The store is append/overwrite
//! only: nothing here deletes a record.

mod error;
mod fs_store;

pub use error::StoreError;
pub use fs_store::FsRecordStore;

use async_trait::async_trait;

use crate::offer::Offer;

/// Lazily evaluated sequence of stored offers.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Offer> + Send + 'a>;

/// Keyed storage for offers.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write or overwrite the record for `offer.id`. Last write wins.
    ///
    /// The write is complete and visible to [`RecordStore::list_all`] once
    /// the returned future resolves.
    async fn save(&self, offer: &Offer) -> Result<(), StoreError>;

    /// Every persisted record, in a deterministic order.
    ///
    /// Entries that cannot be read or parsed are logged and skipped.
    fn list_all(&self) -> Result<RecordIter<'_>, StoreError>;
}

/// Check that an id can be used as a file name.
pub fn validate_record_id(id: &str) -> Result<(), StoreError> {
    let invalid = id.is_empty()
        || id == "."
        || id == ".."
        || id.starts_with('.')
        || id.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}
