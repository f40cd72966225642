//! Catalog offer records and the pagination envelope they arrive in.
//!
//! An [`Offer`] is the unit the mirror persists: one file per offer id,
//! overwritten wholesale whenever the remote returns it again. Only the
//! fields the indexer reads are typed; everything else the remote sends is
//! kept verbatim in [`Offer::extra`] so the stored file stays a complete
//! snapshot.

mod types;

pub use types::*;
