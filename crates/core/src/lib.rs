pub mod config;
pub mod fetcher;
pub mod index;
pub mod metrics;
pub mod offer;
pub mod remote;
pub mod runner;
pub mod store;
pub mod sync;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, NamespaceErrorPolicy,
    SanitizedConfig,
};
pub use fetcher::{
    CancellationFlag, DrainSummary, FetchError, OfferQuery, PageFetcher, PaginationDriver,
    ResultSelector, RetryPolicy,
};
pub use index::{IndexError, IndexSet, IndexWriter, Indexer, ListEntry};
pub use offer::{Offer, Page, Paging};
pub use remote::{GraphQlClient, GraphQlResponse, QueryTransport, TransportError};
pub use runner::{MirrorRunner, QueryDocuments, RunError, RunMetrics, RunReport};
pub use store::{FsRecordStore, RecordStore, StoreError};
pub use sync::{GitPublisher, NoopPublisher, PublishOutcome, Publisher, SyncError};
