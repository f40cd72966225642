//! Mirror lifecycle integration tests.
//!
//! These tests run the full cycle against a mock remote and a real
//! filesystem database:
//! - Multi-page drains land one file per offer
//! - The four index artifacts are derived from what is on disk
//! - Rebuilds are byte-stable and incremental additions show up exactly once
//! - Namespace drains overwrite records fetched earlier in the run

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use offermirror_core::{
    index::ARTIFACT_NAMES,
    remote::GraphQlResponse,
    testing::{fixtures, MockCatalog, MockTransport, RecordingPublisher},
    Config, FsRecordStore, IndexSet, IndexWriter, MirrorRunner, PublishOutcome, QueryDocuments,
    RecordStore, ResultSelector,
};

/// Test helper wiring a runner to a temp database.
struct TestHarness {
    runner: MirrorRunner,
    transport: Arc<MockTransport>,
    publisher: Arc<RecordingPublisher>,
    store: Arc<FsRecordStore>,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new(transport: MockTransport, namespaces: &[&str]) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.storage.database_root = temp_dir.path().join("database");
        config.catalog.page_size = 2;
        config.catalog.namespaces = namespaces.iter().map(|ns| ns.to_string()).collect();
        config.retry.delay_ms = 5;
        config.retry.max_attempts = Some(5);

        let transport = Arc::new(transport);
        let publisher = Arc::new(RecordingPublisher::new());
        let store = Arc::new(FsRecordStore::new(config.storage.records_dir()));
        let runner = MirrorRunner::new(
            config,
            QueryDocuments::default(),
            transport.clone(),
            store.clone(),
            publisher.clone(),
        );

        Self {
            runner,
            transport,
            publisher,
            store,
            temp_dir,
        }
    }

    fn database_root(&self) -> PathBuf {
        self.temp_dir.path().join("database")
    }

    fn index_dir(&self) -> PathBuf {
        self.database_root().join("index")
    }

    fn record_files(&self) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(self.database_root().join("offers"))
            .expect("offers directory should exist")
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn read_artifacts(&self) -> BTreeMap<&'static str, Vec<u8>> {
        ARTIFACT_NAMES
            .iter()
            .map(|name| (*name, std::fs::read(self.index_dir().join(name)).unwrap()))
            .collect()
    }

    async fn load_index(&self) -> IndexSet {
        IndexWriter::new(self.index_dir())
            .load()
            .await
            .unwrap()
            .expect("index should have been written")
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_three_page_catalog_end_to_end() {
    let harness = TestHarness::new(
        MockTransport::with_catalog(MockCatalog::new(
            ResultSelector::STORE_SEARCH,
            fixtures::offer_values(0..5),
        )),
        &[],
    );

    let report = harness.runner.run().await.unwrap();

    // Pages of 2, 2 and 1.
    let counts: Vec<_> = harness
        .transport
        .calls()
        .iter()
        .map(|c| (c.variables["start"].clone(), c.variables["count"].clone()))
        .collect();
    assert_eq!(
        counts,
        vec![
            (json!(0), json!(2)),
            (json!(2), json!(2)),
            (json!(4), json!(2))
        ]
    );
    assert_eq!(report.metrics.phase("store").unwrap().pages, 3);

    let expected_files: Vec<_> = (0..5)
        .map(|i| format!("{}.json", fixtures::offer_id(i)))
        .collect();
    assert_eq!(harness.record_files(), expected_files);

    // Stored records keep fields the index never reads.
    let stored = read_json(
        &harness
            .database_root()
            .join("offers")
            .join(format!("{}.json", fixtures::offer_id(3))),
    );
    assert_eq!(stored["description"], json!("Synthetic offer number 3"));

    let list = read_json(&harness.index_dir().join("list.json"));
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 5);
    let ids: Vec<_> = list.iter().map(|row| row[0].as_str().unwrap()).collect();
    let expected_ids: Vec<_> = (0..5).map(fixtures::offer_id).collect();
    assert_eq!(ids, expected_ids);
    assert_eq!(list[0].as_array().unwrap().len(), 9);
    assert_eq!(list[0][1], json!("ns-0"));
    assert_eq!(list[0][4], json!("Mock Seller"));
    assert_eq!(list[0][7], json!("https://cdn.test/0/thumb.png"));

    let namespaces = read_json(&harness.index_dir().join("namespaces.json"));
    assert_eq!(
        namespaces,
        json!({
            "ns-0": [fixtures::offer_id(0), fixtures::offer_id(3)],
            "ns-1": [fixtures::offer_id(1), fixtures::offer_id(4)],
            "ns-2": [fixtures::offer_id(2)]
        })
    );

    let titles = read_json(&harness.index_dir().join("titles.json"));
    assert_eq!(titles[fixtures::offer_id(4)], json!("Offer 4"));

    let tags = read_json(&harness.index_dir().join("tags.json"));
    assert_eq!(tags.as_object().unwrap().len(), 4);

    let metrics = read_json(&harness.database_root().join("metrics.json"));
    assert!(metrics["last_update"].is_string());

    assert!(matches!(report.publish, PublishOutcome::Committed { .. }));
    assert_eq!(
        harness.publisher.calls(),
        vec![(harness.database_root(), true)]
    );
}

#[tokio::test]
async fn test_rebuild_is_byte_identical() {
    let harness = TestHarness::new(
        MockTransport::with_catalog(MockCatalog::new(
            ResultSelector::STORE_SEARCH,
            fixtures::offer_values(0..7),
        )),
        &[],
    );

    harness.runner.run().await.unwrap();
    let first = harness.read_artifacts();

    let report = harness.runner.reindex().await.unwrap();
    let second = harness.read_artifacts();

    assert_eq!(first, second);
    assert!(!report.index_changed);
    assert_eq!(report.publish, PublishOutcome::Skipped);
}

#[tokio::test]
async fn test_adding_one_record_adds_one_entry_everywhere() {
    let harness = TestHarness::new(
        MockTransport::with_catalog(MockCatalog::new(
            ResultSelector::STORE_SEARCH,
            fixtures::offer_values(0..4),
        )),
        &[],
    );
    harness.runner.run().await.unwrap();
    let before = harness.load_index().await;

    harness
        .store
        .save(&fixtures::offer("added", Some("abc")))
        .await
        .unwrap();
    let report = harness.runner.reindex().await.unwrap();
    let after = harness.load_index().await;

    assert!(report.index_changed);
    assert_eq!(after.list.len(), before.list.len() + 1);
    assert_eq!(after.titles.len(), before.titles.len() + 1);
    assert_eq!(after.titles["added"], "Title of added");
    assert!(!before.namespaces.contains_key("abc"));
    assert_eq!(after.namespaces["abc"].len(), 1);
    assert!(after.namespaces["abc"].contains("added"));
    assert_eq!(after.namespaces.len(), before.namespaces.len() + 1);
    assert_eq!(after.list.iter().filter(|e| e.id == "added").count(), 1);
}

#[tokio::test]
async fn test_namespace_drain_overwrites_store_records() {
    let transport = MockTransport::new();
    transport.push_response(GraphQlResponse::with_data(fixtures::page_data(
        ResultSelector::STORE_SEARCH,
        fixtures::offer_values(0..2),
        0,
        2,
        3,
    )));
    transport.push_response(GraphQlResponse::with_data(fixtures::page_data(
        ResultSelector::STORE_SEARCH,
        fixtures::offer_values(2..3),
        2,
        2,
        3,
    )));
    let mut renamed = fixtures::offer_values(1..2).remove(0);
    renamed["title"] = json!("Renamed in namespace");
    transport.push_response(GraphQlResponse::with_data(fixtures::page_data(
        ResultSelector::NAMESPACE_OFFERS,
        vec![renamed],
        0,
        2,
        1,
    )));
    let harness = TestHarness::new(transport, &["ns-1"]);

    let report = harness.runner.run().await.unwrap();

    let calls = harness.transport.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].variables["namespace"], json!("ns-1"));
    assert!(calls[2].document.contains("catalogOffers"));
    assert_eq!(report.metrics.phase("namespace:ns-1").unwrap().records, 1);
    assert_eq!(report.metrics.records_persisted(), 4);

    assert_eq!(harness.record_files().len(), 3);
    let index = harness.load_index().await;
    assert_eq!(index.titles[&fixtures::offer_id(1)], "Renamed in namespace");
}

#[tokio::test]
async fn test_unreadable_record_is_skipped_by_indexing() {
    let harness = TestHarness::new(
        MockTransport::with_catalog(MockCatalog::new(
            ResultSelector::STORE_SEARCH,
            fixtures::offer_values(0..3),
        )),
        &[],
    );
    harness.runner.run().await.unwrap();

    std::fs::write(
        harness.database_root().join("offers").join("broken.json"),
        b"{ not json",
    )
    .unwrap();
    let report = harness.runner.reindex().await.unwrap();

    assert_eq!(report.indexed, 3);
    assert!(!harness.load_index().await.titles.contains_key("broken"));
}
