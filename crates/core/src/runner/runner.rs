//! Mirror run orchestration.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::{Config, NamespaceErrorPolicy};
use crate::fetcher::{
    CancellationFlag, DrainSummary, OfferQuery, PageFetcher, PaginationDriver, ResultSelector,
    RetryPolicy,
};
use crate::index::{IndexSet, IndexWriter, Indexer};
use crate::metrics;
use crate::remote::QueryTransport;
use crate::store::RecordStore;
use crate::sync::{PublishOutcome, Publisher};

use super::types::{config_hash, PhaseMetrics, RunMetrics, RunReport};
use super::{QueryDocuments, RunError};

/// File name of the run metrics artifact under the database root.
///
/// The artifact is written before publishing so it ships with the snapshot.
/// It therefore covers the phases up to indexing; the `publish` phase is
/// only reported in [`RunReport`].
pub const RUN_METRICS_FILE: &str = "metrics.json";

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Drives one complete mirror run.
pub struct MirrorRunner {
    config: Config,
    documents: QueryDocuments,
    driver: PaginationDriver,
    indexer: Indexer,
    index_writer: IndexWriter,
    publisher: Arc<dyn Publisher>,
}

impl MirrorRunner {
    pub fn new(
        config: Config,
        documents: QueryDocuments,
        transport: Arc<dyn QueryTransport>,
        store: Arc<dyn RecordStore>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self::with_cancellation(
            config,
            documents,
            transport,
            store,
            publisher,
            CancellationFlag::new(),
        )
    }

    /// Like [`MirrorRunner::new`], stopping between pages once `cancel` is set.
    pub fn with_cancellation(
        config: Config,
        documents: QueryDocuments,
        transport: Arc<dyn QueryTransport>,
        store: Arc<dyn RecordStore>,
        publisher: Arc<dyn Publisher>,
        cancel: CancellationFlag,
    ) -> Self {
        let fetcher = PageFetcher::new(transport, RetryPolicy::from(&config.retry))
            .with_cancellation(cancel.clone());
        let driver = PaginationDriver::new(fetcher, Arc::clone(&store))
            .with_page_size(config.catalog.page_size)
            .with_write_concurrency(config.catalog.write_concurrency)
            .with_cancellation(cancel);

        Self {
            indexer: Indexer::new(store),
            index_writer: IndexWriter::new(config.storage.index_dir()),
            config,
            documents,
            driver,
            publisher,
        }
    }

    pub fn database_root(&self) -> &Path {
        &self.config.storage.database_root
    }

    /// Store-wide search, newest modifications first.
    pub fn store_query(&self) -> OfferQuery {
        let catalog = &self.config.catalog;
        OfferQuery::new(
            "store",
            Arc::clone(&self.documents.store_offers),
            ResultSelector::store_search(),
        )
        .with_variable("country", catalog.country.as_str())
        .with_variable("locale", catalog.locale.as_str())
        .with_variable("sortBy", catalog.sort_by.as_str())
        .with_variable("sortDir", catalog.sort_dir.as_str())
    }

    /// All offers of one namespace.
    pub fn namespace_query(&self, namespace: &str) -> OfferQuery {
        let catalog = &self.config.catalog;
        OfferQuery::new(
            format!("namespace:{}", namespace),
            Arc::clone(&self.documents.offers_by_namespace),
            ResultSelector::namespace_offers(),
        )
        .with_variable("namespace", namespace)
        .with_variable("country", catalog.country.as_str())
        .with_variable("locale", catalog.locale.as_str())
    }

    async fn drain(&self, query: &OfferQuery) -> Result<(DrainSummary, u64), RunError> {
        let started = Instant::now();
        let summary = self
            .driver
            .drain_all(query)
            .await
            .map_err(|source| RunError::Fetch {
                query: query.label.clone(),
                source,
            })?;
        Ok((summary, elapsed_ms(started)))
    }

    /// Fetch everything, rebuild the index and publish.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let mut metrics = RunMetrics::start(config_hash(&self.config));
        let mut skipped_namespaces = Vec::new();

        info!("Updating store offers...");
        let query = self.store_query();
        let (summary, duration_ms) = self.drain(&query).await?;
        metrics.record(PhaseMetrics::from_drain(&query.label, duration_ms, &summary));

        for namespace in &self.config.catalog.namespaces {
            info!(namespace = %namespace, "Updating offers for namespace...");
            let query = self.namespace_query(namespace);
            match self.drain(&query).await {
                Ok((summary, duration_ms)) => {
                    metrics.record(PhaseMetrics::from_drain(&query.label, duration_ms, &summary));
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => match self.config.catalog.on_namespace_error {
                    NamespaceErrorPolicy::Abort => return Err(e),
                    NamespaceErrorPolicy::Skip => {
                        error!(namespace = %namespace, error = %e, "Skipping namespace");
                        skipped_namespaces.push(namespace.clone());
                    }
                },
            }
        }

        let (index, index_changed) = self.index_phase(&mut metrics).await?;
        self.write_run_artifacts(&metrics).await?;

        let changed = metrics.records_persisted() > 0 || index_changed;
        let publish = self.publish_phase(&mut metrics, changed).await?;

        Ok(RunReport {
            metrics,
            skipped_namespaces,
            indexed: index.len(),
            index_changed,
            publish,
        })
    }

    /// Rebuild and write the index without fetching, then publish.
    pub async fn reindex(&self) -> Result<RunReport, RunError> {
        let mut metrics = RunMetrics::start(config_hash(&self.config));

        let (index, index_changed) = self.index_phase(&mut metrics).await?;
        self.write_run_artifacts(&metrics).await?;
        let publish = self.publish_phase(&mut metrics, index_changed).await?;

        Ok(RunReport {
            metrics,
            skipped_namespaces: Vec::new(),
            indexed: index.len(),
            index_changed,
            publish,
        })
    }

    async fn index_phase(&self, metrics: &mut RunMetrics) -> Result<(IndexSet, bool), RunError> {
        info!("Rebuilding indexes...");
        let started = Instant::now();

        let previous = match self.index_writer.load().await {
            Ok(previous) => previous,
            Err(e) => {
                warn!(error = %e, "Previous index unreadable, treating as absent");
                None
            }
        };

        let index = self.indexer.rebuild_blocking().await?;
        self.index_writer.write(&index).await?;
        let changed = previous.as_ref() != Some(&index);

        let mut phase = PhaseMetrics::new("index", elapsed_ms(started));
        phase.records = index.len();
        metrics.record(phase);
        metrics.last_update = Some(Utc::now());

        Ok((index, changed))
    }

    async fn publish_phase(
        &self,
        metrics: &mut RunMetrics,
        changed: bool,
    ) -> Result<PublishOutcome, RunError> {
        info!(publisher = self.publisher.name(), changed, "Publishing snapshot...");
        let started = Instant::now();
        let outcome = self.publisher.publish(self.database_root(), changed).await?;
        metrics.record(PhaseMetrics::new("publish", elapsed_ms(started)));
        info!(outcome = ?outcome, "Publish finished");
        Ok(outcome)
    }

    /// Write `metrics.json` and, when configured, the Prometheus text file.
    async fn write_run_artifacts(&self, run_metrics: &RunMetrics) -> Result<(), RunError> {
        let path = self.database_root().join(RUN_METRICS_FILE);
        let json = serde_json::to_vec_pretty(run_metrics).map_err(|e| RunError::Metrics {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        write_file(&path, &json).await?;

        if let Some(textfile) = &self.config.metrics.textfile {
            let text = metrics::encode_metrics().map_err(|e| RunError::Metrics {
                path: textfile.display().to_string(),
                message: e.to_string(),
            })?;
            write_file(textfile, text.as_bytes()).await?;
        }
        Ok(())
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), RunError> {
    let to_error = |e: std::io::Error| RunError::Metrics {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(to_error)?;
        }
    }
    tokio::fs::write(path, bytes).await.map_err(to_error)
}
