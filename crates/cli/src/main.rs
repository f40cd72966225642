use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use offermirror_core::{
    load_config, validate_config, CancellationFlag, Config, FsRecordStore, GitPublisher,
    GraphQlClient, MirrorRunner, NoopPublisher, Publisher, QueryDocuments, RunReport,
    SanitizedConfig,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[clap(
    name = "offermirror",
    about = "Mirror a paginated GraphQL offer catalog into a versioned file database",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Configuration file
    #[clap(
        long,
        env = "OFFERMIRROR_CONFIG",
        default_value = "offermirror.toml",
        global = true
    )]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[clap(long, global = true)]
    log_json: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Fetch every offer, rebuild the indexes and publish
    Run,

    /// Rebuild the indexes from stored records and publish
    Reindex,

    /// Load and validate the configuration, then print it with secrets hidden
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("offermirror {} loading configuration from {:?}", VERSION, cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    if let Command::CheckConfig = cli.command {
        let sanitized = SanitizedConfig::from(&config);
        println!("{}", serde_json::to_string_pretty(&sanitized)?);
        return Ok(());
    }

    info!("Endpoint: {}", config.remote.endpoint);
    info!("Database root: {:?}", config.storage.database_root);

    let runner = build_runner(&config).await?;
    let report = match cli.command {
        Command::Reindex => runner.reindex().await?,
        _ => runner.run().await?,
    };
    log_report(&report);
    Ok(())
}

async fn build_runner(config: &Config) -> Result<MirrorRunner> {
    let documents = QueryDocuments::load(&config.queries)
        .await
        .context("Failed to load query documents")?;
    let transport =
        Arc::new(GraphQlClient::new(&config.remote).context("Failed to create GraphQL client")?);
    let store = Arc::new(FsRecordStore::new(config.storage.records_dir()));
    let publisher: Arc<dyn Publisher> = if config.sync.enabled {
        info!("Publishing with git in {:?}", config.sync.repo_dir);
        Arc::new(GitPublisher::new(config.sync.clone()))
    } else {
        Arc::new(NoopPublisher)
    };

    let cancel = CancellationFlag::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    Ok(MirrorRunner::with_cancellation(
        config.clone(),
        documents,
        transport,
        store,
        publisher,
        cancel,
    ))
}

fn log_report(report: &RunReport) {
    for phase in &report.metrics.phases {
        info!(
            phase = %phase.name,
            duration_ms = phase.duration_ms,
            pages = phase.pages,
            records = phase.records,
            failures = phase.failures,
            "Phase finished"
        );
    }
    for namespace in &report.skipped_namespaces {
        warn!(namespace = %namespace, "Namespace was skipped");
    }
    info!(
        indexed = report.indexed,
        index_changed = report.index_changed,
        publish = ?report.publish,
        "Mirror run complete"
    );
}

/// Request cancellation on Ctrl+C or SIGTERM. The run stops between pages.
async fn cancel_on_shutdown_signal(cancel: CancellationFlag) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, stopping after the current page");
    cancel.cancel();
}
