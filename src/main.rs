use foodfacts_ingest::cli::{Cli, Commands};
use foodfacts_ingest::{
    CheckpointStore, FsObjectStore, IngestConfig, IngestError, Ingestor, ObjectStore, PageClient,
    RateGate,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MainError {
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Storage error: {0}")]
    Store(#[from] foodfacts_ingest::StoreError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Wire concrete components together via constructor injection.
fn build_ingestor(
    config: IngestConfig,
    data_dir: &str,
    shutdown: tokio::sync::watch::Receiver<bool>,
) -> Result<Ingestor, MainError> {
    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(data_dir)?);
    let gate = Arc::new(RateGate::new(config.concurrency, config.min_spacing));
    let client = Arc::new(PageClient::new(&config, gate).map_err(IngestError::Client)?);

    Ok(Ingestor::new(config, client, store, shutdown))
}

async fn run_ingest_command(
    config: IngestConfig,
    data_dir: String,
) -> Result<(), MainError> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl+C, finishing the current wave before stopping...");
            let _ = shutdown_tx.send(true);
        }
    });

    let ingestor = build_ingestor(config, &data_dir, shutdown_rx)?;
    let report = ingestor.run().await?;

    println!(
        "Ingested {} records across {} pages into {} batch(es) in {}s",
        report.records_ingested,
        report.pages_attempted,
        report.batches_committed,
        report.duration_secs
    );
    if !report.failed_pages.is_empty() {
        // Warning, not a failure exit: the report artifact lists the pages
        println!(
            "Warning: {} page(s) failed terminally: {:?}",
            report.failed_pages.len(),
            report.failed_pages
        );
    }
    if report.interrupted {
        println!("Run was interrupted; re-run to resume from the checkpoint");
    }

    Ok(())
}

async fn run_status_command(data_dir: String) -> Result<(), MainError> {
    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(&data_dir)?);
    let checkpoint = CheckpointStore::new(store, foodfacts_ingest::Defaults::CHECKPOINT_KEY);

    match checkpoint.load().await {
        Some(page) => println!("Last completed page: {} (next run resumes at {})", page, page + 1),
        None => println!("No checkpoint stored; next run starts at page 1"),
    }
    Ok(())
}

async fn run_reset_command(data_dir: String) -> Result<(), MainError> {
    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(&data_dir)?);
    let checkpoint = CheckpointStore::new(store, foodfacts_ingest::Defaults::CHECKPOINT_KEY);
    checkpoint.reset().await?;
    println!("Checkpoint cleared; next run starts at page 1");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), MainError> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Ingest {
            endpoint,
            data_dir,
            total_pages,
            page_size,
            concurrency,
            min_spacing_ms,
            max_attempts,
            timeout,
            batch_rows,
        } => {
            foodfacts_ingest::logging::init_logging_in_data_dir(&data_dir)
                .map_err(|e| MainError::Logging(e.to_string()))?;

            let config = IngestConfig {
                endpoint,
                total_pages,
                page_size,
                concurrency,
                min_spacing: Duration::from_millis(min_spacing_ms),
                max_attempts,
                request_timeout: Duration::from_secs(timeout),
                max_rows_per_batch: batch_rows,
                ..IngestConfig::default()
            };

            run_ingest_command(config, data_dir).await?;
        }

        Commands::Status { data_dir } => {
            run_status_command(data_dir).await?;
        }

        Commands::ResetCheckpoint { data_dir } => {
            run_reset_command(data_dir).await?;
        }
    }

    Ok(())
}
