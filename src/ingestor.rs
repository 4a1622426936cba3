//! Wave-scheduled ingestion driver.
//!
//! Pages are dispatched in waves of the concurrency limit and awaited at a
//! full barrier before the checkpoint advances, so a crash can only ever
//! force a re-fetch of the current wave. The design deliberately does not
//! pipeline across waves: bounded memory and a trivially correct checkpoint
//! matter more here than the extra overlap.

use crate::batch::BatchSink;
use crate::checkpoint::CheckpointStore;
use crate::client::{PageClient, PageOutcome};
use crate::config::IngestConfig;
use crate::ledger::ErrorLedger;
use crate::store::ObjectStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP client construction failed: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Store(#[from] crate::store::StoreError),
}

/// End-of-run summary.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub start_page: u64,
    pub pages_attempted: u64,
    pub records_ingested: u64,
    pub batches_committed: u64,
    pub failed_pages: Vec<u64>,
    pub duration_secs: u64,
    pub interrupted: bool,
}

pub struct Ingestor {
    config: IngestConfig,
    client: Arc<PageClient>,
    store: Arc<dyn ObjectStore>,
    shutdown: watch::Receiver<bool>,
}

impl Ingestor {
    /// Wire the driver from injected collaborators; no ambient singletons.
    pub fn new(
        config: IngestConfig,
        client: Arc<PageClient>,
        store: Arc<dyn ObjectStore>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            client,
            store,
            shutdown,
        }
    }

    /// Run one ingestion pass: resume from the checkpoint, dispatch waves,
    /// flush the tail batch, and persist the failure report.
    ///
    /// A page's terminal failure never aborts its wave and a wave never
    /// aborts the run; only driver-fatal conditions surface as `Err`.
    pub async fn run(self) -> Result<IngestReport, IngestError> {
        let start = Instant::now();
        let checkpoint = CheckpointStore::new(Arc::clone(&self.store), &self.config.checkpoint_key);
        let mut sink = BatchSink::new(
            Arc::clone(&self.store),
            &self.config.batch_prefix,
            self.config.max_rows_per_batch,
        );
        let mut ledger = ErrorLedger::new();

        // Resume after the highest fully resolved page; never reprocess it.
        let start_page = match checkpoint.load().await {
            Some(last) => last + 1,
            None => 1,
        };
        let total_pages = self.config.total_pages;
        let wave_size = self.config.concurrency.max(1) as u64;

        if start_page > total_pages {
            info!(start_page, total_pages, "Checkpoint already covers the full page range");
        } else {
            info!(start_page, total_pages, wave_size, "Starting ingestion run");
        }

        let mut pages_attempted = 0u64;
        let mut records_ingested = 0u64;
        let mut interrupted = false;

        let mut page = start_page;
        while page <= total_pages {
            if *self.shutdown.borrow() {
                warn!(next_page = page, "Shutdown requested, not dispatching further waves");
                interrupted = true;
                break;
            }

            let wave_end = (page + wave_size - 1).min(total_pages);
            let mut tasks: JoinSet<_> = JoinSet::new();
            for p in page..=wave_end {
                let client = Arc::clone(&self.client);
                tasks.spawn(async move { client.fetch(p).await });
            }

            // Wave barrier: every task resolves (success or terminal
            // failure) before the batch rolls over or the checkpoint moves.
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(fetch) => match fetch.outcome {
                        PageOutcome::Success => {
                            records_ingested += fetch.records.len() as u64;
                            sink.append(&fetch.records);
                        }
                        PageOutcome::Failed => {
                            ledger.record(fetch.page);
                        }
                    },
                    Err(e) => {
                        error!(error = %e, "Fetch task join error");
                    }
                }
            }
            pages_attempted += wave_end - page + 1;

            sink.rollover_if_needed().await;
            checkpoint.save(wave_end).await;
            info!(
                through_page = wave_end,
                records_ingested,
                batches_committed = sink.batches_committed(),
                "Wave complete"
            );

            page = wave_end + 1;
        }

        sink.flush().await;
        ledger
            .write_report(&self.store, &self.config.report_key)
            .await;

        if !ledger.is_empty() {
            warn!(
                failed_pages = ledger.len(),
                report_key = %self.config.report_key,
                "Run finished with terminally failed pages"
            );
        }

        Ok(IngestReport {
            start_page,
            pages_attempted,
            records_ingested,
            batches_committed: sink.batches_committed(),
            failed_pages: ledger.pages().collect(),
            duration_secs: start.elapsed().as_secs(),
            interrupted,
        })
    }
}
