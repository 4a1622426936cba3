//! Per-run record of pages that exhausted their retries.
//!
//! The ledger is ephemeral: it accumulates during a run and is written out
//! once at the end as a replay artifact. It is never read back.

use crate::store::ObjectStore;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Default)]
pub struct ErrorLedger {
    failed_pages: BTreeSet<u64>,
}

#[derive(Debug, Serialize)]
struct FailureReport<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    failed_page_count: usize,
    failed_pages: &'a BTreeSet<u64>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, page: u64) {
        self.failed_pages.insert(page);
    }

    pub fn is_empty(&self) -> bool {
        self.failed_pages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failed_pages.len()
    }

    pub fn pages(&self) -> impl Iterator<Item = u64> + '_ {
        self.failed_pages.iter().copied()
    }

    /// Write the replay artifact. Best-effort: a non-empty ledger is a
    /// warning condition, and failing to persist it must not fail the run.
    pub async fn write_report(&self, store: &Arc<dyn ObjectStore>, key: &str) {
        if self.failed_pages.is_empty() {
            return;
        }

        let report = FailureReport {
            generated_at: chrono::Utc::now(),
            failed_page_count: self.failed_pages.len(),
            failed_pages: &self.failed_pages,
        };

        let bytes = match serde_json::to_vec_pretty(&report) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failure report serialization failed");
                return;
            }
        };

        if let Err(e) = store.put(key, bytes).await {
            warn!(key, error = %e, "Failed to write failure report");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryObjectStore;

    #[tokio::test]
    async fn test_empty_ledger_writes_no_report() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let ledger = ErrorLedger::new();
        ledger.write_report(&store, "reports/failed_pages.json").await;
        // No panic and nothing written
        assert!(store.get("reports/failed_pages.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_report_lists_pages_sorted_and_deduped() {
        let memory = Arc::new(MemoryObjectStore::new());
        let store: Arc<dyn ObjectStore> = Arc::clone(&memory) as Arc<dyn ObjectStore>;

        let mut ledger = ErrorLedger::new();
        ledger.record(17);
        ledger.record(3);
        ledger.record(17);
        assert_eq!(ledger.len(), 2);

        ledger.write_report(&store, "reports/failed_pages.json").await;
        let bytes = store
            .get("reports/failed_pages.json")
            .await
            .unwrap()
            .unwrap();
        let report: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(report["failed_page_count"], 2);
        assert_eq!(report["failed_pages"][0], 3);
        assert_eq!(report["failed_pages"][1], 17);
    }

    #[tokio::test]
    async fn test_report_write_failure_is_swallowed() {
        let memory = Arc::new(MemoryObjectStore::new());
        memory.set_fail_puts(true);
        let store: Arc<dyn ObjectStore> = memory;

        let mut ledger = ErrorLedger::new();
        ledger.record(5);
        ledger.write_report(&store, "reports/failed_pages.json").await;
    }
}
