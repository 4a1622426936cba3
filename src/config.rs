// Global configuration defaults - single source of truth

use std::time::Duration;

pub struct Defaults;

impl Defaults {
    // Remote endpoint
    pub const ENDPOINT: &'static str = "https://world.openfoodfacts.org/api/v2/search";
    pub const TOTAL_PAGES: u64 = 1000;
    pub const PAGE_SIZE: u32 = 100;

    // Admission control
    pub const CONCURRENCY: usize = 10;
    pub const MIN_SPACING_MS: u64 = 500;

    // Retry/backoff
    pub const MAX_ATTEMPTS: u32 = 8;
    pub const BACKOFF_BASE_MS: u64 = 5_000;
    pub const BACKOFF_CAP_MS: u64 = 640_000;
    pub const REQUEST_TIMEOUT_SECS: u64 = 180;

    // Batching
    pub const MAX_ROWS_PER_BATCH: usize = 10_000;
    pub const BATCH_PREFIX: &'static str = "bronze/";

    // Durable keys
    pub const CHECKPOINT_KEY: &'static str = "checkpoint/checkpoint.json";
    pub const REPORT_KEY: &'static str = "reports/failed_pages.json";
}

/// Runtime parameters for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub endpoint: String,
    pub total_pages: u64,
    pub page_size: u32,
    pub concurrency: usize,
    pub min_spacing: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub request_timeout: Duration,
    pub max_rows_per_batch: usize,
    pub batch_prefix: String,
    pub checkpoint_key: String,
    pub report_key: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            endpoint: Defaults::ENDPOINT.to_string(),
            total_pages: Defaults::TOTAL_PAGES,
            page_size: Defaults::PAGE_SIZE,
            concurrency: Defaults::CONCURRENCY,
            min_spacing: Duration::from_millis(Defaults::MIN_SPACING_MS),
            max_attempts: Defaults::MAX_ATTEMPTS,
            backoff_base: Duration::from_millis(Defaults::BACKOFF_BASE_MS),
            backoff_cap: Duration::from_millis(Defaults::BACKOFF_CAP_MS),
            request_timeout: Duration::from_secs(Defaults::REQUEST_TIMEOUT_SECS),
            max_rows_per_batch: Defaults::MAX_ROWS_PER_BATCH,
            batch_prefix: Defaults::BATCH_PREFIX.to_string(),
            checkpoint_key: Defaults::CHECKPOINT_KEY.to_string(),
            report_key: Defaults::REPORT_KEY.to_string(),
        }
    }
}
