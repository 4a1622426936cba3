//! One-page HTTP fetch with response classification and bounded retry.
//!
//! All failure modes resolve to a `PageFetch` with an outcome tag: nothing
//! transport-level escapes this module, so the driver never has to catch
//! network faults.

use crate::backoff::ExponentialBackoff;
use crate::config::IngestConfig;
use crate::rate_gate::RateGate;
use crate::record::Record;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Terminal result of fetching one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Success,
    Failed,
}

#[derive(Debug)]
pub struct PageFetch {
    pub page: u64,
    pub records: Vec<Record>,
    pub outcome: PageOutcome,
}

/// Errors from a single fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Rate limited (HTTP 429)")]
    RateLimited,

    #[error("Server error (HTTP {0})")]
    ServerError(u16),

    #[error("Request timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unreadable response body: {0}")]
    Body(String),

    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
}

impl FetchError {
    /// Transient faults are retried with backoff; anything else is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::RateLimited
            | FetchError::ServerError(_)
            | FetchError::Timeout
            | FetchError::Network(_) => true,
            // The source API truncates bodies under heavy throttling, so an
            // unreadable 200 body is treated as transient too.
            FetchError::Body(_) => true,
            FetchError::UnexpectedStatus(_) => false,
        }
    }
}

pub struct PageClient {
    client: reqwest::Client,
    gate: Arc<RateGate>,
    backoff: ExponentialBackoff,
    endpoint: String,
    page_size: u32,
    max_attempts: u32,
}

impl PageClient {
    pub fn new(config: &IngestConfig, gate: Arc<RateGate>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("foodfacts-ingest/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            gate,
            backoff: ExponentialBackoff::new(
                config.backoff_base.as_millis() as u64,
                config.backoff_cap.as_millis() as u64,
            ),
            endpoint: config.endpoint.clone(),
            page_size: config.page_size,
            max_attempts: config.max_attempts.max(1),
        })
    }

    /// Fetch one page, retrying transient faults up to the attempt cap.
    ///
    /// The admission slot is held across the whole retry loop and every
    /// attempt start is paced, so retries also respect the remote's limits.
    pub async fn fetch(&self, page: u64) -> PageFetch {
        let _permit = self.gate.acquire().await;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = self.backoff.delay(attempt - 1);
                debug!(page, attempt, delay_ms = delay.as_millis() as u64, "Backing off before retry");
                tokio::time::sleep(delay).await;
            }
            self.gate.pace().await;

            match self.fetch_once(page).await {
                Ok(records) => {
                    debug!(page, records = records.len(), "Page fetched");
                    return PageFetch {
                        page,
                        records,
                        outcome: PageOutcome::Success,
                    };
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        page,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Transient fetch failure"
                    );
                }
                Err(e) => {
                    warn!(page, error = %e, "Terminal fetch failure, not retrying");
                    return PageFetch {
                        page,
                        records: Vec::new(),
                        outcome: PageOutcome::Failed,
                    };
                }
            }
        }

        error!(page, attempts = self.max_attempts, "Page failed after exhausting retries");
        PageFetch {
            page,
            records: Vec::new(),
            outcome: PageOutcome::Failed,
        }
    }

    async fn fetch_once(&self, page: u64) -> Result<Vec<Record>, FetchError> {
        let url = format!(
            "{}?page={}&page_size={}",
            self.endpoint, page, self.page_size
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status().as_u16();
        match status {
            200 => {
                let body: serde_json::Value = response.json().await.map_err(|e| {
                    if e.is_timeout() {
                        FetchError::Timeout
                    } else {
                        FetchError::Body(e.to_string())
                    }
                })?;
                Ok(Record::from_page_body(&body))
            }
            429 => Err(FetchError::RateLimited),
            500..=599 => Err(FetchError::ServerError(status)),
            other => Err(FetchError::UnexpectedStatus(other)),
        }
    }
}

fn classify_transport(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(error.to_string())
    }
}
