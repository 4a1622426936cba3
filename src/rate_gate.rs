//! Combined admission control: a concurrency ceiling plus a global minimum
//! spacing between request starts.
//!
//! The remote enforces both limits independently, so satisfying only one
//! still produces sustained 429s. The pacing timestamp is shared by every
//! in-flight task and is only ever read-and-updated inside the mutex, which
//! serializes request starts by construction.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

pub struct RateGate {
    permits: Arc<Semaphore>,
    last_start: Mutex<Option<Instant>>,
    min_spacing: Duration,
}

impl RateGate {
    pub fn new(concurrency: usize, min_spacing: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            last_start: Mutex::new(None),
            min_spacing,
        }
    }

    /// Wait for a concurrency slot. The slot is held for the caller's whole
    /// unit of work (including retries) and released when the permit drops.
    pub async fn acquire(&self) -> RatePermit {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .expect("rate gate semaphore closed");
        RatePermit { _permit: permit }
    }

    /// Wait until at least `min_spacing` has elapsed since the last admitted
    /// request start, then claim the current instant as the new start.
    ///
    /// The lock is held across the sleep: the next caller cannot read the
    /// timestamp until this start has been stamped, so starts are strictly
    /// serialized. Pacing is a timestamp, not a slot - nothing is released.
    pub async fn pace(&self) {
        let mut last = self.last_start.lock().await;
        if let Some(prev) = *last {
            let next_allowed = prev + self.min_spacing;
            let now = Instant::now();
            if next_allowed > now {
                tokio::time::sleep(next_allowed - now).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }
}

/// RAII admission slot; dropping it frees the concurrency slot.
pub struct RatePermit {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let gate = RateGate::new(2, Duration::ZERO);
        let a = gate.acquire().await;
        let _b = gate.acquire().await;
        assert_eq!(gate.available_slots(), 0);
        drop(a);
        assert_eq!(gate.available_slots(), 1);
    }

    #[tokio::test]
    async fn test_concurrency_ceiling_blocks() {
        let gate = Arc::new(RateGate::new(1, Duration::ZERO));
        let held = gate.acquire().await;

        let gate2 = Arc::clone(&gate);
        let waiter = tokio::spawn(async move {
            let _p = gate2.acquire().await;
        });

        // Third task cannot get a slot while the first is held
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_spreads_request_starts() {
        let gate = Arc::new(RateGate::new(4, Duration::from_millis(500)));

        let t0 = Instant::now();
        gate.pace().await; // first start is immediate
        gate.pace().await;
        gate.pace().await;
        assert!(t0.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pacing_wait_after_gap() {
        let gate = RateGate::new(4, Duration::from_millis(100));
        gate.pace().await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let before = Instant::now();
        gate.pace().await;
        assert!(before.elapsed() < Duration::from_millis(10));
    }
}
