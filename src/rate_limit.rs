//! Fixed-interval gate for rate-limited provider calls
//!
//! Third-party quotas are respected by enforcing a minimum delay between any
//! two calls through the gate, replacing the ad-hoc sleeps the pipeline would
//! otherwise scatter across call sites. The gate runs on the tokio clock, so
//! tests can pause time instead of waiting.

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, sleep_until};

#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateGate {
    /// Create a gate enforcing `min_interval` between consecutive calls
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Wait until a request slot is available and claim it.
    ///
    /// Holding the lock across the sleep serializes callers, which is the
    /// point: concurrent workers share one request-rate ceiling.
    pub async fn acquire(&self) {
        let mut next = self.next_slot.lock().await;
        let now = Instant::now();
        if *next > now {
            sleep_until(*next).await;
        }
        *next = Instant::now() + self.min_interval;
    }
}
