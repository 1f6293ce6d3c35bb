//! Per-connector request throttling.
//!
//! Grants are spaced at least `1 / requests_per_second` apart. Waiters queue
//! on a FIFO-fair async mutex, so grants happen in arrival order. The rate
//! can be changed while the limiter is in use (e.g. after authentication
//! unlocks a higher quota); the next grant honours it without forgetting
//! when the previous one happened.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use bioconnect_common::{BioconnectError, Result};

#[derive(Debug)]
pub struct RateLimiter {
    /// `f64` bits, so the rate can change through `&self`.
    requests_per_second: AtomicU64,
    last_grant: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// A non-positive, non-finite or vanishingly small rate is accepted
    /// here and rejected by the first [`acquire`](Self::acquire).
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            requests_per_second: AtomicU64::new(requests_per_second.to_bits()),
            last_grant: Mutex::new(None),
        }
    }

    pub fn requests_per_second(&self) -> f64 {
        f64::from_bits(self.requests_per_second.load(Ordering::Acquire))
    }

    pub fn set_requests_per_second(&self, requests_per_second: f64) {
        debug!(requests_per_second, "Rate limit updated");
        self.requests_per_second
            .store(requests_per_second.to_bits(), Ordering::Release);
    }

    pub fn min_interval(&self) -> Result<Duration> {
        let rps = self.requests_per_second();
        if !rps.is_finite() || rps <= 0.0 {
            return Err(BioconnectError::RateLimitMisconfiguration(rps));
        }
        Duration::try_from_secs_f64(1.0 / rps)
            .map_err(|_| BioconnectError::RateLimitMisconfiguration(rps))
    }

    /// Wait for permission to send one request.
    ///
    /// Dropping the returned future releases the queue position; a cancelled
    /// wait does not count as a grant.
    pub async fn acquire(&self) -> Result<()> {
        let mut last = self.last_grant.lock().await;
        let interval = self.min_interval()?;

        if let Some(prev) = *last {
            let rps = self.requests_per_second();
            let ready_at = prev
                .checked_add(interval)
                .ok_or(BioconnectError::RateLimitMisconfiguration(rps))?;
            if ready_at > Instant::now() {
                debug!(wait_ms = (ready_at - Instant::now()).as_millis() as u64, "Rate limited, waiting");
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
        Ok(())
    }
}
