use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Paces callers to a steady rate, one token at a time.
///
/// Each acquisition reserves the slot one interval after the previous
/// reservation (never earlier than now), so idle time does not build up a
/// burst.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    pub fn per_second(rate: u32) -> Self {
        Self::with_interval(Duration::from_secs(1) / rate.max(1))
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next token. Returns `false` if cancelled first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> bool {
        let slot = {
            let mut next = self.next_slot.lock();
            let slot = (*next).max(Instant::now());
            *next = slot + self.interval;
            slot
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = sleep_until(slot) => true,
        }
    }
}
