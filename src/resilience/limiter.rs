//! Sliding-window rate limiter

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Rate limiter over a sliding time window
///
/// `acquire` admits at most `max_requests` calls inside any rolling `window`.
/// Excess callers are suspended until the oldest recorded call leaves the
/// window; calls are delayed, never rejected or dropped.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per `window`
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a call may proceed, then record it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut stamps = self.timestamps.lock().await;
                let now = Instant::now();

                while let Some(&front) = stamps.front() {
                    if now.duration_since(front) >= self.window {
                        stamps.pop_front();
                    } else {
                        break;
                    }
                }

                if stamps.len() < self.max_requests {
                    stamps.push_back(now);
                    return;
                }

                // Sleep until the oldest timestamp exits the window, then
                // re-check: another waiter may have taken the freed slot.
                self.window - now.duration_since(*stamps.front().expect("non-empty"))
            };

            tokio::time::sleep(wait).await;
        }
    }

    /// Calls currently recorded inside the window
    pub async fn in_flight(&self) -> usize {
        let mut stamps = self.timestamps.lock().await;
        let now = Instant::now();
        while let Some(&front) = stamps.front() {
            if now.duration_since(front) >= self.window {
                stamps.pop_front();
            } else {
                break;
            }
        }
        stamps.len()
    }
}
