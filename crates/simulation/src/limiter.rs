//! Sliding-window rate limiter for decision calls.
//!
//! External decision sources typically sit behind a metered API; the runner
//! awaits this limiter before every call. It is injected as an explicit
//! dependency of the runner, shared by all of a run's traders.

use std::collections::VecDeque;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, sleep};

/// Asynchronous sliding-window rate limiter.
///
/// Allows at most `max_requests` acquisitions per `window`; excess callers
/// sleep until the oldest acquisition falls out of the window.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter. `max_requests == 0` disables limiting entirely.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a request can be made without exceeding the limit.
    pub async fn acquire(&self) {
        if self.max_requests == 0 {
            return;
        }

        loop {
            let wait = {
                let mut timestamps = self.timestamps.lock().await;
                let now = Instant::now();

                while timestamps
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.window)
                {
                    timestamps.pop_front();
                }

                if timestamps.len() < self.max_requests {
                    timestamps.push_back(now);
                    return;
                }

                match timestamps.front() {
                    Some(oldest) => self.window - now.duration_since(*oldest),
                    None => continue,
                }
            };

            sleep(wait).await;
        }
    }
}
