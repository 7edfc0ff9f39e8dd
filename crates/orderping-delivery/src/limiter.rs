// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rolling claim limiter.
//!
//! Caps queue claims per wall-clock second to stay under the upstream abuse
//! thresholds. Sliding window over claim timestamps rather than a fixed
//! tick, so a burst at the end of one second cannot combine with a burst at
//! the start of the next.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding one-second window limiter.
pub struct ClaimLimiter {
    capacity: u32,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl ClaimLimiter {
    pub fn new(per_second: u32) -> Self {
        Self {
            capacity: per_second,
            window: Duration::from_secs(1),
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a claim slot is available, then take it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let now = Instant::now();
                let mut stamps = self.timestamps.lock().await;
                while let Some(front) = stamps.front()
                    && now.duration_since(*front) >= self.window
                {
                    stamps.pop_front();
                }
                if (stamps.len() as u32) < self.capacity {
                    stamps.push_back(now);
                    return;
                }
                // Full: sleep until the oldest stamp leaves the window.
                match stamps.front() {
                    Some(front) => self.window.saturating_sub(now.duration_since(*front)),
                    None => Duration::from_millis(1),
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}
