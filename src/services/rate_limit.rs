// SPDX-License-Identifier: MIT

//! Sliding-window rate limiter for outbound vendor API calls.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Default budget: 60 calls per 60 seconds.
pub const DEFAULT_CALLS: usize = 60;
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Bounds outbound call rate to `calls` per sliding `period`.
///
/// `acquire` suspends the caller until capacity is available; calls are
/// never dropped, and the wait is bounded by the window length. Single-owner
/// state: the client owning this limiter is serialized by the coordinator's
/// single-flight lock.
pub struct RateLimiter {
    calls: usize,
    period: Duration,
    stamps: VecDeque<Instant>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CALLS, DEFAULT_PERIOD)
    }
}

impl RateLimiter {
    pub fn new(calls: usize, period: Duration) -> Self {
        Self {
            calls,
            period,
            stamps: VecDeque::with_capacity(calls),
        }
    }

    /// Wait until a call may proceed, then record it.
    pub async fn acquire(&mut self) {
        let now = Instant::now();
        while let Some(&oldest) = self.stamps.front() {
            if now.duration_since(oldest) >= self.period {
                self.stamps.pop_front();
            } else {
                break;
            }
        }

        if self.stamps.len() >= self.calls {
            // Window full: the oldest entry ages out first.
            let wake_at = *self.stamps.front().unwrap_or(&now) + self.period;
            tracing::debug!(
                wait_secs = (wake_at - now).as_secs_f64(),
                "Rate limit reached, waiting"
            );
            tokio::time::sleep_until(wake_at).await;
            self.stamps.pop_front();
        }

        self.stamps.push_back(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_admits_within_budget_immediately() {
        let mut limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_excess_call_delayed_until_window_frees() {
        let mut limiter = RateLimiter::new(60, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..60 {
            limiter.acquire().await;
        }
        // 61st call must wait until the first stamp ages out, never drop.
        limiter.acquire().await;
        assert!(Instant::now() - start >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_aged_out_entries_are_pruned() {
        let mut limiter = RateLimiter::new(2, Duration::from_secs(60));
        limiter.acquire().await;
        limiter.acquire().await;

        tokio::time::advance(Duration::from_secs(61)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(Instant::now(), start);
    }
}
