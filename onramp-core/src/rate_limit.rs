//! Sliding-window request limiter keyed by caller identity.
//!
//! Every accepted request is logged with its timestamp; a caller is allowed
//! while fewer than `max_requests` timestamps fall inside the trailing
//! window. Keys are sharded in a `DashMap`, so callers never contend on a
//! global lock.

use crate::config::RateLimitConfig;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Outcome of [`SlidingWindowLimiter::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    /// How long until the oldest logged request leaves the window.
    pub retry_after: Duration,
}

pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    logs: DashMap<String, VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window,
            logs: DashMap::new(),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request for `key` if it is within the limit.
    pub fn try_acquire(&self, key: &str) -> RateDecision {
        self.try_acquire_at(key, Instant::now())
    }

    fn try_acquire_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut entry = self.logs.entry(key.to_owned()).or_default();
        evict_expired(&mut entry, now, self.window);

        let count = u32::try_from(entry.len()).unwrap_or(u32::MAX);
        if count < self.max_requests {
            entry.push_back(now);
            RateDecision {
                allowed: true,
                remaining: self.max_requests - count - 1,
                retry_after: Duration::ZERO,
            }
        } else {
            let retry_after = entry
                .front()
                .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
                .unwrap_or(self.window);
            RateDecision {
                allowed: false,
                remaining: 0,
                retry_after,
            }
        }
    }

    /// Drop callers whose whole log has left the window.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.logs.retain(|_, log| {
            evict_expired(log, now, self.window);
            !log.is_empty()
        });
    }

    /// Number of callers currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.logs.len()
    }
}

fn evict_expired(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = log.front() {
        if now.saturating_duration_since(*front) >= window {
            log.pop_front();
        } else {
            break;
        }
    }
}
