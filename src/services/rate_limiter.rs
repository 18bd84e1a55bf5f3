//! Per-owner send rate limiter.
//!
//! Caps how many send requests one owner may make inside a sliding window.
//! State is in-memory, resets on restart, and is owned by whoever builds the
//! limiter; share it via `Arc<SendRateLimiter>`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

/// Limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

pub struct SendRateLimiter {
    requests: Mutex<HashMap<Uuid, Vec<Instant>>>,
    config: RateLimitConfig,
}

impl SendRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Returns `true` and records the request if `owner_id` is under the limit.
    pub fn check_and_record(&self, owner_id: Uuid) -> bool {
        self.check_and_record_at(owner_id, Instant::now())
    }

    fn check_and_record_at(&self, owner_id: Uuid, now: Instant) -> bool {
        let mut requests = self.requests.lock();
        let window = self.config.window;

        let entry = requests.entry(owner_id).or_default();
        entry.retain(|t| now.saturating_duration_since(*t) < window);

        if entry.len() >= self.config.max_requests {
            return false;
        }
        entry.push(now);
        true
    }

    /// Drop owners with no requests left in the window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let window = self.config.window;
        self.requests.lock().retain(|_, entries| {
            entries.retain(|t| now.saturating_duration_since(*t) < window);
            !entries.is_empty()
        });
    }

    pub fn tracked_owners(&self) -> usize {
        self.requests.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: usize, secs: u64) -> SendRateLimiter {
        SendRateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(secs),
        })
    }

    #[test]
    fn allows_within_limit_then_blocks() {
        let l = limiter(2, 60);
        let owner = Uuid::new_v4();
        assert!(l.check_and_record(owner));
        assert!(l.check_and_record(owner));
        assert!(!l.check_and_record(owner));
    }

    #[test]
    fn owners_are_independent() {
        let l = limiter(1, 60);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(l.check_and_record(a));
        assert!(!l.check_and_record(a));
        assert!(l.check_and_record(b));
    }

    #[test]
    fn window_slides() {
        let l = limiter(1, 10);
        let owner = Uuid::new_v4();
        let start = Instant::now();
        assert!(l.check_and_record_at(owner, start));
        assert!(!l.check_and_record_at(owner, start + Duration::from_secs(5)));
        assert!(l.check_and_record_at(owner, start + Duration::from_secs(11)));
    }

    #[test]
    fn cleanup_drops_expired_owners() {
        let l = limiter(5, 0);
        l.check_and_record(Uuid::new_v4());
        l.cleanup();
        assert_eq!(l.tracked_owners(), 0);
    }
}
