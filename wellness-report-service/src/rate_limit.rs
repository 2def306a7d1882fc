//! Fixed-window admission control for mutating client operations.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Above this many live windows, a check call also reclaims stale entries.
const CLEANUP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub retry_after: Option<Duration>,
}

struct WindowState {
    started: Instant,
    count: u32,
}

/// Per `(identity, action)` fixed window: up to `max_requests` within
/// `window`, then rejections carrying the time until the window resets.
pub struct RateLimiter {
    windows: DashMap<String, WindowState>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_requests,
        }
    }

    pub fn check(&self, identity: &str, action: &str) -> RateDecision {
        self.check_at(identity, action, Instant::now())
    }

    fn check_at(&self, identity: &str, action: &str, now: Instant) -> RateDecision {
        if self.windows.len() > CLEANUP_THRESHOLD {
            self.reclaim(now);
        }

        let key = format!("{identity}:{action}");
        let mut entry = self.windows.entry(key).or_insert_with(|| WindowState {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed > self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            let elapsed = now.saturating_duration_since(entry.started);
            return RateDecision {
                allowed: false,
                remaining: 0,
                retry_after: Some(self.window.saturating_sub(elapsed)),
            };
        }

        entry.count += 1;
        RateDecision {
            allowed: true,
            remaining: self.max_requests - entry.count,
            retry_after: None,
        }
    }

    fn reclaim(&self, now: Instant) {
        self.windows
            .retain(|_, state| now.saturating_duration_since(state.started) <= self.window * 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);
        let now = Instant::now();

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check_at("1.2.3.4", "answer", now);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let decision = limiter.check_at("1.2.3.4", "answer", now);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.retry_after.unwrap() > Duration::ZERO);
    }

    #[test]
    fn window_reset_allows_again() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        let now = Instant::now();

        assert!(limiter.check_at("1.2.3.4", "answer", now).allowed);
        assert!(!limiter.check_at("1.2.3.4", "answer", now).allowed);

        let later = now + Duration::from_secs(61);
        assert!(limiter.check_at("1.2.3.4", "answer", later).allowed);
    }

    #[test]
    fn identities_and_actions_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        let now = Instant::now();

        assert!(limiter.check_at("1.2.3.4", "answer", now).allowed);
        assert!(limiter.check_at("1.2.3.4", "session_start", now).allowed);
        assert!(limiter.check_at("5.6.7.8", "answer", now).allowed);
        assert!(!limiter.check_at("1.2.3.4", "answer", now).allowed);
    }

    #[test]
    fn retry_after_shrinks_as_window_ages() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        let now = Instant::now();

        limiter.check_at("1.2.3.4", "answer", now);
        let early = limiter
            .check_at("1.2.3.4", "answer", now + Duration::from_secs(10))
            .retry_after
            .unwrap();
        let late = limiter
            .check_at("1.2.3.4", "answer", now + Duration::from_secs(50))
            .retry_after
            .unwrap();
        assert!(late < early);
    }
}
