//! Sliding-window rate limiting for auth-sensitive endpoints.
//!
//! Keeps an in-memory history of admitted request timestamps per client
//! address. Single-process only: state resets on restart and is not shared
//! across instances.

use dashmap::DashMap;
use falcon_core::RateLimitSettings;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Per-identifier sliding-window admission control.
///
/// Each identifier owns an ordered history of admitted timestamps. A request
/// is rejected when the history already holds `max_requests` entries and the
/// oldest of them is still inside the window; otherwise the oldest entry is
/// dropped once the history is at capacity and the request is admitted.
///
/// The map gives per-identifier mutual exclusion, so concurrent requests
/// from one address serialize on that address's history.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    history: DashMap<IpAddr, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    /// Create a limiter admitting `max_requests` per `window` per identifier
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            history: DashMap::new(),
            max_requests,
            window,
        }
    }

    /// Create a limiter from configuration settings
    pub fn from_settings(settings: RateLimitSettings) -> Self {
        Self::new(
            settings.max_requests,
            Duration::from_secs(settings.window_seconds),
        )
    }

    /// Admit or reject a request from the given identifier
    pub fn admit(&self, identifier: IpAddr) -> bool {
        let now = Instant::now();
        let mut entry = self.history.entry(identifier).or_default();

        if entry.len() >= self.max_requests {
            if let Some(oldest) = entry.front() {
                if now.duration_since(*oldest) < self.window {
                    return false;
                }
            }
            entry.pop_front();
        }

        entry.push_back(now);
        true
    }

    /// Drop identifiers whose entire history has aged out of the window.
    ///
    /// Bounds memory for long-running processes; call periodically.
    pub fn evict_stale(&self) {
        let now = Instant::now();
        self.history.retain(|_, timestamps| {
            timestamps
                .back()
                .is_some_and(|newest| now.duration_since(*newest) < self.window)
        });
    }

    /// Number of identifiers currently tracked
    pub fn tracked_identifiers(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last_octet: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(203, 0, 113, last_octet))
    }

    #[test]
    fn test_burst_within_limit_admitted() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert!(limiter.admit(ip(1)));
        }
    }

    #[test]
    fn test_request_over_limit_rejected() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert!(limiter.admit(ip(1)));
        }
        assert!(!limiter.admit(ip(1)));
    }

    #[test]
    fn test_identifiers_are_independent() {
        let limiter = SlidingWindowLimiter::new(3, Duration::from_secs(60));

        for _ in 0..3 {
            assert!(limiter.admit(ip(1)));
        }
        assert!(!limiter.admit(ip(1)));
        assert!(limiter.admit(ip(2)));
    }

    #[test]
    fn test_admitted_after_window_elapses() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_millis(50));

        assert!(limiter.admit(ip(1)));
        assert!(limiter.admit(ip(1)));
        assert!(!limiter.admit(ip(1)));

        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.admit(ip(1)));
    }

    #[test]
    fn test_evict_stale_drops_idle_identifiers() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_millis(20));

        limiter.admit(ip(1));
        limiter.admit(ip(2));
        assert_eq!(limiter.tracked_identifiers(), 2);

        std::thread::sleep(Duration::from_millis(30));
        limiter.evict_stale();
        assert_eq!(limiter.tracked_identifiers(), 0);
    }

    #[test]
    fn test_from_settings() {
        let limiter = SlidingWindowLimiter::from_settings(RateLimitSettings {
            max_requests: 3,
            window_seconds: 60,
        });

        for _ in 0..3 {
            assert!(limiter.admit(ip(9)));
        }
        assert!(!limiter.admit(ip(9)));
    }
}
