//! Per-source-address attempt limiter for the admin login path.
//!
//! Fixed window: the first counted attempt opens a 15-minute window and at
//! most 5 attempts are counted inside it. State is process-local and
//! best-effort; a restart clears it and separate processes do not share it.
//!
//! `check_and_increment` reserves an attempt slot under the map's shard
//! lock, so concurrent failures from one address can never both observe
//! the same count.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

/// Attempts allowed per window.
pub const MAX_ATTEMPTS: u32 = 5;

/// Window length: 15 minutes.
pub const WINDOW: Duration = Duration::from_secs(15 * 60);

/// Cleanup sweep interval.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed(Reservation),
    Blocked { retry_after: Duration },
}

/// An attempt slot counted in one window. Only that window can give it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    reset_at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct AttemptWindow {
    count: u32,
    reset_at: Instant,
}

/// In-memory attempt counter keyed by source address.
#[derive(Debug)]
pub struct LoginRateLimiter {
    max_attempts: u32,
    window: Duration,
    attempts: DashMap<String, AttemptWindow>,
}

impl LoginRateLimiter {
    /// Limiter with the default ceiling (5) and window (15 minutes).
    pub fn new() -> Self {
        Self::with_limits(MAX_ATTEMPTS, WINDOW)
    }

    pub fn with_limits(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: DashMap::new(),
        }
    }

    /// Atomically check the window for `key` and count one attempt.
    pub fn check_and_increment(&self, key: &str) -> RateLimitDecision {
        self.check_and_increment_at(key, Instant::now())
    }

    pub fn check_and_increment_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut entry = self
            .attempts
            .entry(key.to_string())
            .or_insert(AttemptWindow {
                count: 0,
                reset_at: now + self.window,
            });

        if now >= entry.reset_at {
            *entry = AttemptWindow {
                count: 0,
                reset_at: now + self.window,
            };
        }

        if entry.count >= self.max_attempts {
            let retry_after = entry.reset_at.saturating_duration_since(now);
            debug!(source_addr = key, ?retry_after, "attempt blocked");
            return RateLimitDecision::Blocked { retry_after };
        }

        entry.count += 1;
        RateLimitDecision::Allowed(Reservation {
            reset_at: entry.reset_at,
        })
    }

    /// Give back an attempt reserved by `check_and_increment` that did not
    /// end in a credential failure. No-op once the reserving window is gone.
    pub fn release(&self, key: &str, reservation: Reservation) {
        if let Some(mut entry) = self.attempts.get_mut(key)
            && entry.reset_at == reservation.reset_at
        {
            entry.count = entry.count.saturating_sub(1);
        }
    }

    /// Attempts currently counted for `key` (0 if no live window).
    pub fn attempts(&self, key: &str) -> u32 {
        self.attempts_at(key, Instant::now())
    }

    pub fn attempts_at(&self, key: &str, now: Instant) -> u32 {
        self.attempts
            .get(key)
            .filter(|w| now < w.reset_at)
            .map(|w| w.count)
            .unwrap_or(0)
    }

    /// Evict windows that have elapsed.
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    pub fn cleanup_at(&self, now: Instant) {
        self.attempts.retain(|_, w| now < w.reset_at);
    }

    /// Spawn a periodic cleanup task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                limiter.cleanup();
            }
        })
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_ceiling_then_blocks() {
        let limiter = LoginRateLimiter::new();
        let now = Instant::now();
        for _ in 0..MAX_ATTEMPTS {
            assert!(matches!(
                limiter.check_and_increment_at("10.0.0.1", now),
                RateLimitDecision::Allowed(_)
            ));
        }
        assert!(matches!(
            limiter.check_and_increment_at("10.0.0.1", now),
            RateLimitDecision::Blocked { retry_after } if retry_after == WINDOW
        ));
        // Other addresses are unaffected.
        assert!(matches!(
            limiter.check_and_increment_at("10.0.0.2", now),
            RateLimitDecision::Allowed(_)
        ));
    }

    #[test]
    fn window_elapse_resets_counter() {
        let limiter = LoginRateLimiter::new();
        let start = Instant::now();
        for _ in 0..MAX_ATTEMPTS {
            limiter.check_and_increment_at("a", start);
        }
        let almost = start + WINDOW - Duration::from_secs(1);
        assert!(matches!(
            limiter.check_and_increment_at("a", almost),
            RateLimitDecision::Blocked { .. }
        ));
        let elapsed = start + WINDOW;
        assert!(matches!(
            limiter.check_and_increment_at("a", elapsed),
            RateLimitDecision::Allowed(_)
        ));
        assert_eq!(limiter.attempts_at("a", elapsed), 1);
    }

    fn reserve(limiter: &LoginRateLimiter, key: &str, now: Instant) -> Reservation {
        match limiter.check_and_increment_at(key, now) {
            RateLimitDecision::Allowed(reservation) => reservation,
            RateLimitDecision::Blocked { .. } => panic!("unexpectedly blocked"),
        }
    }

    #[test]
    fn release_returns_a_slot() {
        let limiter = LoginRateLimiter::new();
        let now = Instant::now();
        let first = reserve(&limiter, "a", now);
        reserve(&limiter, "a", now);
        limiter.release("a", first);
        assert_eq!(limiter.attempts_at("a", now), 1);
        limiter.release("a", first);
        limiter.release("a", first);
        assert_eq!(limiter.attempts_at("a", now), 0);
        limiter.release("unknown", first);
    }

    #[test]
    fn release_from_an_elapsed_window_leaves_the_new_one_alone() {
        let limiter = LoginRateLimiter::new();
        let start = Instant::now();
        let stale = reserve(&limiter, "a", start);

        let next = start + WINDOW;
        reserve(&limiter, "a", next);
        reserve(&limiter, "a", next);
        limiter.release("a", stale);
        assert_eq!(limiter.attempts_at("a", next), 2);
    }

    #[test]
    fn concurrent_attempts_never_exceed_ceiling() {
        let limiter = Arc::new(LoginRateLimiter::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.check_and_increment("shared"))
            })
            .collect();
        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|d| matches!(d, RateLimitDecision::Allowed(_)))
            .count();
        assert_eq!(allowed, MAX_ATTEMPTS as usize);
    }

    #[test]
    fn cleanup_evicts_elapsed_windows() {
        let limiter = LoginRateLimiter::new();
        let now = Instant::now();
        limiter.check_and_increment_at("old", now);
        limiter.check_and_increment_at("fresh", now + WINDOW);
        limiter.cleanup_at(now + WINDOW);
        assert_eq!(limiter.attempts_at("old", now), 0);
        assert_eq!(limiter.attempts_at("fresh", now + WINDOW), 1);
    }

    #[tokio::test]
    async fn spawn_cleanup_task_runs() {
        let limiter = Arc::new(LoginRateLimiter::new());
        let handle = limiter.spawn_cleanup_task();
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.abort();
    }
}
