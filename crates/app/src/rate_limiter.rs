//! Per-token admission control over fixed, clock-aligned windows.
//!
//! Time is cut into equal windows aligned to the Unix epoch and each token
//! may make `limit` requests per window. Bursts of up to twice the limit are
//! possible across a window boundary.

use std::time::Duration;

use jiff::Timestamp;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::domain::tokens::records::TokenUuid;

/// Window used when a zero-length one is configured.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Bucket {
    window_start_ms: i64,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    window_ms: i64,
    buckets: Mutex<FxHashMap<TokenUuid, Bucket>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        let window = if window.is_zero() {
            DEFAULT_WINDOW
        } else {
            window
        };

        Self {
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX).max(1),
            buckets: Mutex::new(FxHashMap::default()),
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms.unsigned_abs())
    }

    /// Decide whether `token` may make another request at `now`.
    ///
    /// The nil token and a zero limit are unlimited; a negative limit never
    /// admits.
    pub fn allow(&self, token: TokenUuid, limit: i32, now: Timestamp) -> bool {
        if token.is_nil() || limit == 0 {
            return true;
        }

        let Ok(limit) = u32::try_from(limit) else {
            return false;
        };

        let now_ms = now.as_millisecond();
        let window_start_ms = now_ms - now_ms.rem_euclid(self.window_ms);
        let cutoff_ms = now_ms.saturating_sub(self.window_ms.saturating_mul(2));

        let mut buckets = self.buckets.lock();

        buckets.retain(|_, bucket| bucket.window_start_ms >= cutoff_ms);

        let bucket = buckets.entry(token).or_insert(Bucket {
            window_start_ms,
            count: 0,
        });

        if bucket.window_start_ms != window_start_ms {
            *bucket = Bucket {
                window_start_ms,
                count: 0,
            };
        }

        if bucket.count >= limit {
            return false;
        }

        bucket.count += 1;

        true
    }

    /// Buckets currently held in memory.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.buckets.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;

    fn at(ms: i64) -> Timestamp {
        Timestamp::from_millisecond(ms).expect("test instant is in range")
    }

    #[test]
    fn limit_of_one_admits_once_per_window() {
        let limiter = RateLimiter::default();
        let token = TokenUuid::new();

        assert!(limiter.allow(token, 1, at(60_000)));
        assert!(!limiter.allow(token, 1, at(60_000 + 59_999)));
        assert!(limiter.allow(token, 1, at(120_000)));
    }

    #[test]
    fn windows_are_clock_aligned() {
        let limiter = RateLimiter::default();
        let token = TokenUuid::new();

        // 59.9s and 60.1s straddle an aligned boundary despite being close.
        assert!(limiter.allow(token, 1, at(59_900)));
        assert!(limiter.allow(token, 1, at(60_100)));
    }

    #[test]
    fn counts_up_to_limit() {
        let limiter = RateLimiter::default();
        let token = TokenUuid::new();
        let now = at(1_000_000);

        let admitted = (0..10).filter(|_| limiter.allow(token, 3, now)).count();

        assert_eq!(admitted, 3);
    }

    #[test]
    fn zero_limit_and_nil_token_are_unlimited() {
        let limiter = RateLimiter::default();
        let now = Timestamp::now();

        assert!((0..100).all(|_| limiter.allow(TokenUuid::new(), 0, now)));
        assert!((0..100).all(|_| limiter.allow(TokenUuid::nil(), 1, now)));
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn negative_limit_always_denies() {
        let limiter = RateLimiter::default();

        assert!(!limiter.allow(TokenUuid::new(), -1, Timestamp::now()));
    }

    #[test]
    fn tokens_are_limited_independently() {
        let limiter = RateLimiter::default();
        let now = at(5_000);
        let first = TokenUuid::new();
        let second = TokenUuid::new();

        assert!(limiter.allow(first, 1, now));
        assert!(limiter.allow(second, 1, now));
        assert!(!limiter.allow(first, 1, now));
    }

    #[test]
    fn stale_buckets_are_collected() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let start = at(100_000);

        for _ in 0..5 {
            limiter.allow(TokenUuid::new(), 1, start);
        }

        assert_eq!(limiter.tracked(), 5);

        let later = start + SignedDuration::from_secs(35);

        limiter.allow(TokenUuid::new(), 1, later);

        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn zero_window_falls_back_to_a_minute() {
        assert_eq!(RateLimiter::new(Duration::ZERO).window(), DEFAULT_WINDOW);
    }

    #[test]
    fn concurrent_callers_never_exceed_limit() {
        let limiter = std::sync::Arc::new(RateLimiter::default());
        let token = TokenUuid::new();
        let now = at(42_000);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();

                std::thread::spawn(move || (0..50).filter(|_| limiter.allow(token, 25, now)).count())
            })
            .collect();

        let admitted: usize = handles
            .into_iter()
            .map(|handle| handle.join().expect("worker thread panicked"))
            .sum();

        assert_eq!(admitted, 25);
    }
}
