//! Per-session token-bucket rate limiting (spec.md §4.7).
//!
//! Generalizes the teacher's fixed-window `DashMap<api_key, (count,
//! window_start)>` counter (`crates/server/src/state.rs::check_rate_limit`)
//! into continuous refill with burst capacity, since the spec calls for
//! burst semantics a fixed window can't express. One bucket lives inside
//! each session actor — there is no cross-session sharing, so no `Mutex`
//! is needed, unlike the teacher's `semantic::resilience::TokenBucket`
//! which is shared and therefore synchronized.

use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            burst: 10,
        }
    }
}

pub struct TokenBucket {
    config: RateLimitConfig,
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            tokens: config.burst as f64,
            last_update: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        let per_second = self.config.requests_per_minute as f64 / 60.0;
        self.tokens = (self.tokens + elapsed * per_second).min(self.config.burst as f64);
        self.last_update = now;
    }

    /// Consumes one token if available; `false` means the caller should
    /// reject the request as rate-limited.
    pub fn try_acquire(&mut self) -> bool {
        self.refill(Instant::now());
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn allows_burst_then_throttles() {
        let mut bucket = TokenBucket::new(RateLimitConfig {
            requests_per_minute: 60,
            burst: 10,
        });
        for _ in 0..10 {
            assert!(bucket.try_acquire());
        }
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn refills_over_time() {
        let mut bucket = TokenBucket::new(RateLimitConfig {
            requests_per_minute: 6000,
            burst: 1,
        });
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
        std::thread::sleep(Duration::from_millis(20));
        assert!(bucket.try_acquire());
    }
}
