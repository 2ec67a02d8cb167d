//! Exponential backoff retry for the remote embedding backend.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before a given (0-indexed) retry attempt.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(0);
        }
        let exponential = self.base_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);
        let delay_ms = exponential.min(self.max_delay.as_millis() as f64) as u64;
        let jitter = fastrand::u64(0..=delay_ms / 4 + 1);
        Duration::from_millis(delay_ms.saturating_sub(delay_ms / 8) + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_has_no_delay() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.calculate_delay(0), Duration::from_millis(0));
    }

    #[test]
    fn delay_grows_with_attempts_and_caps_at_max() {
        let cfg = RetryConfig {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
        };
        assert!(cfg.calculate_delay(5) <= cfg.max_delay + Duration::from_millis(200));
    }
}
