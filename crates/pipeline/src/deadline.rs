//! A single cumulative deadline checked at every suspension point, instead
//! of nested `tokio::time::timeout` calls per stage — the latter would let
//! per-branch timeouts sum past the whole-`suggest` 20s ceiling (spec.md
//! §5, REDESIGN FLAGS).

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Time left, or `Duration::ZERO` if already past the deadline. Used to
    /// bound the next suspension point (an index query, the reranker call)
    /// without letting it outlive the whole-call ceiling.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Caps `budget` at whatever is left on this deadline.
    pub fn bounded(&self, budget: Duration) -> Duration {
        budget.min(self.remaining())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_after_its_budget() {
        let deadline = Deadline::after(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(deadline.is_expired());
    }

    #[test]
    fn bounded_never_exceeds_remaining() {
        let deadline = Deadline::after(Duration::from_secs(1));
        assert!(deadline.bounded(Duration::from_secs(10)) <= Duration::from_secs(1));
    }
}
