//! # Fibonacci Backoff
//!
//! Requeue delays for objects whose reconcile keeps failing. Grows more slowly
//! than exponential backoff and is capped, so a broken object is retried
//! steadily without hammering the BinaryLane API.
//!
//! Sequence with the controller defaults: 5s, 5s, 10s, 15s, 25s, 40s, ... 300s (max).

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, starting from `min_seconds` twice.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_seconds: u64,
    prev_seconds: u64,
    current_seconds: u64,
    max_seconds: u64,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            min_seconds,
            prev_seconds: 0,
            current_seconds: min_seconds,
            max_seconds,
        }
    }

    /// Get the next delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_seconds;
        let next = self.prev_seconds.saturating_add(self.current_seconds);
        self.prev_seconds = self.current_seconds;
        self.current_seconds = next.min(self.max_seconds);
        Duration::from_secs(result)
    }

    /// Reset the backoff to the initial state (after a successful reconcile)
    pub fn reset(&mut self) {
        self.prev_seconds = 0;
        self.current_seconds = self.min_seconds;
    }
}
