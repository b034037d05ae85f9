//! Circuit breaker for the response pipeline.
//!
//! # States
//! - Closed: normal operation, attempts pass through
//! - Open: downstream assumed down, attempts are skipped
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= max_failures
//! Open → Closed: first query after `timeout` has elapsed since the last failure
//! Any → Closed: explicit reset (successful attempt)
//! ```

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;

/// Point-in-time view of the breaker for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub open: bool,
    pub failures: u32,
    pub max_failures: u32,
    /// Milliseconds since the last recorded failure, if any.
    pub since_last_failure_ms: Option<u64>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failures: u32,
    last_failure: Option<Instant>,
    open: bool,
    max_failures: u32,
    timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(max_failures: u32, timeout: Duration) -> Self {
        Self {
            failures: 0,
            last_failure: None,
            open: false,
            max_failures: max_failures.max(1),
            timeout,
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.max_failures, config.timeout())
    }

    /// Whether attempts are suspended. Closes the breaker as a side effect once
    /// the timeout has elapsed since the last failure.
    pub fn is_open(&mut self) -> bool {
        self.is_open_at(Instant::now())
    }

    pub fn is_open_at(&mut self, now: Instant) -> bool {
        if self.open {
            let elapsed = self
                .last_failure
                .map(|last| now.saturating_duration_since(last))
                .unwrap_or(self.timeout);
            if elapsed >= self.timeout {
                tracing::info!(
                    failures = self.failures,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Circuit breaker timeout elapsed, closing"
                );
                self.reset();
            }
        }
        self.open
    }

    /// Count one failure. Returns `true` when the breaker is open afterwards.
    pub fn record_failure(&mut self) -> bool {
        self.record_failure_at(Instant::now())
    }

    pub fn record_failure_at(&mut self, now: Instant) -> bool {
        self.failures = self.failures.saturating_add(1);
        self.last_failure = Some(now);

        if !self.open && self.failures >= self.max_failures {
            self.open = true;
            tracing::warn!(
                failures = self.failures,
                timeout_ms = self.timeout.as_millis() as u64,
                "Circuit breaker opened"
            );
        }
        self.open
    }

    pub fn reset(&mut self) {
        self.failures = 0;
        self.last_failure = None;
        self.open = false;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        BreakerSnapshot {
            open: self.open,
            failures: self.failures,
            max_failures: self.max_failures,
            since_last_failure_ms: self
                .last_failure
                .map(|last| Instant::now().saturating_duration_since(last).as_millis() as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stays_closed_below_threshold() {
        let mut breaker = CircuitBreaker::new(10, Duration::from_secs(300));
        let now = Instant::now();

        for expected in 1..10 {
            assert!(!breaker.record_failure_at(now));
            assert_eq!(breaker.failures(), expected);
            assert!(!breaker.is_open_at(now));
        }
    }

    #[test]
    fn test_opens_at_threshold_and_closes_after_timeout() {
        let timeout = Duration::from_millis(300_000);
        let mut breaker = CircuitBreaker::new(3, timeout);
        let start = Instant::now();

        breaker.record_failure_at(start);
        breaker.record_failure_at(start);
        assert!(breaker.record_failure_at(start));
        assert!(breaker.is_open_at(start));

        // Still open just before the timeout.
        assert!(breaker.is_open_at(start + timeout - Duration::from_millis(1)));
        assert_eq!(breaker.failures(), 3);

        // First query at the timeout closes it and clears state.
        assert!(!breaker.is_open_at(start + timeout));
        assert_eq!(breaker.failures(), 0);
        assert_eq!(breaker.snapshot().since_last_failure_ms, None);
    }

    #[test]
    fn test_timeout_counts_from_last_failure() {
        let timeout = Duration::from_secs(10);
        let mut breaker = CircuitBreaker::new(1, timeout);
        let start = Instant::now();

        breaker.record_failure_at(start);
        breaker.record_failure_at(start + Duration::from_secs(8));

        assert!(breaker.is_open_at(start + Duration::from_secs(12)));
        assert!(!breaker.is_open_at(start + Duration::from_secs(18)));
    }

    #[test]
    fn test_reset_closes_immediately() {
        let mut breaker = CircuitBreaker::new(10, Duration::from_secs(300));
        let now = Instant::now();
        for _ in 0..9 {
            breaker.record_failure_at(now);
        }

        breaker.reset();
        assert_eq!(breaker.failures(), 0);
        assert!(!breaker.is_open_at(now));

        for _ in 0..10 {
            breaker.record_failure_at(now);
        }
        assert!(breaker.is_open_at(now));
        breaker.reset();
        assert!(!breaker.is_open_at(now));
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        let mut breaker = CircuitBreaker::new(0, Duration::from_secs(1));
        assert!(!breaker.is_open());
        assert!(breaker.record_failure());
    }
}
