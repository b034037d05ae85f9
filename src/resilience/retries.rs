//! Retry policy.
//!
//! # Responsibilities
//! - Decide whether a classified failure is retried
//! - Enforce the per-attempt retry budget
//! - Compute the jittered backoff for the next retry

use std::time::Duration;

use crate::config::RetryConfig;
use crate::dispatch::ErrorKind;
use crate::resilience::backoff::calculate_backoff;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then run retry number `retry`.
    Retry { retry: u32, delay: Duration },
    /// Retries are used up; give the error to the caller.
    Exhausted,
    /// The failure is never retried.
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            jitter_ms: config.jitter_ms,
        }
    }

    pub fn is_retryable(kind: ErrorKind) -> bool {
        kind == ErrorKind::RetryableTransport
    }

    /// Decide after a failure of `kind` when `retries_done` retries already ran.
    pub fn decide(&self, kind: ErrorKind, retries_done: u32) -> RetryDecision {
        if !Self::is_retryable(kind) {
            return RetryDecision::GiveUp;
        }
        if retries_done >= self.max_retries {
            return RetryDecision::Exhausted;
        }

        let retry = retries_done + 1;
        RetryDecision::Retry {
            retry,
            delay: calculate_backoff(retry, self.base_delay_ms, self.max_delay_ms, self.jitter_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_retryable_kinds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.decide(ErrorKind::Unclassified, 0), RetryDecision::GiveUp);
        assert_eq!(policy.decide(ErrorKind::FatalConflict, 0), RetryDecision::GiveUp);
    }

    #[test]
    fn test_budget_exhaustion() {
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_ms: 0,
        };

        assert_eq!(
            policy.decide(ErrorKind::RetryableTransport, 0),
            RetryDecision::Retry {
                retry: 1,
                delay: Duration::from_millis(2_000)
            }
        );
        assert_eq!(
            policy.decide(ErrorKind::RetryableTransport, 1),
            RetryDecision::Retry {
                retry: 2,
                delay: Duration::from_millis(4_000)
            }
        );
        assert_eq!(
            policy.decide(ErrorKind::RetryableTransport, 2),
            RetryDecision::Exhausted
        );
    }

    #[test]
    fn test_zero_retries() {
        let policy = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(
            policy.decide(ErrorKind::RetryableTransport, 0),
            RetryDecision::Exhausted
        );
    }
}
