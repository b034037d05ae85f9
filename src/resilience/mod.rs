//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Response attempt for one conversation:
//!     → retries.rs (is the failure retryable, is the budget left, how long to wait)
//!     → backoff.rs (exponential delay with jitter)
//!     → circuit_breaker.rs (count retryable failures, open after threshold)
//! ```
//!
//! # Design Decisions
//! - One breaker for the whole relay, not per conversation
//! - The breaker resets lazily when queried; no timer task
//! - Only retryable-transport failures feed the breaker
//! - Pure state and arithmetic here; the scheduler owns the waiting

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;

pub use backoff::calculate_backoff;
pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker};
pub use retries::{RetryDecision, RetryPolicy};
