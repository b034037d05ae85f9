//! Shared scheduler state.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;
use crate::resilience::{BreakerSnapshot, CircuitBreaker};

/// Loop and breaker state as reported by the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub active: bool,
    pub restart_pending: bool,
    pub consecutive_errors: u32,
    pub restarts: u64,
    pub cycles: u64,
    pub circuit_breaker: BreakerSnapshot,
}

/// State owned by the scheduler core.
///
/// Constructed once at startup and handed to the executor and the loop.
/// Cycles are serialized, so the breaker lock is never contended by two
/// attempts; it exists for readers such as the admin API.
#[derive(Debug)]
pub struct SchedulerContext {
    breaker: Mutex<CircuitBreaker>,
    active: AtomicBool,
    restart_pending: AtomicBool,
    consecutive_errors: AtomicU32,
    restarts: AtomicU64,
    cycles: AtomicU64,
}

impl SchedulerContext {
    pub fn new(breaker: CircuitBreaker) -> Self {
        Self {
            breaker: Mutex::new(breaker),
            active: AtomicBool::new(false),
            restart_pending: AtomicBool::new(false),
            consecutive_errors: AtomicU32::new(0),
            restarts: AtomicU64::new(0),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(CircuitBreaker::from_config(config))
    }

    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Circuit breaker ---

    /// Lazily closes the breaker once its timeout has elapsed.
    pub fn breaker_is_open(&self) -> bool {
        let open = self.breaker().is_open();
        metrics::record_circuit_state(open);
        open
    }

    /// Returns `true` when the breaker is open after counting this failure.
    pub fn record_breaker_failure(&self) -> bool {
        let open = self.breaker().record_failure();
        metrics::record_circuit_state(open);
        open
    }

    pub fn reset_breaker(&self) {
        self.breaker().reset();
        metrics::record_circuit_state(false);
    }

    pub fn breaker_failures(&self) -> u32 {
        self.breaker().failures()
    }

    // --- Loop lifecycle ---

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_restart_pending(&self) -> bool {
        self.restart_pending.load(Ordering::SeqCst)
    }

    /// Fresh start: active, error streak cleared.
    pub(crate) fn mark_started(&self) {
        self.consecutive_errors.store(0, Ordering::SeqCst);
        self.restart_pending.store(false, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
        metrics::record_consecutive_errors(0);
    }

    pub(crate) fn mark_stopped(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.restart_pending.store(false, Ordering::SeqCst);
    }

    pub(crate) fn mark_cooling_down(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.restart_pending.store(true, Ordering::SeqCst);
    }

    pub(crate) fn record_restart(&self) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        metrics::record_loop_restart();
    }

    pub(crate) fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::SeqCst);
    }

    // --- Error streak ---

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors.load(Ordering::SeqCst)
    }

    pub(crate) fn reset_errors(&self) {
        self.consecutive_errors.store(0, Ordering::SeqCst);
        metrics::record_consecutive_errors(0);
    }

    /// Returns the streak length including this failure.
    pub(crate) fn increment_errors(&self) -> u32 {
        let streak = self.consecutive_errors.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_consecutive_errors(streak);
        streak
    }

    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::SeqCst)
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            active: self.is_active(),
            restart_pending: self.is_restart_pending(),
            consecutive_errors: self.consecutive_errors(),
            restarts: self.restarts(),
            cycles: self.cycles(),
            circuit_breaker: self.breaker().snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_lifecycle_flags() {
        let ctx = SchedulerContext::new(CircuitBreaker::new(2, Duration::from_secs(60)));
        assert!(!ctx.is_active());

        ctx.mark_started();
        ctx.increment_errors();
        ctx.increment_errors();
        assert_eq!(ctx.consecutive_errors(), 2);

        ctx.mark_cooling_down();
        assert!(!ctx.is_active());
        assert!(ctx.is_restart_pending());

        ctx.mark_started();
        assert!(ctx.is_active());
        assert_eq!(ctx.consecutive_errors(), 0);
        assert!(!ctx.is_restart_pending());
    }

    #[test]
    fn test_breaker_through_context() {
        let ctx = SchedulerContext::new(CircuitBreaker::new(2, Duration::from_secs(60)));
        assert!(!ctx.record_breaker_failure());
        assert!(ctx.record_breaker_failure());
        assert!(ctx.breaker_is_open());
        assert!(ctx.status().circuit_breaker.open);

        ctx.reset_breaker();
        assert!(!ctx.breaker_is_open());
        assert_eq!(ctx.breaker_failures(), 0);
    }
}
