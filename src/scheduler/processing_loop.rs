//! The processing loop.
//!
//! A single control task per start: sleep, run one cycle, decide whether to
//! continue. A failure streak stops the loop and the same task restarts it
//! after the cooldown. At most one chain is live at any time; a cancelled
//! chain may still be finishing its cycle but never touches lifecycle state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::conversation::ConversationQueue;
use crate::observability::metrics;
use crate::scheduler::context::{SchedulerContext, SchedulerStatus};
use crate::scheduler::error::ProcessError;
use crate::scheduler::executor::{AttemptOutcome, ResponseExecutor};

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CycleExit {
    /// Ran to the end (or skipped with the breaker open); schedule the next cycle.
    #[default]
    Completed,
    /// The consecutive-error threshold was reached; the loop must stop and restart later.
    ErrorThreshold,
    /// Another bot instance is active; the process must terminate.
    Fatal(String),
}

/// Counters for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// The breaker was open at cycle start and nothing was attempted.
    pub skipped: bool,
    /// Due conversations handed to the executor.
    pub attempted: usize,
    pub delivered: usize,
    pub nothing_to_send: usize,
    pub circuit_skips: usize,
    pub failed: usize,
    /// The breaker opened mid-cycle and the remaining conversations were left for later.
    pub deferred: bool,
    pub exit: CycleExit,
}

impl CycleReport {
    fn record(&mut self, outcome: AttemptOutcome) {
        match outcome {
            AttemptOutcome::Delivered { .. } => self.delivered += 1,
            AttemptOutcome::NothingToSend { .. } => self.nothing_to_send += 1,
            AttemptOutcome::SkippedCircuitOpen { .. } => self.circuit_skips += 1,
        }
    }
}

struct LoopInner {
    context: Arc<SchedulerContext>,
    queue: ConversationQueue,
    executor: ResponseExecutor,
    config: SchedulerConfig,
    /// Token of the live chain.
    chain: Mutex<Option<CancellationToken>>,
    // Held for the duration of a cycle; a chain left running by `stop` can
    // still be finishing its cycle when a new chain starts.
    cycle_lock: tokio::sync::Mutex<()>,
    fatal_tx: watch::Sender<Option<String>>,
}

/// Handle to the processing loop. Cheap to clone.
#[derive(Clone)]
pub struct ProcessingLoop {
    inner: Arc<LoopInner>,
}

impl ProcessingLoop {
    pub fn new(
        context: Arc<SchedulerContext>,
        queue: ConversationQueue,
        executor: ResponseExecutor,
        config: SchedulerConfig,
    ) -> Self {
        let (fatal_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(LoopInner {
                context,
                queue,
                executor,
                config,
                chain: Mutex::new(None),
                cycle_lock: tokio::sync::Mutex::new(()),
                fatal_tx,
            }),
        }
    }

    fn chain(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.inner.chain.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the loop. Returns `false` when it is already active. A chain
    /// waiting out a restart cooldown is replaced by a fresh one.
    pub fn start(&self) -> bool {
        let mut chain = self.chain();
        if self.inner.context.is_active() {
            tracing::debug!("Processing loop already running, ignoring start");
            return false;
        }

        if let Some(previous) = chain.take() {
            if self.inner.context.is_restart_pending() {
                tracing::info!("Manual start during restart cooldown, cancelling pending restart");
            }
            previous.cancel();
        }

        let cancel = CancellationToken::new();
        self.inner.context.mark_started();
        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        tokio::spawn(async move { inner.run_chain(token).await });
        *chain = Some(cancel);

        tracing::info!(
            initial_delay_ms = self.inner.config.initial_delay_ms,
            poll_interval_ms = self.inner.config.poll_interval_ms,
            "Processing loop started"
        );
        true
    }

    /// Stop the loop and cancel any pending cycle or restart. An attempt
    /// already in flight is allowed to finish.
    pub fn stop(&self) -> bool {
        let mut chain = self.chain();
        self.inner.context.mark_stopped();
        match chain.take() {
            Some(cancel) => {
                cancel.cancel();
                tracing::info!("Processing loop stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.context.is_active()
    }

    /// Run one cycle now, outside the schedule. The caller acts on `exit`.
    pub async fn run_cycle(&self) -> CycleReport {
        self.inner.run_cycle().await
    }

    /// Receives the reason once a fatal conflict ends the loop.
    pub fn subscribe_fatal(&self) -> watch::Receiver<Option<String>> {
        self.inner.fatal_tx.subscribe()
    }

    pub fn context(&self) -> &Arc<SchedulerContext> {
        &self.inner.context
    }

    pub fn queue(&self) -> &ConversationQueue {
        &self.inner.queue
    }

    pub fn status(&self) -> SchedulerStatus {
        self.inner.context.status()
    }
}

/// Sleep unless cancelled first. Returns `false` on cancellation.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = cancel.cancelled() => false,
    }
}

impl LoopInner {
    async fn run_chain(self: Arc<Self>, cancel: CancellationToken) {
        let mut delay = self.config.initial_delay();

        loop {
            if !sleep_or_cancel(delay, &cancel).await || cancel.is_cancelled() {
                tracing::debug!("Processing chain cancelled");
                return;
            }

            let report = self.run_cycle().await;
            if cancel.is_cancelled() {
                // Stopped or replaced while the cycle ran. A conflict still ends the process.
                if let CycleExit::Fatal(reason) = report.exit {
                    self.report_fatal(reason);
                }
                return;
            }

            match report.exit {
                CycleExit::Completed => {
                    delay = self.config.poll_interval();
                }
                CycleExit::ErrorThreshold => {
                    if !self.while_current(&cancel, || self.context.mark_cooling_down()) {
                        return;
                    }
                    tracing::warn!(
                        consecutive_errors = self.context.consecutive_errors(),
                        cooldown_ms = self.config.restart_cooldown_ms,
                        "Too many consecutive errors, stopping processing loop until cooldown"
                    );

                    if !sleep_or_cancel(self.config.restart_cooldown(), &cancel).await
                        || cancel.is_cancelled()
                    {
                        tracing::debug!("Pending restart cancelled");
                        return;
                    }

                    let restarted = self.while_current(&cancel, || {
                        self.context.mark_started();
                        self.context.record_restart();
                    });
                    if !restarted {
                        return;
                    }
                    tracing::info!(
                        restarts = self.context.restarts(),
                        "Processing loop restarted after cooldown"
                    );
                    delay = self.config.initial_delay();
                }
                CycleExit::Fatal(reason) => {
                    self.while_current(&cancel, || {
                        self.context.mark_stopped();
                        cancel.cancel();
                    });
                    self.report_fatal(reason);
                    return;
                }
            }
        }
    }

    /// Run a lifecycle transition only if `cancel` still belongs to the live
    /// chain. `start` and `stop` cancel under the same lock.
    fn while_current(&self, cancel: &CancellationToken, transition: impl FnOnce()) -> bool {
        let _chain = self.chain.lock().unwrap_or_else(PoisonError::into_inner);
        if cancel.is_cancelled() {
            return false;
        }
        transition();
        true
    }

    fn report_fatal(&self, reason: String) {
        tracing::error!(reason = %reason, "Processing loop terminated by fatal conflict");
        self.fatal_tx.send_replace(Some(reason));
    }

    async fn run_cycle(&self) -> CycleReport {
        let _cycle = self.cycle_lock.lock().await;
        let mut report = CycleReport::default();
        self.context.record_cycle();

        if self.context.breaker_is_open() {
            tracing::info!("Circuit breaker open, skipping cycle");
            metrics::record_cycle(true);
            report.skipped = true;
            return report;
        }
        metrics::record_cycle(false);

        let chats = self.queue.all_chats();
        tracing::debug!(conversations = chats.len(), "Processing cycle started");

        for conversation in chats {
            if !self.queue.is_due(&conversation) {
                continue;
            }
            if self.context.breaker_is_open() {
                tracing::info!("Circuit breaker opened mid-cycle, deferring remaining conversations");
                report.deferred = true;
                break;
            }

            report.attempted += 1;
            match self.executor.execute(&conversation).await {
                Ok(outcome) => {
                    // A breaker-induced skip counts as success for the streak.
                    self.context.reset_errors();
                    report.record(outcome);
                }
                Err(ProcessError::FatalConflict(err)) => {
                    report.failed += 1;
                    report.exit = CycleExit::Fatal(err.to_string());
                    return report;
                }
                Err(err) => {
                    report.failed += 1;
                    let streak = self.context.increment_errors();
                    tracing::warn!(
                        conversation_id = %conversation,
                        error = %err,
                        consecutive_errors = streak,
                        "Conversation processing failed"
                    );
                    if streak >= self.config.max_consecutive_errors {
                        report.exit = CycleExit::ErrorThreshold;
                        return report;
                    }
                }
            }
        }

        tracing::debug!(
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "Processing cycle finished"
        );
        report
    }
}
