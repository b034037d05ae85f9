//! Retry/backoff executor for one conversation.
//!
//! # Responsibilities
//! - Run typing indicator → response generation → delivery as one attempt
//! - Classify failures and retry retryable ones with jittered backoff
//! - Resume a retry after the last step that succeeded: a generated reply is
//!   not regenerated and a delivered image is not sent again
//! - Feed the global circuit breaker; abandon quietly once it opens
//! - Record the delivered reply so the conversation stops being due

use std::sync::Arc;
use std::time::Instant;

use crate::conversation::{ContentPart, ConversationId, ConversationQueue, Message};
use crate::dispatch::{DeliveryChannel, DispatchResult, ErrorKind, Reply, ResponseDispatcher};
use crate::observability::metrics;
use crate::resilience::{RetryDecision, RetryPolicy};
use crate::scheduler::context::SchedulerContext;
use crate::scheduler::error::ProcessError;

/// Result of a successful `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A reply was delivered after `retries` retries.
    Delivered { retries: u32 },
    /// The generator had nothing to send.
    NothingToSend { retries: u32 },
    /// A retryable failure opened the circuit breaker; the attempt was abandoned.
    SkippedCircuitOpen { retries: u32 },
}

impl AttemptOutcome {
    pub fn retries(&self) -> u32 {
        match *self {
            AttemptOutcome::Delivered { retries }
            | AttemptOutcome::NothingToSend { retries }
            | AttemptOutcome::SkippedCircuitOpen { retries } => retries,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Delivered { .. } => "delivered",
            AttemptOutcome::NothingToSend { .. } => "nothing_to_send",
            AttemptOutcome::SkippedCircuitOpen { .. } => "circuit_open",
        }
    }
}

/// What earlier tries of one `execute` call already achieved.
#[derive(Default)]
struct Progress {
    /// `Some` once the dispatcher answered; the inner `None` means nothing to send.
    reply: Option<Option<Reply>>,
    image_sent: bool,
}

pub struct ResponseExecutor {
    context: Arc<SchedulerContext>,
    queue: ConversationQueue,
    dispatcher: Arc<dyn ResponseDispatcher>,
    delivery: Arc<dyn DeliveryChannel>,
    policy: RetryPolicy,
}

impl ResponseExecutor {
    pub fn new(
        context: Arc<SchedulerContext>,
        queue: ConversationQueue,
        dispatcher: Arc<dyn ResponseDispatcher>,
        delivery: Arc<dyn DeliveryChannel>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            context,
            queue,
            dispatcher,
            delivery,
            policy,
        }
    }

    /// Produce and deliver a reply for `conversation`, retrying transient failures.
    pub async fn execute(
        &self,
        conversation: &ConversationId,
    ) -> Result<AttemptOutcome, ProcessError> {
        let start = Instant::now();
        let mut retries = 0;
        let mut progress = Progress::default();

        loop {
            let err = match self.attempt(conversation, &mut progress).await {
                Ok(delivered) => {
                    // Global breaker: one success clears failures from every conversation.
                    self.context.reset_breaker();
                    let outcome = if delivered {
                        AttemptOutcome::Delivered { retries }
                    } else {
                        AttemptOutcome::NothingToSend { retries }
                    };
                    tracing::debug!(
                        conversation_id = %conversation,
                        retries,
                        outcome = outcome.label(),
                        "Conversation processed"
                    );
                    metrics::record_attempt(outcome.label(), start);
                    return Ok(outcome);
                }
                Err(err) => err,
            };

            let kind = err.kind();
            metrics::record_dispatch_failure(kind.as_str());

            match kind {
                ErrorKind::FatalConflict => {
                    tracing::error!(
                        conversation_id = %conversation,
                        error = %err,
                        "Another bot instance is active"
                    );
                    metrics::record_attempt("fatal", start);
                    return Err(ProcessError::FatalConflict(err));
                }
                ErrorKind::Unclassified => {
                    metrics::record_attempt("failed", start);
                    return Err(ProcessError::Unclassified(err));
                }
                ErrorKind::RetryableTransport => {}
            }

            if self.context.record_breaker_failure() {
                tracing::warn!(
                    conversation_id = %conversation,
                    error = %err,
                    retries,
                    "Circuit breaker open, abandoning attempt"
                );
                let outcome = AttemptOutcome::SkippedCircuitOpen { retries };
                metrics::record_attempt(outcome.label(), start);
                return Ok(outcome);
            }

            match self.policy.decide(kind, retries) {
                RetryDecision::Retry { retry, delay } => {
                    tracing::info!(
                        conversation_id = %conversation,
                        attempt = retry,
                        delay = ?delay,
                        error = %err,
                        "Retrying after transport error"
                    );
                    retries = retry;
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Exhausted | RetryDecision::GiveUp => {
                    metrics::record_attempt("exhausted", start);
                    return Err(ProcessError::RetriesExhausted {
                        retries,
                        source: err,
                    });
                }
            }
        }
    }

    /// One pass of typing → generate → deliver. `Ok(true)` when something was sent.
    async fn attempt(
        &self,
        conversation: &ConversationId,
        progress: &mut Progress,
    ) -> DispatchResult<bool> {
        self.delivery.send_typing(conversation).await?;

        let reply = match &progress.reply {
            Some(reply) => reply.clone(),
            None => {
                let history = self.queue.history().messages(conversation);
                let reply = self
                    .dispatcher
                    .generate_response(conversation, &history)
                    .await?;
                progress.reply = Some(reply.clone());
                reply
            }
        };
        let Some(reply) = reply else {
            // Empty response marker so the conversation is no longer due.
            self.queue
                .history()
                .append(conversation, Message::response(Vec::new()));
            return Ok(false);
        };

        let mut parts = Vec::new();
        if let Some(url) = &reply.image_url {
            if !progress.image_sent {
                self.delivery.send_image(conversation, url).await?;
                progress.image_sent = true;
            }
            parts.push(ContentPart::Text {
                text: format!("[image: {url}]"),
            });
        }
        if !reply.text.trim().is_empty() {
            self.delivery.send_text(conversation, &reply.text).await?;
            parts.push(ContentPart::Text {
                text: reply.text.clone(),
            });
        }

        let delivered = !parts.is_empty();
        self.queue
            .history()
            .append(conversation, Message::response(parts));
        Ok(delivered)
    }
}
