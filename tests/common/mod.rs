//! Shared fixtures for integration tests: scripted collaborators and a
//! harness wiring them to a real queue, context and executor.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use chat_relay::config::SchedulerConfig;
use chat_relay::conversation::{ContentPart, ConversationId, ConversationQueue, HistoryStore, InMemoryHistory, Message};
use chat_relay::dispatch::{
    DeliveryChannel, DispatchError, DispatchResult, EnrichError, Enricher, Reply, ResponseDispatcher,
};
use chat_relay::resilience::{CircuitBreaker, RetryPolicy};
use chat_relay::scheduler::{ProcessingLoop, ResponseExecutor, SchedulerContext};

/// Dispatcher that plays back queued results, then falls back to a fixed reply.
pub struct ScriptedDispatcher {
    script: Mutex<VecDeque<DispatchResult<Option<Reply>>>>,
    fallback: Mutex<DispatchResult<Option<Reply>>>,
    calls: Mutex<Vec<(ConversationId, usize)>>,
}

impl ScriptedDispatcher {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(Some(Reply::text("ok")))),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, result: DispatchResult<Option<Reply>>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn push_n(&self, n: usize, result: DispatchResult<Option<Reply>>) {
        for _ in 0..n {
            self.push(result.clone());
        }
    }

    /// Result returned once the script runs dry.
    pub fn set_fallback(&self, result: DispatchResult<Option<Reply>>) {
        *self.fallback.lock().unwrap() = result;
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// `(conversation, history length)` for every call, in order.
    pub fn calls(&self) -> Vec<(ConversationId, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseDispatcher for ScriptedDispatcher {
    async fn generate_response(
        &self,
        conversation: &ConversationId,
        history: &[Message],
    ) -> DispatchResult<Option<Reply>> {
        self.calls
            .lock()
            .unwrap()
            .push((conversation.clone(), history.len()));
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => self.fallback.lock().unwrap().clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    Typing(String),
    Image(String, String),
    Text(String, String),
}

/// Delivery channel that records every successful action. Text sends fail
/// with the queued errors first, if any.
#[derive(Default)]
pub struct RecordingDelivery {
    events: Mutex<Vec<Delivered>>,
    text_failures: Mutex<VecDeque<DispatchError>>,
}

impl RecordingDelivery {
    pub fn fail_next_text(&self, err: DispatchError) {
        self.text_failures.lock().unwrap().push_back(err);
    }

    pub fn events(&self) -> Vec<Delivered> {
        self.events.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Delivered::Text(id, text) => Some((id, text)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl DeliveryChannel for RecordingDelivery {
    async fn send_typing(&self, conversation: &ConversationId) -> DispatchResult<()> {
        self.events
            .lock()
            .unwrap()
            .push(Delivered::Typing(conversation.to_string()));
        Ok(())
    }

    async fn send_image(&self, conversation: &ConversationId, url: &str) -> DispatchResult<()> {
        self.events
            .lock()
            .unwrap()
            .push(Delivered::Image(conversation.to_string(), url.to_string()));
        Ok(())
    }

    async fn send_text(&self, conversation: &ConversationId, text: &str) -> DispatchResult<()> {
        if let Some(err) = self.text_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.events
            .lock()
            .unwrap()
            .push(Delivered::Text(conversation.to_string(), text.to_string()));
        Ok(())
    }
}

/// Enricher returning a fixed description, or failing when `None`.
pub struct FixedEnricher(pub Option<String>);

#[async_trait]
impl Enricher for FixedEnricher {
    async fn describe_image(&self, _image_url: &str) -> Result<String, EnrichError> {
        self.0.clone().ok_or(EnrichError::Empty)
    }
}

/// Real queue, context and executor around scripted collaborators.
pub struct Harness {
    pub history: Arc<InMemoryHistory>,
    pub queue: ConversationQueue,
    pub context: Arc<SchedulerContext>,
    pub dispatcher: Arc<ScriptedDispatcher>,
    pub delivery: Arc<RecordingDelivery>,
    pub policy: RetryPolicy,
}

impl Harness {
    pub fn new(breaker_threshold: u32, max_retries: u32) -> Self {
        let history = Arc::new(InMemoryHistory::new(50, None));
        Self {
            queue: ConversationQueue::new(history.clone()),
            history,
            context: Arc::new(SchedulerContext::new(CircuitBreaker::new(
                breaker_threshold,
                std::time::Duration::from_millis(300_000),
            ))),
            dispatcher: Arc::new(ScriptedDispatcher::new()),
            delivery: Arc::new(RecordingDelivery::default()),
            policy: RetryPolicy {
                max_retries,
                base_delay_ms: 1_000,
                max_delay_ms: 30_000,
                jitter_ms: 1_000,
            },
        }
    }

    pub fn executor(&self) -> ResponseExecutor {
        ResponseExecutor::new(
            self.context.clone(),
            self.queue.clone(),
            self.dispatcher.clone(),
            self.delivery.clone(),
            self.policy.clone(),
        )
    }

    pub fn processing_loop(&self, config: SchedulerConfig) -> ProcessingLoop {
        ProcessingLoop::new(self.context.clone(), self.queue.clone(), self.executor(), config)
    }

    /// Append a user message, making the conversation due.
    pub fn user_says(&self, id: &str, text: &str) -> ConversationId {
        let id = ConversationId::from(id);
        self.queue.add_message(
            &id,
            Message::user(
                "u1",
                "Ada",
                vec![ContentPart::Text {
                    text: text.to_string(),
                }],
            ),
        );
        id
    }

    pub fn history_len(&self, id: &ConversationId) -> usize {
        self.history.len(id)
    }
}
